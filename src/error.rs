//! Error types for acl-walker
//!
//! Two tiers of failure:
//! - Walk-fatal errors ([`WalkerError`]) abort before the walk starts: a root
//!   path that is empty, whitespace, or unresolvable, or a worker that cannot
//!   be spawned.
//! - Per-entry failures ([`EntryErrorKind`]) are data, not control flow. They
//!   are recorded on the emitted entry and the walk continues; no subtree
//!   failure ever terminates the traversal.
//!
//! The mapping from OS error codes to entry-error kinds is centralized here
//! so the security and enumeration layers classify failures identically.

use thiserror::Error;

/// Top-level error type for the walker
#[derive(Error, Debug)]
pub enum WalkerError {
    /// Root path validation failed
    #[error("Invalid root path '{path}': {reason}")]
    InvalidRoot { path: String, reason: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (root probing, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid search pattern
    #[error("Invalid search pattern '{pattern}': {reason}")]
    InvalidSearchPattern { pattern: String, reason: String },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked")]
    Panicked { id: usize },

    /// Worker initialization failed
    #[error("Failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },

    /// Work queue send failed
    #[error("Failed to send work item: queue closed")]
    QueueSendFailed,
}

/// Result type alias for WalkerError
pub type Result<T> = std::result::Result<T, WalkerError>;

// Win32 error codes involved in classification. Declared here rather than
// pulled from the bindings so classification stays testable on every target.
const ERROR_FILE_NOT_FOUND: u32 = 2;
const ERROR_PATH_NOT_FOUND: u32 = 3;
const ERROR_ACCESS_DENIED: u32 = 5;
const ERROR_NOT_READY: u32 = 21;
const ERROR_GEN_FAILURE: u32 = 31;
const ERROR_SHARING_VIOLATION: u32 = 32;
const ERROR_LOCK_VIOLATION: u32 = 33;
const ERROR_BAD_NETPATH: u32 = 53;
const ERROR_NETNAME_DELETED: u32 = 64;
const ERROR_SEM_TIMEOUT: u32 = 121;
const ERROR_INVALID_NAME: u32 = 123;
const ERROR_FILENAME_EXCED_RANGE: u32 = 206;
const ERROR_OPERATION_ABORTED: u32 = 995;
const ERROR_IO_DEVICE: u32 = 1117;
const ERROR_PRIVILEGE_NOT_HELD: u32 = 1314;
const ERROR_INVALID_ACL: u32 = 1336;
const ERROR_INVALID_SID: u32 = 1337;
const ERROR_INVALID_SECURITY_DESCR: u32 = 1338;
const ERROR_NO_SECURITY_ON_OBJECT: u32 = 1350;

/// Classification of a per-entry failure
///
/// One of these is recorded on the emitted entry when resolving security
/// information for a path fails. The walk never aborts on any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryErrorKind {
    /// Caller lacks rights to read the ACL or owner
    Unauthorized,

    /// Path exceeds the OS limit
    PathTooLong,

    /// Entry disappeared between enumeration and the security call
    NotFound,

    /// Recognized transient OS I/O failure (device, network, contention)
    IoError,

    /// Native security call failed (after the managed fallback was tried)
    SecurityError,

    /// Anything else; failure codes the classifier does not recognize
    Unknown,
}

impl EntryErrorKind {
    /// Classify a raw Win32 error code
    pub fn from_os_error(code: u32) -> Self {
        match code {
            ERROR_ACCESS_DENIED | ERROR_PRIVILEGE_NOT_HELD => EntryErrorKind::Unauthorized,
            ERROR_FILE_NOT_FOUND | ERROR_PATH_NOT_FOUND => EntryErrorKind::NotFound,
            ERROR_FILENAME_EXCED_RANGE | ERROR_INVALID_NAME => EntryErrorKind::PathTooLong,
            ERROR_INVALID_ACL
            | ERROR_INVALID_SID
            | ERROR_INVALID_SECURITY_DESCR
            | ERROR_NO_SECURITY_ON_OBJECT => EntryErrorKind::SecurityError,
            ERROR_NOT_READY
            | ERROR_GEN_FAILURE
            | ERROR_SHARING_VIOLATION
            | ERROR_LOCK_VIOLATION
            | ERROR_BAD_NETPATH
            | ERROR_NETNAME_DELETED
            | ERROR_SEM_TIMEOUT
            | ERROR_OPERATION_ABORTED
            | ERROR_IO_DEVICE => EntryErrorKind::IoError,
            _ => EntryErrorKind::Unknown,
        }
    }

    /// Classify a std I/O error (used by the portable enumeration path)
    pub fn from_io_error(err: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::PermissionDenied => EntryErrorKind::Unauthorized,
            ErrorKind::NotFound => EntryErrorKind::NotFound,
            ErrorKind::InvalidInput | ErrorKind::InvalidData => EntryErrorKind::PathTooLong,
            ErrorKind::Interrupted
            | ErrorKind::TimedOut
            | ErrorKind::WouldBlock
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => EntryErrorKind::IoError,
            _ => EntryErrorKind::Unknown,
        }
    }

    /// Stable tag used when rendering the entry record
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryErrorKind::Unauthorized => "Unauthorized",
            EntryErrorKind::PathTooLong => "PathTooLong",
            EntryErrorKind::NotFound => "NotFound",
            EntryErrorKind::IoError => "IoError",
            EntryErrorKind::SecurityError => "SecurityError",
            EntryErrorKind::Unknown => "Unknown",
        }
    }

    /// True for the kinds that mean the native security call itself
    /// misbehaved and the high-level API should be tried once before
    /// giving up
    pub fn warrants_fallback(&self) -> bool {
        matches!(self, EntryErrorKind::SecurityError)
    }
}

impl std::fmt::Display for EntryErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_error_classification() {
        assert_eq!(
            EntryErrorKind::from_os_error(ERROR_ACCESS_DENIED),
            EntryErrorKind::Unauthorized
        );
        assert_eq!(
            EntryErrorKind::from_os_error(ERROR_FILE_NOT_FOUND),
            EntryErrorKind::NotFound
        );
        assert_eq!(
            EntryErrorKind::from_os_error(ERROR_PATH_NOT_FOUND),
            EntryErrorKind::NotFound
        );
        assert_eq!(
            EntryErrorKind::from_os_error(ERROR_FILENAME_EXCED_RANGE),
            EntryErrorKind::PathTooLong
        );
        assert_eq!(
            EntryErrorKind::from_os_error(ERROR_INVALID_SECURITY_DESCR),
            EntryErrorKind::SecurityError
        );
        // Recognized transient failures classify as I/O
        assert_eq!(
            EntryErrorKind::from_os_error(ERROR_SHARING_VIOLATION),
            EntryErrorKind::IoError
        );
        assert_eq!(
            EntryErrorKind::from_os_error(ERROR_IO_DEVICE),
            EntryErrorKind::IoError
        );
        // Codes the classifier does not recognize degrade to Unknown
        assert_eq!(
            EntryErrorKind::from_os_error(0xDEAD),
            EntryErrorKind::Unknown
        );
    }

    #[test]
    fn test_io_error_classification() {
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(
            EntryErrorKind::from_io_error(&denied),
            EntryErrorKind::Unauthorized
        );

        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert_eq!(
            EntryErrorKind::from_io_error(&missing),
            EntryErrorKind::NotFound
        );

        let timed_out = std::io::Error::from(std::io::ErrorKind::TimedOut);
        assert_eq!(
            EntryErrorKind::from_io_error(&timed_out),
            EntryErrorKind::IoError
        );

        let other = std::io::Error::other("unclassified failure");
        assert_eq!(
            EntryErrorKind::from_io_error(&other),
            EntryErrorKind::Unknown
        );
    }

    #[test]
    fn test_fallback_policy() {
        assert!(EntryErrorKind::SecurityError.warrants_fallback());
        assert!(!EntryErrorKind::Unauthorized.warrants_fallback());
        assert!(!EntryErrorKind::NotFound.warrants_fallback());
    }

    #[test]
    fn test_error_conversion() {
        let worker_err = WorkerError::Panicked { id: 3 };
        let walker_err: WalkerError = worker_err.into();
        assert!(matches!(walker_err, WalkerError::Worker(_)));
    }
}
