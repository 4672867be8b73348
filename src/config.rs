//! Configuration types for acl-walker
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime enumeration options with validation

use crate::cancel::CancellationToken;
use crate::error::ConfigError;
use clap::{Parser, ValueEnum};

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Which entry kinds are emitted by a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchFor {
    /// Emit regular files only
    Files,
    /// Emit directories only
    Dirs,
    /// Emit both files and directories
    Both,
}

impl SearchFor {
    /// Check if file entries are emitted
    pub fn includes_files(&self) -> bool {
        matches!(self, SearchFor::Files | SearchFor::Both)
    }

    /// Check if directory entries are emitted
    pub fn includes_dirs(&self) -> bool {
        matches!(self, SearchFor::Dirs | SearchFor::Both)
    }
}

/// Parallel directory walker with owner and DACL extraction
#[derive(Parser, Debug, Clone)]
#[command(
    name = "acl-walker",
    version,
    about = "Parallel directory walker with owner and DACL extraction",
    long_about = "Recursively enumerates a directory tree and emits one record per entry \
                  with its path, attributes, owner principal, and access-control entries.\n\n\
                  Per-entry security failures are recorded inline; the walk never aborts \
                  because one subtree is unreadable.",
    after_help = "EXAMPLES:\n    \
        acl-walker C:\\data\n    \
        acl-walker \\\\server\\share --search both --max-depth 3\n    \
        acl-walker C:\\data --pattern '*.docx' --no-inherited\n    \
        acl-walker C:\\data --paths-only -q"
)]
pub struct CliArgs {
    /// Root directory to enumerate
    #[arg(value_name = "ROOT")]
    pub root: String,

    /// Which entry kinds to emit
    #[arg(long = "search", value_enum, default_value_t = SearchFor::Files)]
    pub search_for: SearchFor,

    /// Maximum traversal depth (0 = root's immediate children only)
    #[arg(short = 'd', long, value_name = "NUM")]
    pub max_depth: Option<u32>,

    /// Wildcard pattern passed to directory enumeration
    #[arg(short = 'p', long, default_value = "*", value_name = "PATTERN")]
    pub pattern: String,

    /// Number of worker threads
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Exclude ACL entries inherited from ancestors
    #[arg(long)]
    pub no_inherited: bool,

    /// Skip owner resolution entirely
    #[arg(long)]
    pub no_owner: bool,

    /// Resolve owners through the high-level API instead of the native
    /// security-descriptor query
    #[arg(long)]
    pub managed_owner: bool,

    /// Emit paths only, skipping security resolution
    #[arg(long)]
    pub paths_only: bool,

    /// Quiet mode - suppress the progress display
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (show per-entry warnings)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Default worker count: ceil(1.5 x logical CPUs)
///
/// The workers spend most of their time in blocking security and
/// enumeration calls, so modest oversubscription keeps the CPUs busy.
fn default_workers() -> usize {
    (num_cpus::get() * 3).div_ceil(2)
}

/// Validated runtime options, read-only for the duration of a walk
#[derive(Debug, Clone)]
pub struct EnumerateOptions {
    /// Which entry kinds are emitted
    pub search_for: SearchFor,

    /// Include ACEs inherited from ancestors
    pub include_inherited: bool,

    /// Attempt owner resolution
    pub resolve_owner: bool,

    /// Use the native security-descriptor query for the owner, with a
    /// one-shot high-level fallback on failure
    pub use_native_owner: bool,

    /// Maximum traversal depth; `None` is unbounded, 0 means root only
    pub max_depth: Option<u32>,

    /// Wildcard pattern handed to the native find call
    pub search_pattern: String,

    /// Number of worker threads
    pub worker_count: usize,

    /// Cooperative cancellation token
    pub cancellation: CancellationToken,
}

impl Default for EnumerateOptions {
    fn default() -> Self {
        Self {
            search_for: SearchFor::Files,
            include_inherited: true,
            resolve_owner: true,
            use_native_owner: true,
            max_depth: None,
            search_pattern: "*".to_string(),
            worker_count: default_workers(),
            cancellation: CancellationToken::new(),
        }
    }
}

impl EnumerateOptions {
    /// Create and validate options from CLI arguments
    pub fn from_args(args: &CliArgs) -> Result<Self, ConfigError> {
        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        let pattern = args.pattern.trim();
        if pattern.is_empty() {
            return Err(ConfigError::InvalidSearchPattern {
                pattern: args.pattern.clone(),
                reason: "pattern must not be empty".into(),
            });
        }

        Ok(Self {
            search_for: args.search_for,
            include_inherited: !args.no_inherited,
            resolve_owner: !args.no_owner,
            use_native_owner: !args.managed_owner,
            max_depth: args.max_depth,
            search_pattern: pattern.to_string(),
            worker_count: args.workers,
            cancellation: CancellationToken::new(),
        })
    }

    /// Check whether `depth` is within the configured cap
    pub fn within_depth(&self, depth: u32) -> bool {
        self.max_depth.map_or(true, |max| depth <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            root: "C:\\data".into(),
            search_for: SearchFor::Files,
            max_depth: None,
            pattern: "*".into(),
            workers: 4,
            no_inherited: false,
            no_owner: false,
            managed_owner: false,
            paths_only: false,
            quiet: false,
            verbose: false,
        }
    }

    #[test]
    fn test_search_for_selection() {
        assert!(SearchFor::Files.includes_files());
        assert!(!SearchFor::Files.includes_dirs());
        assert!(!SearchFor::Dirs.includes_files());
        assert!(SearchFor::Dirs.includes_dirs());
        assert!(SearchFor::Both.includes_files());
        assert!(SearchFor::Both.includes_dirs());
    }

    #[test]
    fn test_defaults() {
        let options = EnumerateOptions::default();
        assert_eq!(options.search_for, SearchFor::Files);
        assert!(options.include_inherited);
        assert!(options.resolve_owner);
        assert!(options.use_native_owner);
        assert_eq!(options.max_depth, None);
        assert_eq!(options.search_pattern, "*");
        assert!(options.worker_count >= 1);
    }

    #[test]
    fn test_from_args_flag_inversion() {
        let mut args = base_args();
        args.no_inherited = true;
        args.no_owner = true;
        args.managed_owner = true;

        let options = EnumerateOptions::from_args(&args).unwrap();
        assert!(!options.include_inherited);
        assert!(!options.resolve_owner);
        assert!(!options.use_native_owner);
    }

    #[test]
    fn test_invalid_worker_count() {
        let mut args = base_args();
        args.workers = 0;
        assert!(EnumerateOptions::from_args(&args).is_err());

        args.workers = MAX_WORKERS + 1;
        assert!(EnumerateOptions::from_args(&args).is_err());
    }

    #[test]
    fn test_empty_pattern_rejected() {
        let mut args = base_args();
        args.pattern = "   ".into();
        assert!(EnumerateOptions::from_args(&args).is_err());
    }

    #[test]
    fn test_depth_cap() {
        let options = EnumerateOptions {
            max_depth: Some(2),
            ..Default::default()
        };
        assert!(options.within_depth(0));
        assert!(options.within_depth(2));
        assert!(!options.within_depth(3));

        let unbounded = EnumerateOptions::default();
        assert!(unbounded.within_depth(u32::MAX));
    }
}
