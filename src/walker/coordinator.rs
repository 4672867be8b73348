//! Walk coordination - sets up and launches the parallel traversal
//!
//! Every `enumerate` call builds its own [`WalkerContext`]: work queue,
//! visited set, statistics, and cancellation token all live in the context
//! and die with the walk. The only process-wide state is the shared SID
//! cache, which is explicitly scoped as shared.

use crate::cancel::CancellationToken;
use crate::config::EnumerateOptions;
use crate::error::{Result, WalkerError};
use crate::walker::queue::WorkQueue;
use crate::walker::stream::{EntryStream, PathStream};
use crate::walker::worker::{WalkerStats, Worker};
use crate::win32::SidCache;
use crossbeam_channel::unbounded;
use dashmap::DashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Shared state of one walk, constructed per `enumerate` call
pub struct WalkerContext {
    /// Read-only options for this walk
    pub(crate) options: EnumerateOptions,

    /// Pending directory tasks
    pub(crate) queue: WorkQueue,

    /// Directories already claimed by a worker; guarantees at-most-once
    /// visitation even across reparse loops
    pub(crate) visited: DashSet<PathBuf>,

    /// Counters shared by all workers
    pub(crate) stats: WalkerStats,

    /// Cooperative cancellation flag
    pub(crate) cancel: CancellationToken,

    /// False for path-only enumeration
    pub(crate) resolve_security: bool,

    /// Process-wide SID translation cache
    pub(crate) sid_cache: Arc<SidCache>,

    /// Workers that have not yet exited
    pub(crate) live_workers: AtomicUsize,

    /// Walk start time
    pub(crate) started: Instant,
}

impl WalkerContext {
    /// Point-in-time progress view
    pub(crate) fn progress(&self) -> WalkProgress {
        let stats = self.stats.snapshot();
        WalkProgress {
            dirs: stats.dirs_processed,
            entries: stats.entries_emitted(),
            errors: stats.entries_failed,
            queue_len: self.queue.len(),
            active_workers: self.queue.active_workers(),
            live_workers: self.live_workers.load(Ordering::SeqCst),
            elapsed: self.started.elapsed(),
        }
    }
}

/// Progress information for display
#[derive(Debug, Clone)]
pub struct WalkProgress {
    /// Directories processed
    pub dirs: u64,

    /// Entries emitted so far
    pub entries: u64,

    /// Entries emitted with errors
    pub errors: u64,

    /// Current queue depth
    pub queue_len: usize,

    /// Workers currently holding a task
    pub active_workers: usize,

    /// Workers that have not yet exited
    pub live_workers: usize,

    /// Elapsed time
    pub elapsed: Duration,
}

impl WalkProgress {
    /// Calculate entries-per-second rate
    pub fn entries_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.entries as f64 / secs
        } else {
            0.0
        }
    }
}

/// Enumerate a directory tree, emitting one entry per visited file and/or
/// directory with its owner and ACL information
///
/// Returns a lazy [`EntryStream`]; the walk runs on background workers and
/// entries are pulled by iterating the stream. Fails synchronously only on
/// an empty, whitespace, or unresolvable root.
pub fn enumerate(root: impl AsRef<Path>, options: EnumerateOptions) -> Result<EntryStream> {
    start_walk(root.as_ref(), options, true)
}

/// Enumerate a directory tree, yielding path strings only
///
/// Skips security resolution entirely; useful for pure directory listing.
pub fn enumerate_paths(root: impl AsRef<Path>, options: EnumerateOptions) -> Result<PathStream> {
    start_walk(root.as_ref(), options, false).map(PathStream::new)
}

/// Validate the root argument; the only walk-fatal failure tier
fn validate_root(root: &Path) -> Result<PathBuf> {
    let display = root.to_string_lossy();
    if display.trim().is_empty() {
        return Err(WalkerError::InvalidRoot {
            path: display.into_owned(),
            reason: "path is empty or whitespace".into(),
        });
    }

    let meta = std::fs::metadata(root).map_err(|e| WalkerError::InvalidRoot {
        path: display.clone().into_owned(),
        reason: e.to_string(),
    })?;
    if !meta.is_dir() {
        return Err(WalkerError::InvalidRoot {
            path: display.into_owned(),
            reason: "not a directory".into(),
        });
    }

    Ok(root.to_path_buf())
}

fn start_walk(
    root: &Path,
    options: EnumerateOptions,
    resolve_security: bool,
) -> Result<EntryStream> {
    let root = validate_root(root)?;
    let cancel = options.cancellation.clone();
    let worker_count = options.worker_count.max(1);

    let ctx = Arc::new(WalkerContext {
        options,
        queue: WorkQueue::new(),
        visited: DashSet::new(),
        stats: WalkerStats::default(),
        cancel: cancel.clone(),
        resolve_security,
        sid_cache: SidCache::shared(),
        live_workers: AtomicUsize::new(0),
        started: Instant::now(),
    });

    info!(
        root = %root.display(),
        workers = worker_count,
        resolve_security,
        "Starting walk"
    );

    ctx.queue.seed(root);

    let (entry_tx, entry_rx) = unbounded();
    let mut workers = Vec::with_capacity(worker_count);
    for id in 0..worker_count {
        // Counted before the spawn so a just-created stream never observes
        // zero live workers ahead of the first thread starting
        ctx.live_workers.fetch_add(1, Ordering::SeqCst);
        match Worker::spawn(id, Arc::clone(&ctx), entry_tx.clone()) {
            Ok(worker) => workers.push(worker),
            Err(e) => {
                ctx.live_workers.fetch_sub(1, Ordering::SeqCst);
                cancel.cancel();
                return Err(e.into());
            }
        }
    }

    // Workers hold the only senders; the stream sees end-of-stream once
    // every worker has exited
    drop(entry_tx);

    Ok(EntryStream::new(entry_rx, ctx, workers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_root_rejects_empty_and_whitespace() {
        assert!(matches!(
            validate_root(Path::new("")),
            Err(WalkerError::InvalidRoot { .. })
        ));
        assert!(matches!(
            validate_root(Path::new("   ")),
            Err(WalkerError::InvalidRoot { .. })
        ));
    }

    #[test]
    fn test_validate_root_rejects_missing_path() {
        assert!(matches!(
            validate_root(Path::new("no/such/root/path")),
            Err(WalkerError::InvalidRoot { .. })
        ));
    }

    #[test]
    fn test_validate_root_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            validate_root(&file),
            Err(WalkerError::InvalidRoot { .. })
        ));
    }

    #[test]
    fn test_progress_rates() {
        let progress = WalkProgress {
            dirs: 100,
            entries: 10_000,
            errors: 2,
            queue_len: 5,
            active_workers: 3,
            live_workers: 4,
            elapsed: Duration::from_secs(10),
        };
        assert!((progress.entries_per_second() - 1000.0).abs() < 0.1);
    }
}
