//! Worker thread logic for the parallel walk
//!
//! Each worker:
//! - Pulls directory tasks from the shared work queue under a [`WorkGuard`]
//! - Skips directories already claimed in the visited set
//! - Iterates children through the find-handle iterator
//! - Pushes subdirectories back to the queue, subject to the depth cap
//! - Resolves security information and emits finished entries
//!
//! Cancellation is observed before each pop and between children; per-entry
//! failures are recorded on the entry and never stop the loop.

use crate::entry::{EntryKind, FileSystemEntry};
use crate::error::WorkerError;
use crate::walker::coordinator::WalkerContext;
use crate::walker::queue::{DirTask, WorkGuard, WorkQueueSender};
use crate::win32::{DirIter, SecurityPolicy, SecurityResolver};
use crossbeam_channel::Sender;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, trace};

/// Sleep between pop attempts while the queue is empty but the walk is not
/// yet complete
const IDLE_BACKOFF: Duration = Duration::from_millis(1);

/// Statistics shared by all workers of one walk
#[derive(Debug, Default)]
pub struct WalkerStats {
    /// Directories iterated
    pub dirs_processed: AtomicU64,

    /// File entries emitted
    pub files_emitted: AtomicU64,

    /// Directory entries emitted
    pub dirs_emitted: AtomicU64,

    /// Entries emitted with a classified error
    pub entries_failed: AtomicU64,
}

impl WalkerStats {
    fn record_dir(&self) {
        self.dirs_processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_emitted(&self, kind: EntryKind) {
        match kind {
            EntryKind::File => self.files_emitted.fetch_add(1, Ordering::Relaxed),
            EntryKind::Directory => self.dirs_emitted.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn record_failed(&self) {
        self.entries_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time snapshot of the counters
    pub fn snapshot(&self) -> WalkStats {
        WalkStats {
            dirs_processed: self.dirs_processed.load(Ordering::Relaxed),
            files_emitted: self.files_emitted.load(Ordering::Relaxed),
            dirs_emitted: self.dirs_emitted.load(Ordering::Relaxed),
            entries_failed: self.entries_failed.load(Ordering::Relaxed),
        }
    }
}

/// Plain snapshot of [`WalkerStats`]
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkStats {
    /// Directories iterated
    pub dirs_processed: u64,

    /// File entries emitted
    pub files_emitted: u64,

    /// Directory entries emitted
    pub dirs_emitted: u64,

    /// Entries emitted with a classified error
    pub entries_failed: u64,
}

impl WalkStats {
    /// Total entries emitted
    pub fn entries_emitted(&self) -> u64 {
        self.files_emitted + self.dirs_emitted
    }
}

/// Decrements the live-worker count when the thread exits, panics included
struct LiveGuard<'a>(&'a AtomicUsize);

impl Drop for LiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A worker thread processing directory tasks
pub struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn a new worker thread
    ///
    /// The caller must have incremented the context's live-worker count
    /// before spawning; the worker decrements it on exit.
    pub fn spawn(
        id: usize,
        ctx: Arc<WalkerContext>,
        entry_tx: Sender<FileSystemEntry>,
    ) -> Result<Self, WorkerError> {
        let handle = thread::Builder::new()
            .name(format!("acl-walker-{}", id))
            .spawn(move || worker_loop(id, ctx, entry_tx))
            .map_err(|e| WorkerError::InitFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| WorkerError::Panicked { id: self.id })
        } else {
            Ok(())
        }
    }
}

/// Main worker loop
fn worker_loop(id: usize, ctx: Arc<WalkerContext>, entry_tx: Sender<FileSystemEntry>) {
    let _live = LiveGuard(&ctx.live_workers);

    debug!(worker = id, "Worker starting");

    let resolver = SecurityResolver::new(Arc::clone(&ctx.sid_cache));
    let policy = SecurityPolicy {
        include_inherited: ctx.options.include_inherited,
        resolve_owner: ctx.options.resolve_owner,
        use_native_owner: ctx.options.use_native_owner,
    };
    let queue_rx = ctx.queue.receiver();
    let queue_tx = ctx.queue.sender();

    loop {
        if ctx.cancel.is_cancelled() {
            break;
        }

        // The guard is taken before the pop so the active count covers the
        // window between dequeuing a task and pushing its subdirectories.
        let guard = WorkGuard::new(&queue_rx);
        match queue_rx.try_pop() {
            Some(task) => {
                process_directory(id, &task, &ctx, &resolver, policy, &queue_tx, &entry_tx);
                drop(guard);
            }
            None => {
                drop(guard);
                if queue_rx.is_complete() {
                    break;
                }
                thread::sleep(IDLE_BACKOFF);
            }
        }
    }

    debug!(
        worker = id,
        dirs = ctx.stats.dirs_processed.load(Ordering::Relaxed),
        "Worker exiting"
    );
}

/// Process a single directory task
fn process_directory(
    id: usize,
    task: &DirTask,
    ctx: &WalkerContext,
    resolver: &SecurityResolver,
    policy: SecurityPolicy,
    queue_tx: &WorkQueueSender,
    entry_tx: &Sender<FileSystemEntry>,
) {
    // At-most-once visitation, even if a reparse loop or duplicate push
    // put the same directory on the queue twice
    if !ctx.visited.insert(task.path.clone()) {
        trace!(worker = id, path = %task.path.display(), "Already visited");
        return;
    }

    if !ctx.options.within_depth(task.depth) {
        return;
    }

    ctx.stats.record_dir();
    trace!(
        worker = id,
        path = %task.path.display(),
        depth = task.depth,
        "Processing directory"
    );

    for child in DirIter::open(&task.path, &ctx.options.search_pattern) {
        // Between-children cancellation checkpoint; the find handle is
        // released by the iterator's drop on this early return
        if ctx.cancel.is_cancelled() {
            return;
        }

        let full = task.path.join(&child.name);
        match EntryKind::from_attributes(child.attributes) {
            EntryKind::Directory => {
                // Hard depth cap: nothing is pushed beyond it
                if ctx.options.within_depth(task.depth + 1)
                    && !queue_tx.push(DirTask::new(full.clone(), task.depth + 1))
                {
                    // A subtree that cannot be scheduled would be lost
                    // silently; wind the walk down instead
                    error!(
                        worker = id,
                        path = %full.display(),
                        error = %WorkerError::QueueSendFailed,
                        "Failed to requeue subdirectory"
                    );
                    ctx.cancel.cancel();
                    return;
                }
                if ctx.options.search_for.includes_dirs() {
                    emit_entry(id, ctx, resolver, policy, entry_tx, full, child.attributes);
                }
            }
            EntryKind::File => {
                if ctx.options.search_for.includes_files() {
                    emit_entry(id, ctx, resolver, policy, entry_tx, full, child.attributes);
                }
            }
        }
    }
}

/// Resolve security information for one entry and hand it to the stream
fn emit_entry(
    id: usize,
    ctx: &WalkerContext,
    resolver: &SecurityResolver,
    policy: SecurityPolicy,
    entry_tx: &Sender<FileSystemEntry>,
    path: PathBuf,
    attributes: u32,
) {
    let path_str = path.to_string_lossy().into_owned();

    let entry = if ctx.resolve_security {
        match resolver.resolve(&path, policy) {
            Ok(info) => FileSystemEntry::resolved(path_str, attributes, info.owner, info.acl),
            Err(kind) => {
                ctx.stats.record_failed();
                debug!(
                    worker = id,
                    path = %path.display(),
                    error = %kind,
                    "Security resolution failed"
                );
                FileSystemEntry::failed(path_str, attributes, kind)
            }
        }
    } else {
        FileSystemEntry::bare(path_str, attributes)
    };

    ctx.stats.record_emitted(entry.kind());

    if entry_tx.send(entry).is_err() {
        // Consumer dropped the stream; wind the walk down
        ctx.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walker_stats() {
        let stats = WalkerStats::default();

        stats.record_dir();
        stats.record_emitted(EntryKind::File);
        stats.record_emitted(EntryKind::File);
        stats.record_emitted(EntryKind::Directory);
        stats.record_failed();

        let snap = stats.snapshot();
        assert_eq!(snap.dirs_processed, 1);
        assert_eq!(snap.files_emitted, 2);
        assert_eq!(snap.dirs_emitted, 1);
        assert_eq!(snap.entries_failed, 1);
        assert_eq!(snap.entries_emitted(), 3);
    }
}
