//! Caller-facing lazy streams
//!
//! [`EntryStream`] bridges the workers' output channel to pull-based
//! consumption. It is finite and non-restartable: iteration blocks while
//! the walk is in flight and ends when every worker has exited (normal
//! completion or observed cancellation). Dropping the stream cancels the
//! walk and waits a bounded time for the workers to quiesce.

use crate::cancel::CancellationToken;
use crate::entry::FileSystemEntry;
use crate::walker::coordinator::{WalkProgress, WalkerContext};
use crate::walker::worker::{WalkStats, Worker};
use crossbeam_channel::Receiver;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::warn;

/// How long `Drop` waits for workers to observe cancellation and exit
const QUIESCE_GRACE: Duration = Duration::from_secs(30);

/// Poll interval while waiting for quiescence
const QUIESCE_POLL: Duration = Duration::from_millis(10);

/// Lazy, single-use sequence of walk results
pub struct EntryStream {
    rx: Receiver<FileSystemEntry>,
    ctx: Arc<WalkerContext>,
    workers: Vec<Worker>,
}

impl EntryStream {
    pub(crate) fn new(
        rx: Receiver<FileSystemEntry>,
        ctx: Arc<WalkerContext>,
        workers: Vec<Worker>,
    ) -> Self {
        Self { rx, ctx, workers }
    }

    /// Snapshot of the walk counters
    pub fn stats(&self) -> WalkStats {
        self.ctx.stats.snapshot()
    }

    /// The walk's cancellation token
    pub fn cancellation(&self) -> CancellationToken {
        self.ctx.cancel.clone()
    }

    /// A clonable monitor for progress polling from another thread
    pub fn monitor(&self) -> WalkMonitor {
        WalkMonitor {
            ctx: Arc::clone(&self.ctx),
        }
    }

    /// Cancel the walk and wait up to `grace` for workers to exit
    fn shutdown(&mut self, grace: Duration) {
        self.ctx.cancel.cancel();

        let deadline = Instant::now() + grace;
        while self.ctx.live_workers.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
            thread::sleep(QUIESCE_POLL);
        }

        if self.ctx.live_workers.load(Ordering::SeqCst) == 0 {
            for worker in self.workers.drain(..) {
                if let Err(e) = worker.join() {
                    warn!(error = %e, "Worker failed to join cleanly");
                }
            }
        } else {
            // A worker is stuck in an uninterruptible OS call; leave it to
            // finish detached rather than blocking the caller forever
            warn!(grace_secs = grace.as_secs(), "Workers did not quiesce in time");
            self.workers.clear();
        }
    }
}

impl Iterator for EntryStream {
    type Item = FileSystemEntry;

    /// Blocks while no entry is available and the walk is not finished;
    /// returns `None` once every worker has exited and the channel drained
    fn next(&mut self) -> Option<FileSystemEntry> {
        self.rx.recv().ok()
    }
}

impl Drop for EntryStream {
    fn drop(&mut self) {
        self.shutdown(QUIESCE_GRACE);
    }
}

/// Lazy sequence of path strings from [`enumerate_paths`]
///
/// [`enumerate_paths`]: crate::walker::coordinator::enumerate_paths
pub struct PathStream {
    inner: EntryStream,
}

impl PathStream {
    pub(crate) fn new(inner: EntryStream) -> Self {
        Self { inner }
    }

    /// Snapshot of the walk counters
    pub fn stats(&self) -> WalkStats {
        self.inner.stats()
    }

    /// The walk's cancellation token
    pub fn cancellation(&self) -> CancellationToken {
        self.inner.cancellation()
    }
}

impl Iterator for PathStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.inner.next().map(|entry| entry.path)
    }
}

/// Clonable handle for observing a walk from another thread
#[derive(Clone)]
pub struct WalkMonitor {
    ctx: Arc<WalkerContext>,
}

impl WalkMonitor {
    /// Point-in-time progress view
    pub fn progress(&self) -> WalkProgress {
        self.ctx.progress()
    }

    /// Snapshot of the walk counters
    pub fn stats(&self) -> WalkStats {
        self.ctx.stats.snapshot()
    }

    /// True once every worker has exited
    pub fn is_finished(&self) -> bool {
        self.ctx.live_workers.load(Ordering::SeqCst) == 0
    }

    /// Signal cancellation
    pub fn cancel(&self) {
        self.ctx.cancel.cancel();
    }
}
