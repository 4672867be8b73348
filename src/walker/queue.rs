//! Work queue for directory tasks
//!
//! An unbounded multi-producer multi-consumer queue of pending directories.
//! Every reachable directory must be visited exactly once, so the queue
//! never sheds tasks; memory is bounded in practice by tree breadth.
//!
//! Termination protocol: a worker increments the active counter *before*
//! attempting a pop (via [`WorkGuard`]) and releases it after finishing the
//! task. The walk is complete only when the queue is empty AND the active
//! count is zero, observed in that order under SeqCst. A worker that popped
//! the last task but has not yet pushed its subdirectories is still counted
//! active, so the empty-queue observation alone can never end the walk
//! early.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// A task to walk one directory
#[derive(Debug, Clone)]
pub struct DirTask {
    /// Full path to the directory
    pub path: PathBuf,

    /// Depth from root (0 = root)
    pub depth: u32,
}

impl DirTask {
    /// Create a new directory task
    pub fn new(path: PathBuf, depth: u32) -> Self {
        Self { path, depth }
    }

    /// Create the root task
    pub fn root(path: PathBuf) -> Self {
        Self { path, depth: 0 }
    }
}

/// Statistics for the work queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total tasks enqueued
    pub enqueued: AtomicU64,

    /// Total tasks dequeued
    pub dequeued: AtomicU64,
}

/// Work queue shared by all workers of one walk
pub struct WorkQueue {
    sender: Sender<DirTask>,
    receiver: Receiver<DirTask>,

    /// Number of workers currently holding a task
    active_workers: Arc<AtomicUsize>,

    /// Queue statistics
    stats: Arc<QueueStats>,
}

impl WorkQueue {
    /// Create a new, empty work queue
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();

        Self {
            sender,
            receiver,
            active_workers: Arc::new(AtomicUsize::new(0)),
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Get a sender handle (clone for each worker)
    pub fn sender(&self) -> WorkQueueSender {
        WorkQueueSender {
            sender: self.sender.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Get a receiver handle (clone for each worker)
    pub fn receiver(&self) -> WorkQueueReceiver {
        WorkQueueReceiver {
            receiver: self.receiver.clone(),
            active_workers: Arc::clone(&self.active_workers),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Seed the queue with the root directory
    pub fn seed(&self, root: PathBuf) {
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        // An unbounded channel only errors when disconnected, and the queue
        // owns both ends at seed time.
        let _ = self.sender.send(DirTask::root(root));
    }

    /// Current number of pending tasks
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Check if the queue has no pending tasks
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Number of workers currently holding a task
    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }

    /// Get queue statistics
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }

    /// Check if all work is complete: queue empty AND no worker active
    pub fn is_complete(&self) -> bool {
        self.receiver.is_empty() && self.active_workers.load(Ordering::SeqCst) == 0
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for pushing tasks onto the queue
#[derive(Clone)]
pub struct WorkQueueSender {
    sender: Sender<DirTask>,
    stats: Arc<QueueStats>,
}

impl WorkQueueSender {
    /// Push a task; returns false if the queue is disconnected
    pub fn push(&self, task: DirTask) -> bool {
        match self.sender.send(task) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => false,
        }
    }
}

/// Handle for popping tasks from the queue
#[derive(Clone)]
pub struct WorkQueueReceiver {
    receiver: Receiver<DirTask>,
    active_workers: Arc<AtomicUsize>,
    stats: Arc<QueueStats>,
}

impl WorkQueueReceiver {
    /// Try to pop a task without blocking
    pub fn try_pop(&self) -> Option<DirTask> {
        match self.receiver.try_recv() {
            Ok(task) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(task)
            }
            Err(_) => None,
        }
    }

    /// Check if the queue has no pending tasks
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Check if all work is complete: queue empty AND no worker active
    pub fn is_complete(&self) -> bool {
        self.receiver.is_empty() && self.active_workers.load(Ordering::SeqCst) == 0
    }

    fn begin_work(&self) {
        self.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    fn end_work(&self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// RAII guard for the active-worker count
///
/// Constructed before the pop attempt so the counter covers the window
/// between dequeuing a task and pushing its subdirectories.
pub struct WorkGuard<'a> {
    receiver: &'a WorkQueueReceiver,
}

impl<'a> WorkGuard<'a> {
    /// Mark the worker active
    pub fn new(receiver: &'a WorkQueueReceiver) -> Self {
        receiver.begin_work();
        Self { receiver }
    }
}

impl Drop for WorkGuard<'_> {
    fn drop(&mut self) {
        self.receiver.end_work();
    }
}
