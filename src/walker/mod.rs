//! Parallel traversal engine
//!
//! A producer/consumer walker: a shared work queue of pending directories
//! feeds a pool of worker threads, each of which iterates one directory at a
//! time, pushes discovered subdirectories back onto the queue, resolves
//! security information for emitted entries, and hands finished records to
//! the output channel consumed by [`EntryStream`].
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────┐
//!                 │        enumerate()       │
//!                 │  seeds queue, spawns N   │
//!                 └────────────┬─────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!  ┌─────▼─────┐         ┌─────▼─────┐         ┌─────▼─────┐
//!  │  Worker 1 │         │  Worker 2 │         │  Worker N │
//!  │ find-iter │         │ find-iter │         │ find-iter │
//!  │ ACL+owner │         │ ACL+owner │         │ ACL+owner │
//!  └─────┬─────┘         └─────┬─────┘         └─────┬─────┘
//!        │    subdirs back to the work queue         │
//!        └─────────────────────┬─────────────────────┘
//!                              │ entries
//!                       ┌──────▼──────┐
//!                       │ EntryStream │
//!                       └─────────────┘
//! ```
//!
//! The walk terminates when the queue is empty and no worker holds a task,
//! observed as one consistent state via the active-worker counter.

pub mod coordinator;
pub mod queue;
pub mod stream;
pub mod worker;

pub use coordinator::{enumerate, enumerate_paths, WalkProgress};
pub use stream::{EntryStream, PathStream, WalkMonitor};
pub use worker::WalkStats;
