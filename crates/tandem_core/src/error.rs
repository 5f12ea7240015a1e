//! # Core Error Types
//!
//! All errors that can occur while building or driving the scheduler, plus the
//! queue's back-pressure signal.

use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the scheduler and its configuration.
#[derive(Error, Debug)]
pub enum ParallelError {
    /// A pool needs at least one participant (the calling thread).
    #[error("invalid thread count: {0} (must be at least 1)")]
    InvalidThreadCount(usize),

    /// The OS refused to create a worker thread.
    #[error("failed to spawn worker {worker}: {source}")]
    ThreadSpawn {
        /// Index of the worker that could not be created.
        worker: usize,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be parsed or holds invalid values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("failed to read configuration {}: {source}", path.display())]
    ConfigIo {
        /// File that was being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// At least one slice of a dispatch panicked.
    #[error("worker {worker} panicked: {message} ({failed} of {total} workers failed)")]
    WorkerPanicked {
        /// Lowest worker index that panicked.
        worker: usize,
        /// Panic payload rendered as text.
        message: String,
        /// Number of workers whose slice failed.
        failed: usize,
        /// Number of workers that took part in the dispatch.
        total: usize,
    },

    /// At least one slice of a fallible dispatch returned an error.
    #[error("worker {worker} failed: {source} ({failed} of {total} workers failed)")]
    TaskFailed {
        /// Lowest worker index that failed.
        worker: usize,
        /// Error returned by the slice.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
        /// Number of workers whose slice failed.
        failed: usize,
        /// Number of workers that took part in the dispatch.
        total: usize,
    },

    /// A worker was released into a dispatch with no task to run.
    #[error("worker {worker} found no task to run ({failed} of {total} workers failed)")]
    SliceSkipped {
        /// Lowest worker index that could not run its slice.
        worker: usize,
        /// Number of workers whose slice failed.
        failed: usize,
        /// Number of workers that took part in the dispatch.
        total: usize,
    },
}

impl ParallelError {
    /// Returns the worker index blamed by a dispatch failure, if any.
    #[must_use]
    pub fn failed_worker(&self) -> Option<usize> {
        match self {
            Self::WorkerPanicked { worker, .. }
            | Self::TaskFailed { worker, .. }
            | Self::SliceSkipped { worker, .. } => Some(*worker),
            _ => None,
        }
    }
}

/// Result type for scheduler operations.
pub type ParallelResult<T> = Result<T, ParallelError>;

/// Returned by a push into a full queue. Carries the rejected value back so
/// the caller decides whether to retry or drop it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("queue is full")]
pub struct QueueFull<T>(pub T);

impl<T> QueueFull<T> {
    /// Takes the rejected value back.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}
