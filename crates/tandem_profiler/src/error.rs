//! Profiler error types.

use thiserror::Error;

/// Errors that can occur while sampling.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilerError {
    /// `end` was called before any `start`.
    #[error("profiler end() called before start()")]
    NotStarted,

    /// `flush` was called with no recorded samples.
    #[error("no samples recorded")]
    NoSamples,
}

/// Result type for profiler operations.
pub type ProfilerResult<T> = Result<T, ProfilerError>;
