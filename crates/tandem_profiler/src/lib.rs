//! # TANDEM Profiler
//!
//! Duration sampling for dispatch instrumentation.
//!
//! ## Usage
//!
//! ```rust
//! use tandem_profiler::Profiler;
//!
//! let mut profiler = Profiler::with_capacity(64);
//! for _ in 0..8 {
//!     profiler.measure(|| std::hint::black_box(40 + 2));
//! }
//!
//! let profile = profiler.flush()?;
//! assert!(profile.lowest <= profile.median && profile.median <= profile.highest);
//! println!("{profile}");
//! # Ok::<(), tandem_profiler::ProfilerError>(())
//! ```
//!
//! There is no process-wide "current" profiler. Whoever wants samples owns a
//! [`Profiler`] and passes it where it is needed.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod profiler;

pub use error::{ProfilerError, ProfilerResult};
pub use profiler::{Profile, Profiler};
