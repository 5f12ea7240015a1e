//! # Profiler
//!
//! Collects elapsed-time samples and reduces them to a [`Profile`].
//!
//! `end` both records a sample and becomes the next reference point, so a
//! loop of `end` calls after a single `start` measures consecutive intervals:
//!
//! ```text
//!   start ──── end ──── end ──── end
//!         s0        s1       s2
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{ProfilerError, ProfilerResult};

/// Summary statistics over one batch of samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Profile {
    /// Shortest sample.
    pub lowest: Duration,
    /// Longest sample.
    pub highest: Duration,
    /// Element at `len / 2` of the sorted samples.
    pub median: Duration,
    /// Arithmetic mean, truncated to whole nanoseconds.
    pub mean: Duration,
    /// Population standard deviation, truncated to whole nanoseconds.
    pub standard_deviation: Duration,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lowest {:?} | highest {:?} | median {:?} | mean {:?} | stddev {:?}",
            self.lowest, self.highest, self.median, self.mean, self.standard_deviation
        )
    }
}

/// Sample buffer plus the current reference instant.
#[derive(Debug, Default)]
pub struct Profiler {
    samples: Vec<Duration>,
    last: Option<Instant>,
}

impl Profiler {
    /// Creates an empty profiler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a profiler that can hold `capacity` samples without
    /// reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            last: None,
        }
    }

    /// Marks the start of an interval.
    #[inline]
    pub fn start(&mut self) {
        self.last = Some(Instant::now());
    }

    /// Records the time since the last `start` or `end` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`ProfilerError::NotStarted`] if `start` was never called.
    #[inline]
    pub fn end(&mut self) -> ProfilerResult<Duration> {
        let now = Instant::now();
        let last = self.last.ok_or(ProfilerError::NotStarted)?;
        let elapsed = now.duration_since(last);
        self.samples.push(elapsed);
        self.last = Some(now);
        Ok(elapsed)
    }

    /// Runs `f` between a `start` and an `end`.
    pub fn measure<R>(&mut self, f: impl FnOnce() -> R) -> R {
        let begin = Instant::now();
        let result = f();
        let now = Instant::now();
        self.samples.push(now.duration_since(begin));
        self.last = Some(now);
        result
    }

    /// Number of samples waiting to be flushed.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if there is nothing to flush.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Reduces the buffered samples to a [`Profile`] and clears the buffer.
    ///
    /// The reference instant is kept, so sampling can continue with `end`.
    ///
    /// # Errors
    ///
    /// Returns [`ProfilerError::NoSamples`] if the buffer is empty.
    pub fn flush(&mut self) -> ProfilerResult<Profile> {
        if self.samples.is_empty() {
            return Err(ProfilerError::NoSamples);
        }

        self.samples.sort_unstable();
        let profile = summarize(&self.samples);
        tracing::debug!(samples = self.samples.len(), %profile, "profiler flushed");
        self.samples.clear();

        Ok(profile)
    }
}

/// `sorted` must be non-empty and ascending.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn summarize(sorted: &[Duration]) -> Profile {
    let count = sorted.len() as u128;
    let sum = sorted
        .iter()
        .map(Duration::as_nanos)
        .fold(0u128, u128::saturating_add);
    let mean = sum / count;

    // Squared nanosecond outliers overflow u128; f64 only loses precision.
    let squares: f64 = sorted
        .iter()
        .map(|sample| {
            let difference = sample.as_nanos().abs_diff(mean) as f64;
            difference * difference
        })
        .sum();
    let deviation = (squares / count as f64).sqrt() as u128;

    Profile {
        lowest: sorted[0],
        highest: sorted[sorted.len() - 1],
        median: sorted[sorted.len() / 2],
        mean: from_nanos(mean),
        standard_deviation: from_nanos(deviation),
    }
}

fn from_nanos(nanos: u128) -> Duration {
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}
