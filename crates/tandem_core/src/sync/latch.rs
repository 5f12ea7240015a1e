//! # Counting Latch
//!
//! The exit barrier of a dispatch: armed with `N`, counted down once per
//! participant, open again at zero.
//!
//! ## Memory Ordering Contract
//!
//! | Operation     | Ordering | Pairs with                                  |
//! |---------------|----------|---------------------------------------------|
//! | `arm`         | Release  | `pending` in participants about to work     |
//! | `pending`     | Acquire  | `arm` (publication), `count_down` (exit)    |
//! | `count_down`  | AcqRel   | every other `count_down` of the same round  |
//!
//! Everything a participant wrote before its `count_down` is visible to any
//! thread that later observes the latch at zero.

use crossbeam_utils::CachePadded;

use super::wait::Waiter;
use crate::primitives::{AtomicUsize, Ordering};

/// Reusable count-down latch.
#[derive(Debug)]
pub struct CountingLatch {
    remaining: CachePadded<AtomicUsize>,
}

impl CountingLatch {
    /// Creates an open latch (count zero).
    #[must_use]
    pub fn new() -> Self {
        Self {
            remaining: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Arms the latch for `count` participants.
    ///
    /// Anything written before this call is visible to a thread whose
    /// [`pending`](Self::pending) returns the armed value.
    #[inline]
    pub fn arm(&self, count: usize) {
        self.remaining.store(count, Ordering::Release);
    }

    /// Returns how many participants have not yet counted down.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Returns true once every participant has counted down.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.pending() == 0
    }

    /// Counts one participant down. Returns true for the final arrival.
    ///
    /// # Panics
    ///
    /// Debug builds panic if the latch was not armed.
    #[inline]
    pub fn count_down(&self) -> bool {
        let previous = self.remaining.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "count_down on an open latch");
        previous == 1
    }

    /// Counts down and waits until every other participant has too.
    ///
    /// The final arrival wakes the others and returns without waiting.
    pub fn arrive_and_wait(&self, waiter: &Waiter) {
        if self.count_down() {
            waiter.notify();
        } else {
            waiter.wait_until(|| self.is_open());
        }
    }
}

impl Default for CountingLatch {
    fn default() -> Self {
        Self::new()
    }
}
