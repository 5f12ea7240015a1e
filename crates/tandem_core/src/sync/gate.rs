//! # Arrival Gate
//!
//! The entry barrier of a dispatch. Counts participants back to idle; a new
//! dispatch may only be published once the gate is full again.
//!
//! ## Memory Ordering Contract
//!
//! `arrive` and `reset` are relaxed. The gate only answers "is every
//! participant out of the previous round's exit wait?". Visibility of the
//! previous round's writes is already provided by the counting latch, whose
//! acq-rel count-downs every participant performs before arriving here.
//! `is_full` loads with acquire so the publisher's subsequent writes cannot be
//! hoisted above the check.

use crossbeam_utils::CachePadded;

use super::wait::Waiter;
use crate::primitives::{AtomicUsize, Ordering};

/// Counts participants that have returned to idle.
#[derive(Debug)]
pub struct ArrivalGate {
    arrived: CachePadded<AtomicUsize>,
    parties: usize,
}

impl ArrivalGate {
    /// Creates a full gate (every participant idle).
    #[must_use]
    pub fn new(parties: usize) -> Self {
        Self {
            arrived: CachePadded::new(AtomicUsize::new(parties)),
            parties,
        }
    }

    /// Returns the number of participants the gate waits for.
    #[inline]
    #[must_use]
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Returns how many participants are currently idle.
    #[inline]
    #[must_use]
    pub fn arrived(&self) -> usize {
        self.arrived.load(Ordering::Relaxed)
    }

    /// Returns true once every participant has arrived.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.arrived.load(Ordering::Acquire) == self.parties
    }

    /// Marks every participant busy. Only the publisher calls this, and only
    /// while the gate is full.
    #[inline]
    pub fn reset(&self) {
        self.arrived.store(0, Ordering::Relaxed);
    }

    /// Marks one participant idle. Returns true if it was the last one.
    #[inline]
    pub fn arrive(&self) -> bool {
        let previous = self.arrived.fetch_add(1, Ordering::Relaxed);
        debug_assert!(previous < self.parties, "more arrivals than parties");
        previous + 1 == self.parties
    }

    /// Waits until the gate is full.
    pub fn wait_full(&self, waiter: &Waiter) {
        if !self.is_full() {
            waiter.wait_until(|| self.is_full());
        }
    }
}
