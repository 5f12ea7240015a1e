//! # Wait Strategies
//!
//! How a thread burns time while a barrier condition is not yet true.
//!
//! ```text
//!   Spin   ──> poll, poll, poll, ...                     (lowest wake latency)
//!   Yield  ──> poll x spin_limit, then yield to the OS
//!   Block  ──> poll x spin_limit, then park on a condvar (lowest idle CPU)
//! ```
//!
//! The condition itself is always an atomic load supplied by the caller; the
//! strategy never carries state that decides correctness.

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::primitives::{hint, yield_now};

/// Default number of polls before `Yield`/`Block` back off.
pub const DEFAULT_SPIN_LIMIT: u32 = 256;

/// Selects how waiting threads behave.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitStrategy {
    /// Busy-wait forever. Best latency, one full core per waiting thread.
    #[default]
    Spin,
    /// Busy-wait briefly, then hand the core back to the OS between polls.
    Yield,
    /// Busy-wait briefly, then sleep until notified.
    Block,
}

impl WaitStrategy {
    /// Returns true if waiters may be asleep and need an explicit wake-up.
    #[inline]
    #[must_use]
    pub const fn needs_notify(self) -> bool {
        matches!(self, Self::Block)
    }
}

/// A waiting policy plus the parking pair used by [`WaitStrategy::Block`].
///
/// One `Waiter` is shared by every participant of a barrier. Whoever changes
/// state that a waiter may be polling for must call [`Waiter::notify`]
/// afterwards; with the spinning strategies this is a no-op.
pub struct Waiter {
    strategy: WaitStrategy,
    spin_limit: u32,
    lock: Mutex<()>,
    condvar: Condvar,
}

impl Waiter {
    /// Creates a waiter.
    #[must_use]
    pub fn new(strategy: WaitStrategy, spin_limit: u32) -> Self {
        Self {
            strategy,
            spin_limit,
            lock: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    /// Returns the configured strategy.
    #[inline]
    #[must_use]
    pub fn strategy(&self) -> WaitStrategy {
        self.strategy
    }

    /// Returns the number of polls before backing off.
    #[inline]
    #[must_use]
    pub fn spin_limit(&self) -> u32 {
        self.spin_limit
    }

    /// Blocks the calling thread until `ready` returns true.
    ///
    /// `ready` must perform its own acquire load; this function adds no
    /// ordering of its own.
    pub fn wait_until<F>(&self, mut ready: F)
    where
        F: FnMut() -> bool,
    {
        match self.strategy {
            WaitStrategy::Spin => {
                while !ready() {
                    hint::spin_loop();
                }
            }
            WaitStrategy::Yield => {
                let mut spins = 0u32;
                while !ready() {
                    if spins < self.spin_limit {
                        hint::spin_loop();
                        spins += 1;
                    } else {
                        yield_now();
                    }
                }
            }
            WaitStrategy::Block => {
                for _ in 0..self.spin_limit {
                    if ready() {
                        return;
                    }
                    hint::spin_loop();
                }

                // The predicate is re-checked under the lock and notify() takes
                // the same lock, so a state change cannot slip in between the
                // check and the sleep.
                let mut guard = self.lock.lock();
                while !ready() {
                    self.condvar.wait(&mut guard);
                }
            }
        }
    }

    /// Wakes every parked waiter so it re-checks its condition.
    #[inline]
    pub fn notify(&self) {
        if self.strategy.needs_notify() {
            let _guard = self.lock.lock();
            self.condvar.notify_all();
        }
    }
}

impl std::fmt::Debug for Waiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("strategy", &self.strategy)
            .field("spin_limit", &self.spin_limit)
            .finish_non_exhaustive()
    }
}
