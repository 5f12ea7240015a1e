//! # Ring Slot
//!
//! One position of the ring: a value plus the two flags of the
//! producer → consumer handshake.
//!
//! ## Safety Note
//!
//! The value lives in an `UnsafeCell<MaybeUninit<T>>`. Exclusive access is
//! granted by the flags, never by a lock:
//! - the producer writes only while `occupied == false`
//! - a consumer reads only after winning `available` with a swap
//!
//! ## Lifecycle
//!
//! ```text
//!   empty ──push──> occupied + available ──claim──> occupied ──take──> empty
//! ```

#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;

use crate::primitives::{AtomicBool, Ordering};

/// A single ring position.
pub(super) struct Slot<T> {
    /// Written and not yet consumed. Owned by the producer while false.
    occupied: AtomicBool,
    /// Ready to be claimed by exactly one consumer.
    available: AtomicBool,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    pub(super) fn new() -> Self {
        Self {
            occupied: AtomicBool::new(false),
            available: AtomicBool::new(false),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Returns true if the slot still holds an unconsumed value.
    ///
    /// Acquire pairs with the release in [`take`](Self::take): once this reads
    /// false, the consumer's read of the old value is complete.
    #[inline]
    pub(super) fn is_occupied(&self) -> bool {
        self.occupied.load(Ordering::Acquire)
    }

    /// Stores a value and makes it claimable.
    ///
    /// # Safety
    ///
    /// Only the single producer may call this, and only after
    /// [`is_occupied`](Self::is_occupied) returned false.
    #[inline]
    pub(super) unsafe fn publish(&self, value: T) {
        // SAFETY: the slot is empty, so no consumer can be reading it.
        unsafe { (*self.value.get()).write(value) };
        self.occupied.store(true, Ordering::Relaxed);
        // Release: a consumer that sees `available` sees the value.
        self.available.store(true, Ordering::Release);
    }

    /// Attempts to win exclusive ownership of the value.
    #[inline]
    pub(super) fn try_claim(&self) -> bool {
        self.available.swap(false, Ordering::AcqRel)
    }

    /// Moves the value out and hands the slot back to the producer.
    ///
    /// # Safety
    ///
    /// The caller must have won [`try_claim`](Self::try_claim) and must call
    /// this exactly once per successful claim.
    #[inline]
    pub(super) unsafe fn take(&self) -> T {
        // SAFETY: the winning claim is exclusive and the value was initialized
        // by `publish` before `available` was released.
        let value = unsafe { (*self.value.get()).assume_init_read() };
        self.occupied.store(false, Ordering::Release);
        value
    }
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        // Unclaimed values (including slots orphaned by eviction) are dropped
        // with the ring.
        if self.occupied.load(Ordering::Acquire) {
            // SAFETY: `&mut self` means no handle can race us, and an occupied
            // slot always holds an initialized value at rest.
            unsafe { self.value.get_mut().assume_init_drop() };
        }
    }
}

// SAFETY: values are moved between threads (requires `T: Send`) and access is
// serialized by the occupied/available handshake, never shared.
unsafe impl<T: Send> Send for Slot<T> {}
// SAFETY: see above. `&Slot` only ever yields owned `T`, never `&T`.
unsafe impl<T: Send> Sync for Slot<T> {}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_slot_handshake() {
        let slot = Slot::new();
        assert!(!slot.is_occupied());
        assert!(!slot.try_claim());

        unsafe { slot.publish(7u32) };
        assert!(slot.is_occupied());

        assert!(slot.try_claim());
        // Second claim loses.
        assert!(!slot.try_claim());
        assert!(slot.is_occupied());

        assert_eq!(unsafe { slot.take() }, 7);
        assert!(!slot.is_occupied());
    }

    #[test]
    fn test_slot_drops_unclaimed_value() {
        let tracker = Arc::new(());
        {
            let slot = Slot::new();
            unsafe { slot.publish(Arc::clone(&tracker)) };
            assert_eq!(Arc::strong_count(&tracker), 2);
        }
        assert_eq!(Arc::strong_count(&tracker), 1);
    }
}
