//! # Bounded Ring Queue
//!
//! Fixed-capacity, lock-free, single-producer / multi-consumer ring.
//!
//! ## Safety Note
//!
//! The only unsafe code is the slot value access, guarded by the slot
//! handshake (see `slot.rs`). Single-producer is enforced by the type system:
//! there is exactly one non-cloneable [`Producer`] per ring.
//!
//! ## Architecture
//!
//! ```text
//!                      ┌──────────────────────────────────┐
//!   Producer ──push──> │ back (producer-private)          │
//!   (exactly one)      │                                  │
//!                      │ [slot 0][slot 1] ... [slot C-1]  │
//!                      │                                  │
//!   Consumer ──pop───> │ front (shared ticket counter)    │
//!   Consumer ──pop───> │ evicted (one-way shutdown flag)  │
//!   Consumer ──pop───> └──────────────────────────────────┘
//! ```
//!
//! ## Claiming
//!
//! A consumer takes a ticket with `fetch_add` on `front`. The ticket modulo
//! the capacity is its slot; tickets are unique, so two consumers only meet at
//! the same slot if they are a full lap apart, and then the `available` swap
//! picks exactly one winner. Whoever draws a ticket that lands on slot 0 past
//! the first lap subtracts one capacity from `front`, keeping the counter
//! bounded without changing any future ticket's slot.

#![allow(unsafe_code)]

use std::sync::Arc;

use crossbeam_utils::CachePadded;

use super::slot::Slot;
use crate::error::QueueFull;
use crate::primitives::{hint, AtomicBool, AtomicUsize, Ordering};

/// Shared state of a single-producer / multi-consumer ring.
///
/// Build one with [`BoundedRingQueue::new`] and [`split`](Self::split) it, or
/// use [`bounded`].
///
/// ## Usage
///
/// ```rust
/// use tandem_core::queue::bounded;
///
/// let (mut producer, consumer) = bounded::<u32, 8>();
/// producer.push(3).unwrap();
/// assert_eq!(consumer.pop(), Some(3));
/// ```
pub struct BoundedRingQueue<T, const CAPACITY: usize> {
    /// One-way shutdown flag polled by spinning consumers.
    evicted: CachePadded<AtomicBool>,
    /// Ticket counter shared by every consumer.
    front: CachePadded<AtomicUsize>,
    /// The ring.
    slots: Box<[CachePadded<Slot<T>>]>,
}

impl<T, const CAPACITY: usize> BoundedRingQueue<T, CAPACITY> {
    /// Creates an empty ring. All slots are allocated here, never later.
    ///
    /// # Panics
    ///
    /// Panics if `CAPACITY` is zero.
    #[must_use]
    pub fn new() -> Self {
        assert!(CAPACITY > 0, "Capacity must be greater than zero");

        let slots: Vec<CachePadded<Slot<T>>> =
            (0..CAPACITY).map(|_| CachePadded::new(Slot::new())).collect();

        Self {
            evicted: CachePadded::new(AtomicBool::new(false)),
            front: CachePadded::new(AtomicUsize::new(0)),
            slots: slots.into_boxed_slice(),
        }
    }

    /// Splits the ring into its single producer and a cloneable consumer.
    #[must_use]
    pub fn split(self) -> (Producer<T, CAPACITY>, Consumer<T, CAPACITY>) {
        let queue = Arc::new(self);
        (
            Producer {
                queue: Arc::clone(&queue),
                back: 0,
            },
            Consumer { queue },
        )
    }

    /// Returns the fixed capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        CAPACITY
    }

    /// Returns true once consumers have been evicted.
    #[inline]
    #[must_use]
    pub fn is_evicted(&self) -> bool {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Tells every spinning consumer to give up its claim and return `None`.
    ///
    /// One-way. Items pushed but not yet claimed are not drained; they are
    /// dropped with the ring.
    pub fn evict_waiting_consumers(&self) {
        self.evicted.store(true, Ordering::Relaxed);
        tracing::debug!(capacity = CAPACITY, "evicting waiting consumers");
    }

    #[inline]
    fn slot(&self, index: usize) -> &Slot<T> {
        &self.slots[index]
    }

    /// Claims the next ticket and spins until its slot can be taken.
    fn pop(&self) -> Option<T> {
        let ticket = self.front.fetch_add(1, Ordering::AcqRel);
        let index = ticket % CAPACITY;

        // Only the thread that drew a lap-crossing ticket pulls the counter
        // back. Tickets already handed out keep their slot.
        if ticket >= CAPACITY && index == 0 {
            self.front.fetch_sub(CAPACITY, Ordering::Release);
        }

        let slot = self.slot(index);
        while !slot.try_claim() {
            if self.evicted.load(Ordering::Relaxed) {
                // The ticket is abandoned; acceptable only on shutdown.
                return None;
            }
            hint::spin_loop();
        }

        // SAFETY: we won the claim on this slot.
        Some(unsafe { slot.take() })
    }
}

impl<T, const CAPACITY: usize> Default for BoundedRingQueue<T, CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const CAPACITY: usize> std::fmt::Debug for BoundedRingQueue<T, CAPACITY> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedRingQueue")
            .field("capacity", &CAPACITY)
            .field("front", &self.front.load(Ordering::Relaxed))
            .field("evicted", &self.is_evicted())
            .finish_non_exhaustive()
    }
}

/// Creates a ring of `CAPACITY` slots and returns its two ends.
///
/// # Panics
///
/// Panics if `CAPACITY` is zero.
#[must_use]
pub fn bounded<T, const CAPACITY: usize>() -> (Producer<T, CAPACITY>, Consumer<T, CAPACITY>) {
    BoundedRingQueue::new().split()
}

/// The single writing end of a ring.
///
/// Not `Clone`: one producer per ring, by construction. `push` takes
/// `&mut self`, so even a shared producer cannot race its own `back` index.
pub struct Producer<T, const CAPACITY: usize> {
    queue: Arc<BoundedRingQueue<T, CAPACITY>>,
    /// Next slot to write. Never touched by consumers.
    back: usize,
}

impl<T, const CAPACITY: usize> Producer<T, CAPACITY> {
    /// Pushes a value without blocking.
    ///
    /// This is a **O(1)** operation with **zero heap allocations**.
    ///
    /// # Errors
    ///
    /// Returns [`QueueFull`] with the value if the next slot still holds an
    /// unconsumed item. Retry or drop is the caller's policy.
    pub fn push(&mut self, value: T) -> Result<(), QueueFull<T>> {
        let slot = self.queue.slot(self.back);

        if slot.is_occupied() {
            return Err(QueueFull(value));
        }

        // SAFETY: we are the only producer and the slot is empty.
        unsafe { slot.publish(value) };
        self.back = if self.back + 1 == CAPACITY { 0 } else { self.back + 1 };

        Ok(())
    }

    /// Returns true if the next push would be rejected.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.queue.slot(self.back).is_occupied()
    }

    /// Returns the fixed capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        CAPACITY
    }

    /// See [`BoundedRingQueue::evict_waiting_consumers`].
    #[inline]
    pub fn evict_waiting_consumers(&self) {
        self.queue.evict_waiting_consumers();
    }

    /// Returns true once consumers have been evicted.
    #[inline]
    #[must_use]
    pub fn is_evicted(&self) -> bool {
        self.queue.is_evicted()
    }
}

impl<T, const CAPACITY: usize> std::fmt::Debug for Producer<T, CAPACITY> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("back", &self.back)
            .field("queue", &self.queue)
            .finish()
    }
}

/// A reading end of a ring. Clone freely; any number may pop concurrently.
pub struct Consumer<T, const CAPACITY: usize> {
    queue: Arc<BoundedRingQueue<T, CAPACITY>>,
}

impl<T, const CAPACITY: usize> Consumer<T, CAPACITY> {
    /// Takes the next item, spinning until the producer supplies one.
    ///
    /// Returns `None` only after eviction. The wait is unbounded otherwise:
    /// a pop on a ring nobody pushes to spins until
    /// [`evict_waiting_consumers`](Self::evict_waiting_consumers) is called.
    #[must_use]
    pub fn pop(&self) -> Option<T> {
        self.queue.pop()
    }

    /// Returns the fixed capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        CAPACITY
    }

    /// See [`BoundedRingQueue::evict_waiting_consumers`].
    #[inline]
    pub fn evict_waiting_consumers(&self) {
        self.queue.evict_waiting_consumers();
    }

    /// Returns true once consumers have been evicted.
    #[inline]
    #[must_use]
    pub fn is_evicted(&self) -> bool {
        self.queue.is_evicted()
    }
}

impl<T, const CAPACITY: usize> Clone for Consumer<T, CAPACITY> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<T, const CAPACITY: usize> std::fmt::Debug for Consumer<T, CAPACITY> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer").field("queue", &self.queue).finish()
    }
}
