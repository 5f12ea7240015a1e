//! # Work Hand-Off Queue
//!
//! Bounded single-producer / multi-consumer ring for handing work items from
//! one thread to many.
//!
//! ## Design Philosophy
//!
//! All slots are allocated once at construction. During a frame:
//! - No heap allocations
//! - No locks
//! - A full ring is a normal answer (`QueueFull`), not an error condition
//!
//! ## Contract
//!
//! ```text
//!   push   one producer, never blocks, hands the value back when full
//!   pop    any number of consumers, spins until an item or eviction
//!   evict  one-way; releases spinning consumers with None
//! ```

mod ring;
mod slot;

pub use ring::{bounded, BoundedRingQueue, Consumer, Producer};
