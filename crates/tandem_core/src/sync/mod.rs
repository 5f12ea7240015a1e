//! # Synchronization Primitives for Fork-Join Dispatch
//!
//! ARCHITECT'S ORDER: No locks on the hot path. No lost wake-ups. No overlap.
//!
//! ## The Problem
//!
//! ```text
//! Dispatch N:    publish task ──> N slices run ──> everyone done?
//! Dispatch N+1:  publish task ──> ...
//!
//! Publish N+1 while a worker still waits on N:  WORKER MISSES THE EXIT → HANG
//! Return from N before every slice finished:    CALLER READS HALF A FRAME
//! ```
//!
//! ## The Solution: Two Rendezvous Points
//!
//! ```text
//!   ArrivalGate (entry)   every worker back to idle   → safe to publish
//!   CountingLatch (exit)  every slice counted down    → safe to return
//! ```
//!
//! Both poll atomics through a [`Waiter`], whose [`WaitStrategy`] decides
//! whether waiting threads spin, yield or park.

mod gate;
mod latch;
mod wait;

pub use gate::ArrivalGate;
pub use latch::CountingLatch;
pub use wait::{WaitStrategy, Waiter, DEFAULT_SPIN_LIMIT};
