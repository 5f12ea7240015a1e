//! Atomics and spin hints used by the lock-free paths.
//!
//! Built with `--cfg loom`, these resolve to loom's model-checked versions so
//! `tests/loom_test.rs` can explore every interleaving of the ring and the
//! barriers. Otherwise they are the std types.

#[cfg(loom)]
pub(crate) use ::loom::{
    hint,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread::yield_now,
};

#[cfg(not(loom))]
pub(crate) use std::{
    hint,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread::yield_now,
};
