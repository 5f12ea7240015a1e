//! # Fork-Join Scheduler
//!
//! One task, `N` slices, two barriers. Built for the per-frame pattern:
//!
//! ```text
//! Frame:  [ integrate 0..N in parallel ] → [ read results ] → [ next frame ]
//!                     ▲ run() returns only here
//! ```
//!
//! ## Performance Contract
//!
//! - No allocation per dispatch (the task is borrowed, not boxed)
//! - No locks per dispatch unless [`WaitStrategy::Block`] is configured
//! - Failed slices are reported after the exit barrier, never mid-frame
//!
//! [`WaitStrategy::Block`]: crate::sync::WaitStrategy::Block

mod barrier;
mod outcome;
mod partition;
mod task;

pub use barrier::BarrierScheduler;
pub use partition::partition;
