//! # TANDEM Core
//!
//! Two building blocks for frame-driven parallel work:
//! - A bounded single-producer / multi-consumer ring queue for handing
//!   items from one thread to many
//! - A barrier-synchronized fork-join scheduler that runs one task on every
//!   worker and returns when all of them finished
//!
//! ## Architecture Rules
//!
//! 1. **Pre-allocate everything** - Slots and workers exist before the first frame
//! 2. **Never overlap dispatches** - One in flight, enforced by `&mut self`
//! 3. **Report, don't hang** - A panicking slice still reaches the exit barrier
//!
//! ## Example
//!
//! ```rust
//! use tandem_core::{bounded, BarrierScheduler};
//!
//! let (mut producer, consumer) = bounded::<u32, 8>();
//! producer.push(7).unwrap();
//! assert_eq!(consumer.pop(), Some(7));
//!
//! let mut scheduler = BarrierScheduler::with_threads(2)?;
//! scheduler.run(|worker| assert!(worker < 2))?;
//! # Ok::<(), tandem_core::ParallelError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
mod primitives;
pub mod queue;
pub mod scheduler;
pub mod sync;

pub use config::{hardware_concurrency, SchedulerConfig, THREADS_ENV_VAR};
pub use error::{ParallelError, ParallelResult, QueueFull};
pub use queue::{bounded, BoundedRingQueue, Consumer, Producer};
pub use scheduler::{partition, BarrierScheduler};
pub use sync::{ArrivalGate, CountingLatch, WaitStrategy, Waiter};
