//! # Barrier Scheduler
//!
//! A fixed pool of persistent workers that fans one task out across every
//! participant and joins before returning.
//!
//! ## Safety Note
//!
//! The task closure is handed to workers by erased reference (see `task.rs`).
//! The unsafe blocks here are the calls into that hand-off; each one states
//! which barrier makes it valid.
//!
//! ## Dispatch Protocol
//!
//! ```text
//!   caller (worker 0)                     workers 1..N
//!   ─────────────────                     ────────────
//!   wait: idle gate full     (entry)      poll: latch armed || exit
//!   install task
//!   reset idle gate
//!   arm latch = N  ─────── release ─────> acquire: latch > 0
//!   run slice 0                           run slice i
//!   count down, wait for 0   (exit)       count down, wait for 0
//!   arrive at idle gate                   arrive at idle gate
//!   collect outcomes, return              back to polling
//! ```
//!
//! ## Worker States
//!
//! `Idle → Executing → Retiring (exit wait) → Idle`, until `exit` is seen.

#![allow(unsafe_code)]

use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_utils::CachePadded;

use super::outcome::{Outcomes, SliceFailure};
use super::partition::{partition, SharedSlice};
use super::task::{TaskHandoff, TaskRef};
use crate::config::SchedulerConfig;
use crate::error::{ParallelError, ParallelResult};
use crate::sync::{ArrivalGate, CountingLatch, WaitStrategy, Waiter};

/// State shared by the dispatcher and every worker thread.
struct Shared {
    /// Number of participants, the dispatcher included.
    threads: usize,
    /// Destruction signal.
    exit: CachePadded<AtomicBool>,
    /// Exit barrier: slices not yet finished in the current dispatch.
    remaining: CountingLatch,
    /// Entry barrier: participants back to idle.
    idle: ArrivalGate,
    waiter: Waiter,
    task: TaskHandoff,
    outcomes: Outcomes,
}

impl Shared {
    fn new(threads: usize, config: &SchedulerConfig) -> Self {
        Self {
            threads,
            exit: CachePadded::new(AtomicBool::new(false)),
            remaining: CountingLatch::new(),
            idle: ArrivalGate::new(threads),
            waiter: Waiter::new(config.wait_strategy, config.spin_limit),
            task: TaskHandoff::new(),
            outcomes: Outcomes::new(threads),
        }
    }

    /// Runs one dispatch from the owning thread.
    fn dispatch<F>(&self, task: &F) -> ParallelResult<()>
    where
        F: Fn(usize) + Sync,
    {
        // Entry barrier: nobody may still be waiting on the previous latch.
        self.idle.wait_full(&self.waiter);

        // SAFETY: gate full, latch not armed; no worker reads the hand-off.
        unsafe { self.task.install(TaskRef::new(task)) };

        // Relaxed: nothing reads the gate until this dispatch's exit barrier.
        self.idle.reset();

        // Release: publishes the task to every worker that sees the count.
        self.remaining.arm(self.threads);
        self.waiter.notify();
        tracing::trace!(threads = self.threads, "dispatch published");

        self.execute_slice(0);

        // SAFETY: our own slice passed the exit barrier, so every worker has
        // counted down and no longer reads the hand-off.
        unsafe { self.task.clear() };

        self.outcomes.collect()
    }

    /// Executes this worker's slice and takes part in both barriers.
    fn execute_slice(&self, worker: usize) {
        // SAFETY: the latch is armed (we observed it, or armed it ourselves)
        // and we have not counted down yet.
        match unsafe { self.task.current() } {
            Some(task) => {
                tracing::trace!(worker, "slice started");
                // SAFETY: the closure outlives the dispatch window we are in.
                let result =
                    panic::catch_unwind(AssertUnwindSafe(|| unsafe { task.invoke(worker) }));
                if let Err(payload) = result {
                    self.outcomes
                        .record(worker, SliceFailure::from_panic(payload.as_ref()));
                }
                tracing::trace!(worker, "slice finished");
            }
            None => {
                // Armed latch without a task: the slice cannot run, but the
                // barriers must still be honoured.
                tracing::error!(worker, "dispatch armed without a published task");
                self.outcomes.record(worker, SliceFailure::Skipped);
            }
        }

        // Exit barrier. The final arrival leaves without spinning.
        self.remaining.arrive_and_wait(&self.waiter);

        // Relaxed: the next dispatch's entry wait does the synchronizing load.
        if self.idle.arrive() {
            self.waiter.notify();
        }
    }
}

fn worker_loop(shared: &Shared, worker: usize) {
    tracing::debug!(worker, "worker started");

    loop {
        shared
            .waiter
            .wait_until(|| shared.exit.load(Ordering::Relaxed) || shared.remaining.pending() > 0);

        if shared.exit.load(Ordering::Relaxed) {
            break;
        }

        shared.execute_slice(worker);
    }

    tracing::debug!(worker, "worker exiting");
}

/// Fixed-size fork-join pool for per-frame data-parallel work.
///
/// The calling thread is worker 0; `size() - 1` persistent threads are the
/// rest. Every [`run`](Self::run) invokes the task once per worker index and
/// returns only after all invocations finished.
///
/// ## Task Lifetime Contract
///
/// The task is borrowed, not boxed. It is published after the previous
/// dispatch has fully retired (entry barrier) and no worker touches it after
/// the current dispatch completes (exit barrier). `run` taking `&mut self`
/// guarantees there is never more than one dispatch in flight.
///
/// ## Usage
///
/// ```rust
/// use tandem_core::BarrierScheduler;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let mut scheduler = BarrierScheduler::with_threads(4)?;
/// let results: Vec<AtomicUsize> = (0..4).map(|_| AtomicUsize::new(0)).collect();
///
/// scheduler.run(|worker| results[worker].store(worker, Ordering::Relaxed))?;
///
/// let results: Vec<usize> = results.iter().map(|r| r.load(Ordering::Relaxed)).collect();
/// assert_eq!(results, [0, 1, 2, 3]);
/// # Ok::<(), tandem_core::ParallelError>(())
/// ```
pub struct BarrierScheduler {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    dispatches: u64,
}

impl BarrierScheduler {
    /// Creates a spinning pool sized to hardware concurrency.
    ///
    /// # Errors
    ///
    /// Returns [`ParallelError::ThreadSpawn`] if a worker cannot be created.
    pub fn new() -> ParallelResult<Self> {
        Self::with_config(&SchedulerConfig::default())
    }

    /// Creates a spinning pool with `threads` participants.
    ///
    /// # Errors
    ///
    /// Returns [`ParallelError::InvalidThreadCount`] for zero and
    /// [`ParallelError::ThreadSpawn`] if a worker cannot be created.
    pub fn with_threads(threads: usize) -> ParallelResult<Self> {
        Self::with_config(&SchedulerConfig::with_threads(threads))
    }

    /// Creates a pool from a configuration.
    ///
    /// Workers that were already spawned when a later spawn fails are shut
    /// down and joined before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ParallelError::InvalidThreadCount`],
    /// [`ParallelError::InvalidConfig`] or [`ParallelError::ThreadSpawn`].
    pub fn with_config(config: &SchedulerConfig) -> ParallelResult<Self> {
        let threads = config.resolved_threads()?;
        config.validate()?;

        let shared = Arc::new(Shared::new(threads, config));

        // Built before spawning so an early return drops (and joins) it.
        let mut scheduler = Self {
            shared,
            workers: Vec::with_capacity(threads - 1),
            dispatches: 0,
        };

        for worker in 1..threads {
            let shared = Arc::clone(&scheduler.shared);
            let handle = thread::Builder::new()
                .name(format!("{}-{worker}", config.thread_name))
                .spawn(move || worker_loop(&shared, worker))
                .map_err(|source| ParallelError::ThreadSpawn { worker, source })?;
            scheduler.workers.push(handle);
        }

        tracing::debug!(
            threads,
            strategy = ?config.wait_strategy,
            "barrier scheduler started"
        );

        Ok(scheduler)
    }

    /// Returns the number of participants (the caller included).
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.shared.threads
    }

    /// Returns the configured wait strategy.
    #[inline]
    #[must_use]
    pub fn wait_strategy(&self) -> WaitStrategy {
        self.shared.waiter.strategy()
    }

    /// Returns how many dispatches have completed.
    #[inline]
    #[must_use]
    pub fn dispatch_count(&self) -> u64 {
        self.dispatches
    }

    /// Runs `task(i)` once for every `i` in `0..size()` and waits for all.
    ///
    /// Slice 0 runs on the calling thread. A panicking slice is caught, still
    /// takes part in the exit barrier, and is reported once every slice is
    /// done.
    ///
    /// # Errors
    ///
    /// Returns [`ParallelError::WorkerPanicked`] naming the lowest worker
    /// index whose slice panicked.
    pub fn run<F>(&mut self, task: F) -> ParallelResult<()>
    where
        F: Fn(usize) + Sync,
    {
        let result = self.shared.dispatch(&task);
        self.finish(result)
    }

    /// Like [`run`](Self::run) for slices that can fail.
    ///
    /// # Errors
    ///
    /// Returns [`ParallelError::TaskFailed`] for the lowest worker index whose
    /// slice returned an error, or [`ParallelError::WorkerPanicked`] if that
    /// slice panicked instead.
    pub fn try_run<F, E>(&mut self, task: F) -> ParallelResult<()>
    where
        F: Fn(usize) -> Result<(), E> + Sync,
        E: StdError + Send + Sync + 'static,
    {
        let shared = &*self.shared;
        let result = shared.dispatch(&|worker| {
            if let Err(error) = task(worker) {
                shared
                    .outcomes
                    .record(worker, SliceFailure::Failed(Box::new(error)));
            }
        });
        self.finish(result)
    }

    /// Splits `data` into `size()` contiguous parts and runs
    /// `task(worker, part)` on each in parallel.
    ///
    /// Parts differ in length by at most one item; see [`partition`].
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn run_partitioned<T, F>(&mut self, data: &mut [T], task: F) -> ParallelResult<()>
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync,
    {
        let parts = self.size();
        let shared_data = SharedSlice::new(data);

        self.run(|worker| {
            let range = partition(shared_data.len(), parts, worker);
            // SAFETY: partition ranges are disjoint and each worker index runs
            // exactly once per dispatch.
            let part = unsafe { shared_data.slice_mut(range) };
            task(worker, part);
        })
    }

    fn finish(&mut self, result: ParallelResult<()>) -> ParallelResult<()> {
        self.dispatches += 1;
        if let Err(error) = &result {
            tracing::warn!(
                dispatch = self.dispatches,
                %error,
                "dispatch reported failed workers"
            );
        }
        result
    }
}

impl Drop for BarrierScheduler {
    fn drop(&mut self) {
        // Relaxed: join() synchronizes. notify() wakes parked workers.
        self.shared.exit.store(true, Ordering::Relaxed);
        self.shared.waiter.notify();

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("worker thread terminated by a panic");
            }
        }

        tracing::debug!(
            threads = self.shared.threads,
            dispatches = self.dispatches,
            "barrier scheduler stopped"
        );
    }
}

impl std::fmt::Debug for BarrierScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarrierScheduler")
            .field("threads", &self.shared.threads)
            .field("wait_strategy", &self.wait_strategy())
            .field("dispatches", &self.dispatches)
            .finish_non_exhaustive()
    }
}
