//! Per-worker slice outcomes, collected after the exit barrier.

use std::any::Any;
use std::error::Error as StdError;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

use crate::error::{ParallelError, ParallelResult};

/// Why a slice did not complete normally.
pub(super) enum SliceFailure {
    Panicked(String),
    Failed(Box<dyn StdError + Send + Sync>),
    /// The worker found no task to run.
    Skipped,
}

impl SliceFailure {
    pub(super) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_owned()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            String::from("non-string panic payload")
        };
        Self::Panicked(message)
    }
}

/// One slot per worker. A slot is only written by its own worker during a
/// dispatch and only read by the dispatcher after the exit latch opened, so
/// the locks are never contended.
pub(super) struct Outcomes {
    slots: Box<[CachePadded<Mutex<Option<SliceFailure>>>]>,
    failed: AtomicUsize,
}

impl Outcomes {
    pub(super) fn new(workers: usize) -> Self {
        let slots: Vec<_> = (0..workers)
            .map(|_| CachePadded::new(Mutex::new(None)))
            .collect();
        Self {
            slots: slots.into_boxed_slice(),
            failed: AtomicUsize::new(0),
        }
    }

    /// Records a failure for `worker`. A panic replaces an earlier error.
    pub(super) fn record(&self, worker: usize, failure: SliceFailure) {
        let mut slot = self.slots[worker].lock();
        let replace = match slot.as_ref() {
            None => {
                // Relaxed: published by the worker's latch count-down.
                self.failed.fetch_add(1, Ordering::Relaxed);
                true
            }
            Some(SliceFailure::Failed(_)) => matches!(failure, SliceFailure::Panicked(_)),
            Some(SliceFailure::Panicked(_) | SliceFailure::Skipped) => false,
        };
        if replace {
            *slot = Some(failure);
        }
    }

    /// Drains every slot and reports the lowest failing worker.
    ///
    /// Must only be called after the exit latch opened.
    pub(super) fn collect(&self) -> ParallelResult<()> {
        let failed = self.failed.swap(0, Ordering::Relaxed);
        if failed == 0 {
            return Ok(());
        }

        let total = self.slots.len();
        let mut first = None;
        for (worker, slot) in self.slots.iter().enumerate() {
            if let Some(failure) = slot.lock().take() {
                first.get_or_insert((worker, failure));
            }
        }

        match first {
            Some((worker, SliceFailure::Panicked(message))) => Err(ParallelError::WorkerPanicked {
                worker,
                message,
                failed,
                total,
            }),
            Some((worker, SliceFailure::Failed(source))) => Err(ParallelError::TaskFailed {
                worker,
                source,
                failed,
                total,
            }),
            Some((worker, SliceFailure::Skipped)) => Err(ParallelError::SliceSkipped {
                worker,
                failed,
                total,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("bad slice")]
    struct BadSlice;

    #[test]
    fn test_no_failures() {
        let outcomes = Outcomes::new(4);
        assert!(outcomes.collect().is_ok());
    }

    #[test]
    fn test_lowest_worker_reported() {
        let outcomes = Outcomes::new(4);
        outcomes.record(3, SliceFailure::Panicked("late".into()));
        outcomes.record(1, SliceFailure::Failed(Box::new(BadSlice)));

        match outcomes.collect() {
            Err(ParallelError::TaskFailed {
                worker,
                failed,
                total,
                ..
            }) => {
                assert_eq!(worker, 1);
                assert_eq!(failed, 2);
                assert_eq!(total, 4);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        // Drained: the next dispatch starts clean.
        assert!(outcomes.collect().is_ok());
    }

    #[test]
    fn test_panic_wins_over_error() {
        let outcomes = Outcomes::new(2);
        outcomes.record(0, SliceFailure::Failed(Box::new(BadSlice)));
        outcomes.record(0, SliceFailure::Panicked("boom".into()));

        let err = outcomes.collect().unwrap_err();
        assert!(matches!(
            err,
            ParallelError::WorkerPanicked { worker: 0, failed: 1, .. }
        ));
    }

    #[test]
    fn test_panic_payload_rendering() {
        let text: Box<dyn Any + Send> = Box::new("static message");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        let other: Box<dyn Any + Send> = Box::new(42u32);

        for (payload, expected) in [
            (text, "static message"),
            (owned, "owned message"),
            (other, "non-string panic payload"),
        ] {
            match SliceFailure::from_panic(payload.as_ref()) {
                SliceFailure::Panicked(message) => assert_eq!(message, expected),
                SliceFailure::Failed(_) | SliceFailure::Skipped => {
                    panic!("expected a panic outcome")
                }
            }
        }
    }
}
