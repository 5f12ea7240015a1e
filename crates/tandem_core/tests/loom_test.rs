//! Model-checked interleavings of the ring queue and the dispatch barriers.
//!
//! Run with `RUSTFLAGS="--cfg loom" cargo test --release --test loom_test`.

#![cfg(loom)]

use loom::cell::UnsafeCell;
use loom::sync::Arc;
use loom::thread;
use tandem_core::{bounded, ArrivalGate, CountingLatch, QueueFull, WaitStrategy, Waiter};

#[test]
fn loom_one_producer_two_consumers() {
    loom::model(|| {
        let (mut producer, consumer) = bounded::<u32, 2>();

        let consumers: Vec<_> = (0..2)
            .map(|_| {
                let consumer = consumer.clone();
                thread::spawn(move || consumer.pop())
            })
            .collect();

        producer.push(10).unwrap();
        producer.push(20).unwrap();

        let mut popped: Vec<u32> = consumers
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect();
        popped.sort_unstable();
        assert_eq!(popped, vec![10, 20]);
    });
}

#[test]
fn loom_wraparound_lap() {
    let mut builder = loom::model::Builder::new();
    builder.preemption_bound = Some(3);

    builder.check(|| {
        let (mut producer, consumer) = bounded::<u32, 2>();

        let second = {
            let consumer = consumer.clone();
            thread::spawn(move || consumer.pop())
        };

        for mut value in [1, 2, 3] {
            while let Err(QueueFull(rejected)) = producer.push(value) {
                value = rejected;
                // The spawned consumer frees slot 0 for the third value.
                thread::yield_now();
            }
        }

        let mut popped = vec![second.join().unwrap().unwrap()];
        popped.push(consumer.pop().unwrap());
        popped.push(consumer.pop().unwrap());
        popped.sort_unstable();
        assert_eq!(popped, vec![1, 2, 3]);
    });
}

/// Stand-in for the scheduler's task hand-off cell.
struct Handoff(UnsafeCell<usize>);

// SAFETY: access is ordered by the latch and the gate under test.
unsafe impl Sync for Handoff {}

#[test]
fn loom_barrier_round_publishes_task() {
    loom::model(|| {
        let latch = Arc::new(CountingLatch::new());
        let gate = Arc::new(ArrivalGate::new(2));
        let waiter = Arc::new(Waiter::new(WaitStrategy::Spin, 0));
        let task = Arc::new(Handoff(UnsafeCell::new(0)));

        let worker = {
            let latch = Arc::clone(&latch);
            let gate = Arc::clone(&gate);
            let waiter = Arc::clone(&waiter);
            let task = Arc::clone(&task);
            thread::spawn(move || {
                waiter.wait_until(|| latch.pending() > 0);
                let seen = task.0.with(|value| unsafe { *value });
                assert_eq!(seen, 42);
                latch.arrive_and_wait(&waiter);
                gate.arrive();
            })
        };

        // Install, reset, arm: the publication half of a dispatch.
        gate.wait_full(&waiter);
        task.0.with_mut(|value| unsafe { *value = 42 });
        gate.reset();
        latch.arm(2);

        latch.arrive_and_wait(&waiter);
        gate.arrive();

        // Entry barrier of the next dispatch: the worker is done reading.
        gate.wait_full(&waiter);
        task.0.with_mut(|value| unsafe { *value = 7 });

        worker.join().unwrap();
    });
}
