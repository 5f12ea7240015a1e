//! Integration tests for the barrier scheduler.

#![cfg(not(loom))]

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tandem_core::{BarrierScheduler, ParallelError, SchedulerConfig, WaitStrategy};
use tandem_profiler::Profiler;

fn scheduler(threads: usize, strategy: WaitStrategy) -> BarrierScheduler {
    BarrierScheduler::with_config(&SchedulerConfig::with_threads(threads).wait_strategy(strategy))
        .unwrap()
}

#[test]
fn test_scenario_b_results_by_index() {
    let mut pool = scheduler(4, WaitStrategy::Spin);
    let results: Vec<AtomicUsize> = (0..4).map(|_| AtomicUsize::new(usize::MAX)).collect();

    pool.run(|worker| results[worker].store(worker, Ordering::Relaxed))
        .unwrap();

    let results: Vec<usize> = results.iter().map(|r| r.load(Ordering::Relaxed)).collect();
    assert_eq!(results, vec![0, 1, 2, 3]);
}

#[test]
fn test_every_index_exactly_once_all_strategies() {
    for strategy in [WaitStrategy::Spin, WaitStrategy::Yield, WaitStrategy::Block] {
        let mut pool = scheduler(4, strategy);
        let hits: Vec<AtomicUsize> = (0..4).map(|_| AtomicUsize::new(0)).collect();

        for _ in 0..200 {
            pool.run(|worker| {
                hits[worker].fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        }

        for (worker, hit) in hits.iter().enumerate() {
            assert_eq!(hit.load(Ordering::Relaxed), 200, "{strategy:?} worker {worker}");
        }
        assert_eq!(pool.wait_strategy(), strategy);
    }
}

#[test]
fn test_sequential_runs_never_overlap() {
    const DISPATCHES: usize = 50;
    let mut pool = scheduler(4, WaitStrategy::Yield);
    let mut rng = StdRng::seed_from_u64(7);
    let spans: Mutex<Vec<(usize, Instant, Instant)>> = Mutex::new(Vec::new());

    for dispatch in 0..DISPATCHES {
        let work: Vec<u64> = (0..pool.size()).map(|_| rng.gen_range(0..2_000)).collect();
        pool.run(|worker| {
            let start = Instant::now();
            let mut acc = 0u64;
            for i in 0..work[worker] {
                acc = acc.wrapping_mul(31).wrapping_add(i);
            }
            std::hint::black_box(acc);
            spans.lock().push((dispatch, start, Instant::now()));
        })
        .unwrap();
    }

    let spans = spans.into_inner();
    assert_eq!(spans.len(), DISPATCHES * 4);

    for dispatch in 1..DISPATCHES {
        let previous_end = spans
            .iter()
            .filter(|(d, _, _)| *d == dispatch - 1)
            .map(|(_, _, end)| *end)
            .max()
            .unwrap();
        let next_start = spans
            .iter()
            .filter(|(d, _, _)| *d == dispatch)
            .map(|(_, start, _)| *start)
            .min()
            .unwrap();
        assert!(previous_end <= next_start, "dispatch {dispatch} overlapped");
    }
}

#[test]
fn test_run_waits_for_slowest_slice() {
    let mut pool = scheduler(3, WaitStrategy::Block);
    let done = AtomicUsize::new(0);

    pool.run(|worker| {
        if worker == 2 {
            std::thread::sleep(std::time::Duration::from_millis(30));
        }
        done.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();

    assert_eq!(done.load(Ordering::Relaxed), 3);
}

#[test]
fn test_panics_reported_and_pool_survives() {
    let mut pool = scheduler(4, WaitStrategy::Yield);

    let err = pool
        .run(|worker| {
            if worker >= 2 {
                panic!("worker {worker} failed");
            }
        })
        .unwrap_err();

    assert_eq!(err.failed_worker(), Some(2));
    assert!(matches!(
        err,
        ParallelError::WorkerPanicked { failed: 2, total: 4, .. }
    ));

    let ran = AtomicUsize::new(0);
    pool.run(|_| {
        ran.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();
    assert_eq!(ran.load(Ordering::Relaxed), 4);
    assert_eq!(pool.dispatch_count(), 2);
}

#[derive(Debug, thiserror::Error)]
#[error("out of range: {0}")]
struct OutOfRange(usize);

#[test]
fn test_try_run_surfaces_errors() {
    let mut pool = scheduler(4, WaitStrategy::Block);

    let err = pool
        .try_run(|worker| if worker == 3 { Err(OutOfRange(worker)) } else { Ok(()) })
        .unwrap_err();

    assert_eq!(err.failed_worker(), Some(3));
    assert!(err.to_string().contains("out of range: 3"));
}

#[test]
fn test_single_worker_pool() {
    let mut pool = scheduler(1, WaitStrategy::Spin);
    let hits = AtomicUsize::new(0);

    for _ in 0..10 {
        pool.run(|worker| {
            assert_eq!(worker, 0);
            hits.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    }
    assert_eq!(hits.load(Ordering::Relaxed), 10);
}

#[test]
fn test_partitioned_particle_update() {
    let mut pool = scheduler(4, WaitStrategy::Yield);
    let mut positions: Vec<f32> = (0..1_003).map(|i| i as f32).collect();
    let velocity = 0.5_f32;

    for _ in 0..4 {
        pool.run_partitioned(&mut positions, |_, part| {
            for position in part {
                *position += velocity;
            }
        })
        .unwrap();
    }

    for (i, position) in positions.iter().enumerate() {
        assert!((position - (i as f32 + 2.0)).abs() < f32::EPSILON * 4096.0);
    }
}

#[test]
fn test_dispatches_profiled() {
    let mut pool = scheduler(2, WaitStrategy::Yield);
    let mut profiler = Profiler::with_capacity(32);

    for _ in 0..32 {
        profiler.start();
        pool.run(|_| {}).unwrap();
        profiler.end().unwrap();
    }

    let profile = profiler.flush().unwrap();
    assert!(profile.lowest <= profile.median);
    assert!(profile.median <= profile.highest);
    println!("dispatch: {profile}");
}

#[test]
fn test_config_file_drives_pool() {
    let config = SchedulerConfig::from_toml_str(
        r#"
        threads = 3
        wait_strategy = "block"
        thread_name = "frame"
        "#,
    )
    .unwrap();

    let pool = BarrierScheduler::with_config(&config).unwrap();
    assert_eq!(pool.size(), 3);
    assert_eq!(pool.wait_strategy(), WaitStrategy::Block);
}
