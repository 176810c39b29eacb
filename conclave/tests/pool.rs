mod common;

use conclave::channel::Mailbox;
use conclave::error::{SubmitError, TaskError};
use conclave::pool::{Job, PoolBuilder, WorkerPool};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

#[test]
fn test_result_is_computed_once() {
    common::init_tracing();

    let pool = PoolBuilder::new().workers(2).build().unwrap();
    let runs = Arc::new(AtomicUsize::new(0));

    let future = {
        let runs = runs.clone();
        pool.submit(move || {
            runs.fetch_add(1, Ordering::SeqCst);
            vec![1, 2, 3]
        })
        .unwrap()
    };

    let first = future.result().unwrap();
    let second = future.result().unwrap();

    assert!(ptr::eq(first, second));
    assert_eq!(first, &vec![1, 2, 3]);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(future.is_done());
}

#[test]
fn test_panicking_task_does_not_affect_pool() {
    common::init_tracing();

    let pool = PoolBuilder::new().workers(1).build().unwrap();

    let failed = pool.submit(|| -> u32 { panic!("division by zero") }).unwrap();
    let ok = pool.submit(|| 1 + 1).unwrap();

    match failed.result() {
        Err(TaskError::Panicked(msg)) => assert!(msg.contains("division by zero")),
        other => panic!("unexpected outcome: {other:?}"),
    }

    assert_eq!(ok.result(), Ok(&2));
}

#[test]
fn test_fallible_task_error_is_captured() {
    let pool = PoolBuilder::new().workers(1).build().unwrap();

    let future = pool
        .submit_fallible(|| "x1".parse::<u32>())
        .unwrap();

    assert!(matches!(future.result(), Err(TaskError::Failed(_))));
}

#[test]
fn test_map_preserves_input_order() {
    let pool = PoolBuilder::new().workers(4).build().unwrap();

    let futures = pool
        .map(0..20u64, |n| {
            // Later items finish first.
            thread::sleep(Duration::from_millis(20 - n));
            n * n
        })
        .unwrap();

    let squares: Vec<_> = futures.iter().map(|f| *f.result().unwrap()).collect();

    assert_eq!(squares, (0..20u64).map(|n| n * n).collect::<Vec<_>>());
}

#[test]
fn test_try_submit_on_full_queue() {
    let pool = PoolBuilder::new().workers(1).capacity(1).build().unwrap();

    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let blocker = pool
        .submit(move || {
            started_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        })
        .unwrap();

    started_rx.recv().unwrap();

    let queued = pool.try_submit(|| 1).unwrap();
    assert_eq!(pool.pending(), 1);
    assert!(matches!(pool.try_submit(|| 2), Err(SubmitError::Full)));

    release_tx.send(()).unwrap();

    assert_eq!(blocker.result(), Ok(&()));
    assert_eq!(queued.result(), Ok(&1));
}

#[test]
fn test_submit_after_shutdown_fails() {
    let pool = PoolBuilder::new().workers(1).build().unwrap();

    pool.shutdown();

    assert!(matches!(pool.submit(|| ()), Err(SubmitError::Closed)));
}

#[test]
fn test_drop_drains_queued_tasks() {
    let done = Arc::new(AtomicUsize::new(0));

    {
        let pool = PoolBuilder::new().workers(2).build().unwrap();

        for _ in 0..50 {
            let done = done.clone();
            pool.submit(move || {
                thread::sleep(Duration::from_millis(1));
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
    }

    assert_eq!(done.load(Ordering::SeqCst), 50);
}

#[test]
fn test_wait_idle() {
    let pool = PoolBuilder::new().workers(3).build().unwrap();
    let done = Arc::new(AtomicUsize::new(0));

    for _ in 0..30 {
        let done = done.clone();
        pool.submit(move || {
            done.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    pool.wait_idle();
    assert_eq!(done.load(Ordering::SeqCst), 30);
}

#[test]
fn test_done_callbacks() {
    let pool = PoolBuilder::new().workers(1).build().unwrap();
    let (tx, rx) = mpsc::channel();

    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    let future = pool
        .submit(move || {
            gate_rx.recv().unwrap();
            7
        })
        .unwrap();

    let before = tx.clone();
    future.add_done_callback(move |outcome| {
        before.send(("before", outcome.clone())).unwrap();
    });

    gate_tx.send(()).unwrap();
    assert_eq!(future.result(), Ok(&7));

    future.add_done_callback(move |outcome| {
        tx.send(("after", outcome.clone())).unwrap();
    });

    let mut calls: Vec<_> = rx.iter().take(2).collect();
    calls.sort_by_key(|(when, _)| *when);

    assert_eq!(calls, vec![("after", Ok(7)), ("before", Ok(7))]);
}

#[test]
fn test_result_timeout() {
    let pool = PoolBuilder::new().workers(1).build().unwrap();
    let (gate_tx, gate_rx) = mpsc::channel::<()>();

    let future = pool.submit(move || gate_rx.recv().is_ok()).unwrap();

    assert_eq!(future.result_timeout(Duration::from_millis(20)), None);

    gate_tx.send(()).unwrap();
    assert_eq!(future.result_timeout(Duration::from_secs(5)), Some(Ok(&true)));
}

fn failing_job() {
    panic!("raw job failed");
}

#[test]
fn test_pool_is_a_mailbox_for_raw_jobs() {
    let mut pool = WorkerPool::builder().workers(2).build().unwrap();
    let done = Arc::new(AtomicUsize::new(0));

    for _ in 0..10 {
        let done = done.clone();
        let job: Job = Box::new(move || {
            done.fetch_add(1, Ordering::SeqCst);
        });

        pool.send(job)
            .unwrap_or_else(|_| panic!("pool rejected job"));
    }

    // A panicking raw job only costs its own work.
    let job: Job = Box::new(failing_job);
    pool.send(job)
        .unwrap_or_else(|_| panic!("pool rejected job"));

    pool.shutdown();
    pool.join();

    assert_eq!(done.load(Ordering::SeqCst), 10);
}

#[test]
fn test_builder_configuration() {
    let pool = WorkerPool::builder()
        .workers(3)
        .thread_name("custom")
        .build()
        .unwrap();

    let name = pool
        .submit(|| thread::current().name().map(str::to_string))
        .unwrap();

    assert_eq!(pool.workers(), 3);
    assert!(name.result().unwrap().as_deref().unwrap().starts_with("custom-"));
}

#[test]
#[should_panic(expected = "workers must be > 0")]
fn test_zero_workers_panics() {
    let _ = PoolBuilder::new().workers(0);
}
