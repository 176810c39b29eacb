mod common;

use conclave::actor::{Actor, ActorBuilder, ActorState, Context, Worker};
use conclave::error::{ActorError, SendError, StartError, TaskError};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Records every message it receives.
struct Recorder {
    seen: Arc<Mutex<Vec<u32>>>,
}

impl Actor for Recorder {
    type Message = u32;

    fn run(&mut self, cx: &mut Context<u32>) -> Result<(), ActorError> {
        loop {
            let msg = cx.receive()?;
            self.seen.lock().push(msg);
        }
    }
}

fn recorder(name: &str) -> (conclave::ActorRef<u32>, Arc<Mutex<Vec<u32>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let actor = ActorBuilder::new(name).build(Recorder { seen: seen.clone() });

    (actor, seen)
}

#[test]
fn test_messages_are_processed_in_order() {
    common::init_tracing();

    let (actor, seen) = recorder("recorder");

    // Sending before start queues the messages.
    for i in 0..50 {
        actor.send(i).unwrap();
    }

    assert_eq!(actor.state(), ActorState::Created);
    actor.start().unwrap();

    for i in 50..100 {
        actor.send(i).unwrap();
    }

    actor.close();
    actor.join();

    assert_eq!(*seen.lock(), (0..100).collect::<Vec<_>>());
    assert_eq!(actor.state(), ActorState::Terminated);
    assert_eq!(actor.failure(), None);
}

#[test]
fn test_join_wakes_every_joiner() {
    let (actor, _) = recorder("joined");
    actor.start().unwrap();

    let joiners: Vec<_> = (0..4)
        .map(|_| {
            let actor = actor.clone();
            thread::spawn(move || actor.join())
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    actor.close();

    for joiner in joiners {
        joiner.join().unwrap();
    }

    // Joining a terminated actor returns at once.
    assert!(actor.join_timeout(Duration::from_millis(1)));
}

#[test]
fn test_join_timeout_while_running() {
    let (actor, _) = recorder("busy");
    actor.start().unwrap();

    assert!(!actor.join_timeout(Duration::from_millis(20)));
    assert_eq!(actor.state(), ActorState::Running);

    actor.close();
    actor.join();
}

#[test]
fn test_start_twice_fails() {
    let (actor, _) = recorder("twice");
    actor.start().unwrap();

    assert!(matches!(
        actor.start(),
        Err(StartError::AlreadyStarted(name)) if name == "twice"
    ));

    actor.close();
    actor.join();
}

#[test]
fn test_send_after_termination_fails() {
    let (actor, _) = recorder("done");
    actor.start().unwrap();
    actor.close();
    actor.join();

    assert!(matches!(actor.send(1), Err(SendError::Closed(1))));
}

struct Failing;

impl Actor for Failing {
    type Message = ();

    fn run(&mut self, cx: &mut Context<()>) -> Result<(), ActorError> {
        cx.receive()?;
        Err(ActorError::failed(io::Error::other("disk on fire")))
    }
}

#[test]
fn test_failure_is_recorded_not_propagated() {
    common::init_tracing();

    let actor = ActorBuilder::new("failing").spawn(Failing).unwrap();
    actor.send(()).unwrap();
    actor.join();

    assert_eq!(actor.state(), ActorState::Terminated);
    assert!(actor.failure().unwrap().contains("disk on fire"));
}

struct Panicking;

impl Actor for Panicking {
    type Message = ();

    fn run(&mut self, _: &mut Context<()>) -> Result<(), ActorError> {
        panic!("actor exploded");
    }
}

#[test]
fn test_panic_is_recorded() {
    common::init_tracing();

    let actor = ActorBuilder::new("panicking").spawn(Panicking).unwrap();
    actor.join();

    assert!(actor.failure().unwrap().contains("actor exploded"));
}

/// Exits on its own after the first message.
struct OneShot;

impl Actor for OneShot {
    type Message = u32;

    fn run(&mut self, cx: &mut Context<u32>) -> Result<(), ActorError> {
        cx.receive()?;
        Ok(())
    }
}

#[test]
fn test_returning_ok_terminates_cleanly() {
    let actor = ActorBuilder::new("one-shot").spawn(OneShot).unwrap();
    actor.send(1).unwrap();
    actor.join();

    assert_eq!(actor.failure(), None);
    assert!(actor.send(2).is_err());
}

/// Exits without reading its mailbox.
struct Quitter;

impl Actor for Quitter {
    type Message = u32;

    fn run(&mut self, _: &mut Context<u32>) -> Result<(), ActorError> {
        Ok(())
    }
}

#[test]
fn test_termination_releases_blocked_sender() {
    common::init_tracing();

    let actor = ActorBuilder::new("quitter").capacity(1).build(Quitter);
    actor.send(1).unwrap();

    let sender = {
        let actor = actor.clone();
        thread::spawn(move || actor.send(2))
    };

    thread::sleep(Duration::from_millis(20));
    actor.start().unwrap();
    actor.join();

    assert_eq!(actor.state(), ActorState::Terminated);
    assert!(matches!(sender.join().unwrap(), Err(SendError::Closed(2))));
}

#[test]
fn test_termination_releases_blocked_close() {
    let actor = ActorBuilder::new("quitter").capacity(1).build(Quitter);
    actor.send(1).unwrap();

    let closer = {
        let actor = actor.clone();
        thread::spawn(move || actor.close())
    };

    thread::sleep(Duration::from_millis(20));
    actor.start().unwrap();
    actor.join();

    closer.join().unwrap();
    assert_eq!(actor.state(), ActorState::Terminated);
}

#[test]
fn test_join_with_huge_timeout() {
    let actor = ActorBuilder::new("quick").spawn(Quitter).unwrap();

    assert!(actor.join_timeout(Duration::MAX));
    assert!(actor.join_timeout(Duration::MAX));
}

/// Counts timeouts until closed.
struct Ticker {
    idle: Arc<Mutex<u32>>,
}

impl Actor for Ticker {
    type Message = ();

    fn run(&mut self, cx: &mut Context<()>) -> Result<(), ActorError> {
        loop {
            if cx.receive_timeout(Duration::from_millis(5))?.is_none() {
                *self.idle.lock() += 1;
            }
        }
    }
}

#[test]
fn test_receive_timeout() {
    let idle = Arc::new(Mutex::new(0));
    let actor = ActorBuilder::new("ticker")
        .spawn(Ticker { idle: idle.clone() })
        .unwrap();

    thread::sleep(Duration::from_millis(50));
    actor.close();
    actor.join();

    assert!(*idle.lock() > 0);
    assert_eq!(actor.failure(), None);
}

#[test]
fn test_bounded_mailbox_try_send() {
    let actor = ActorBuilder::new("bounded")
        .capacity(1)
        .build(Recorder {
            seen: Arc::new(Mutex::new(Vec::new())),
        });

    actor.try_send(1).unwrap();
    assert!(matches!(actor.try_send(2), Err(SendError::Full(2))));
}

#[test]
fn test_worker_runs_tasks_in_order() {
    common::init_tracing();

    let worker = Worker::spawn("sequential").unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let futures: Vec<_> = (0..10)
        .map(|i| {
            let log = log.clone();
            worker
                .submit(move || {
                    log.lock().push(i);
                    i * 10
                })
                .unwrap()
        })
        .collect();

    for (i, future) in futures.iter().enumerate() {
        assert_eq!(future.result(), Ok(&(i * 10)));
    }

    assert_eq!(*log.lock(), (0..10).collect::<Vec<_>>());
}

#[test]
fn test_worker_captures_panics() {
    let worker = Worker::spawn("fragile").unwrap();

    let failed = worker.submit(|| -> u32 { panic!("bad input") }).unwrap();
    let fine = worker.submit(|| 5).unwrap();

    assert!(matches!(failed.result(), Err(TaskError::Panicked(msg)) if msg.contains("bad input")));
    assert_eq!(fine.result(), Ok(&5));

    worker.close();
    worker.join();
    assert!(worker.submit(|| 0).is_err());
}
