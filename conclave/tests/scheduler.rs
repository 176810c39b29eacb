#![cfg(unix)]

mod common;

use conclave::error::SchedulerError;
use conclave::sched::{Context, Resume, Scheduler, Step, Suspend};
use std::cell::{Cell, RefCell};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

fn socket_pair() -> (UnixStream, UnixStream) {
    let (left, right) = UnixStream::pair().unwrap();
    left.set_nonblocking(true).unwrap();
    right.set_nonblocking(true).unwrap();

    (left, right)
}

#[test]
fn test_yield_round_robin() {
    common::init_tracing();

    let mut scheduler = Scheduler::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    for name in ["a", "b"] {
        let log = log.clone();
        let mut turns = 0;

        scheduler.spawn(move |_: &mut Context, _: Resume| {
            log.borrow_mut().push(name);
            turns += 1;

            if turns < 3 {
                Step::Suspend(Suspend::Yield)
            } else {
                Step::Done
            }
        });
    }

    assert_eq!(scheduler.len(), 2);
    scheduler.run().unwrap();

    assert_eq!(*log.borrow(), vec!["a", "b", "a", "b", "a", "b"]);
    assert!(scheduler.is_empty());
}

#[test]
fn test_sleeping_tasks_wake_by_deadline() {
    let mut scheduler = Scheduler::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    for (name, ms) in [("slow", 40), ("fast", 10)] {
        let log = log.clone();

        scheduler.spawn(move |_: &mut Context, input: Resume| match input {
            Resume::Start => Step::Suspend(Suspend::Sleep(Duration::from_millis(ms))),
            _ => {
                log.borrow_mut().push(name);
                Step::Done
            }
        });
    }

    let start = Instant::now();
    scheduler.run().unwrap();

    assert!(start.elapsed() >= Duration::from_millis(40));
    assert_eq!(*log.borrow(), vec!["fast", "slow"]);
}

#[test]
fn test_echo_over_socket_pair() {
    common::init_tracing();

    let (left, right) = socket_pair();
    let (server, client) = (left.as_raw_fd(), right.as_raw_fd());
    let reply = Rc::new(RefCell::new(Vec::new()));

    let mut scheduler = Scheduler::new();

    scheduler.spawn(move |_: &mut Context, input: Resume| match input {
        Resume::Start => Step::Suspend(Suspend::Read {
            fd: server,
            max: 64,
        }),
        Resume::Read(Ok(data)) => Step::Suspend(Suspend::Write {
            fd: server,
            data: data.to_ascii_uppercase(),
        }),
        Resume::Written(Ok(_)) => Step::Done,
        other => panic!("server: unexpected {other:?}"),
    });

    {
        let reply = reply.clone();

        scheduler.spawn(move |_: &mut Context, input: Resume| match input {
            Resume::Start => Step::Suspend(Suspend::Write {
                fd: client,
                data: b"ping".to_vec(),
            }),
            Resume::Written(Ok(4)) => Step::Suspend(Suspend::Read {
                fd: client,
                max: 64,
            }),
            Resume::Read(Ok(data)) => {
                *reply.borrow_mut() = data;
                Step::Done
            }
            other => panic!("client: unexpected {other:?}"),
        });
    }

    scheduler.run().unwrap();

    assert_eq!(*reply.borrow(), b"PING");
}

#[test]
fn test_read_at_end_of_stream() {
    let (left, right) = socket_pair();
    let fd = left.as_raw_fd();
    drop(right);

    let eof = Rc::new(Cell::new(false));
    let mut scheduler = Scheduler::new();

    {
        let eof = eof.clone();

        scheduler.spawn(move |_: &mut Context, input: Resume| match input {
            Resume::Start => Step::Suspend(Suspend::Read { fd, max: 16 }),
            Resume::Read(Ok(data)) => {
                eof.set(data.is_empty());
                Step::Done
            }
            other => panic!("unexpected {other:?}"),
        });
    }

    scheduler.run().unwrap();
    assert!(eof.get());
}

#[test]
fn test_accept_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();

    let addr = listener.local_addr().unwrap();
    let fd = listener.as_raw_fd();
    let peer: Rc<Cell<Option<SocketAddr>>> = Rc::new(Cell::new(None));

    let mut scheduler = Scheduler::new();

    {
        let peer = peer.clone();

        scheduler.spawn(move |_: &mut Context, input: Resume| match input {
            Resume::Start => Step::Suspend(Suspend::Accept { fd }),
            Resume::Accepted(Ok((_stream, from))) => {
                peer.set(Some(from));
                Step::Done
            }
            other => panic!("unexpected {other:?}"),
        });
    }

    let client = thread::spawn(move || TcpStream::connect(addr).unwrap());

    scheduler.run().unwrap();

    let stream = client.join().unwrap();
    assert_eq!(peer.get(), Some(stream.local_addr().unwrap()));
}

#[test]
fn test_tasks_spawn_tasks() {
    let mut scheduler = Scheduler::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    {
        let log = log.clone();

        scheduler.spawn(move |cx: &mut Context, _: Resume| {
            let parent = cx.id();
            let child_log = log.clone();

            let child = cx.spawn(move |cx: &mut Context, _: Resume| {
                child_log.borrow_mut().push(format!("child {}", cx.id()));
                Step::Done
            });

            assert_ne!(parent, child);
            log.borrow_mut().push(format!("parent {parent}"));
            Step::Done
        });
    }

    scheduler.run().unwrap();

    assert_eq!(*log.borrow(), vec!["parent 1", "child 2"]);
}

#[test]
fn test_cancelled_task_is_never_resumed() {
    let mut scheduler = Scheduler::new();
    let resumed = Rc::new(Cell::new(false));

    let sleeper = {
        let resumed = resumed.clone();

        scheduler.spawn(move |_: &mut Context, input: Resume| match input {
            Resume::Start => Step::Suspend(Suspend::Sleep(Duration::from_secs(30))),
            _ => {
                resumed.set(true);
                Step::Done
            }
        })
    };

    scheduler.spawn(move |cx: &mut Context, _: Resume| {
        cx.cancel(sleeper);
        Step::Done
    });

    let start = Instant::now();
    scheduler.run().unwrap();

    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(!resumed.get());
}

#[test]
fn test_cancel_from_outside() {
    let mut scheduler = Scheduler::new();
    let id = scheduler.spawn(|_: &mut Context, _: Resume| -> Step { panic!("must not run") });

    assert!(scheduler.cancel(id));
    assert!(!scheduler.cancel(id));

    scheduler.run().unwrap();
}

#[test]
fn test_negative_fd_aborts_run() {
    common::init_tracing();

    let mut scheduler = Scheduler::new();
    let id = scheduler.spawn(|_: &mut Context, _: Resume| {
        Step::Suspend(Suspend::Read { fd: -1, max: 8 })
    });

    match scheduler.run() {
        Err(SchedulerError::Protocol { task, reason }) => {
            assert_eq!(task, id);
            assert_eq!(reason, "negative file descriptor");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_second_reader_on_same_fd_aborts_run() {
    let (left, _right) = socket_pair();
    let fd = left.as_raw_fd();

    let mut scheduler = Scheduler::new();

    for _ in 0..2 {
        scheduler.spawn(move |_: &mut Context, _: Resume| {
            Step::Suspend(Suspend::Read { fd, max: 8 })
        });
    }

    assert!(matches!(
        scheduler.run(),
        Err(SchedulerError::Protocol {
            reason: "file descriptor already has a reader",
            ..
        })
    ));
}

#[test]
fn test_empty_read_aborts_run() {
    let (left, _right) = socket_pair();
    let fd = left.as_raw_fd();

    let mut scheduler = Scheduler::new();
    scheduler.spawn(move |_: &mut Context, _: Resume| {
        Step::Suspend(Suspend::Read { fd, max: 0 })
    });

    assert!(matches!(
        scheduler.run(),
        Err(SchedulerError::Protocol { .. })
    ));
}

#[test]
fn test_huge_sleep_never_fires() {
    let mut scheduler = Scheduler::new();
    let resumed = Rc::new(Cell::new(false));

    let sleeper = {
        let resumed = resumed.clone();

        scheduler.spawn(move |_: &mut Context, input: Resume| match input {
            Resume::Start => Step::Suspend(Suspend::Sleep(Duration::MAX)),
            _ => {
                resumed.set(true);
                Step::Done
            }
        })
    };

    // Nothing else is pending, so the run stops with the sleeper parked.
    scheduler.run().unwrap();
    assert_eq!(scheduler.len(), 1);

    scheduler.spawn(move |cx: &mut Context, _: Resume| {
        cx.cancel(sleeper);
        Step::Done
    });

    scheduler.run().unwrap();

    assert!(scheduler.is_empty());
    assert!(!resumed.get());
}

#[test]
fn test_rejected_task_is_dropped_and_others_survive() {
    common::init_tracing();

    let mut scheduler = Scheduler::new();
    let finished = Rc::new(Cell::new(false));

    let victim = scheduler.spawn(|_: &mut Context, _: Resume| -> Step { Step::Suspend(Suspend::Yield) });

    let offender = scheduler.spawn(move |cx: &mut Context, _: Resume| {
        cx.cancel(victim);
        Step::Suspend(Suspend::Read { fd: -1, max: 8 })
    });

    {
        let finished = finished.clone();
        let mut turns = 0;

        scheduler.spawn(move |_: &mut Context, _: Resume| {
            turns += 1;

            if turns < 3 {
                Step::Suspend(Suspend::Yield)
            } else {
                finished.set(true);
                Step::Done
            }
        });
    }

    assert!(matches!(
        scheduler.run(),
        Err(SchedulerError::Protocol { task, .. }) if task == offender
    ));

    // The offender is gone and its cancellation was applied.
    assert_eq!(scheduler.len(), 1);
    assert!(!scheduler.cancel(victim));
    assert!(!scheduler.cancel(offender));

    scheduler.run().unwrap();

    assert!(finished.get());
    assert!(scheduler.is_empty());
}
