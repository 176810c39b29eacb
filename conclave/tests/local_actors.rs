mod common;

use conclave::sched::{Flow, LocalActor, LocalActors, Outbox};
use std::cell::RefCell;
use std::rc::Rc;

/// Forwards every number below the limit to the printer.
struct Counter {
    limit: u32,
}

impl LocalActor<u32> for Counter {
    fn handle(&mut self, outbox: &mut Outbox<'_, u32>, n: u32) -> Flow {
        if n >= self.limit {
            return Flow::Stop;
        }

        outbox.send("printer", n);
        Flow::Continue
    }
}

/// Records numbers and asks the counter for the next one.
struct Printer {
    printed: Rc<RefCell<Vec<u32>>>,
}

impl LocalActor<u32> for Printer {
    fn handle(&mut self, outbox: &mut Outbox<'_, u32>, n: u32) -> Flow {
        self.printed.borrow_mut().push(n);
        outbox.send("counter", n + 1);
        Flow::Continue
    }
}

#[test]
fn test_counter_printer_ping_pong() {
    common::init_tracing();

    let printed = Rc::new(RefCell::new(Vec::new()));
    let mut actors = LocalActors::new();

    actors.register("counter", Counter { limit: 5 });
    actors.register(
        "printer",
        Printer {
            printed: printed.clone(),
        },
    );

    assert!(actors.send("counter", 0));

    // Counter handles 0..=5, printer 0..5.
    assert_eq!(actors.run(), 11);
    assert_eq!(*printed.borrow(), vec![0, 1, 2, 3, 4]);

    assert!(!actors.contains("counter"));
    assert!(actors.contains("printer"));
    assert!(!actors.send("counter", 0));
}

#[test]
fn test_messages_to_unknown_actors_are_dropped() {
    let mut actors = LocalActors::new();

    actors.register("relay", |outbox: &mut Outbox<u32>, n: u32| {
        outbox.send("ghost", n);
        Flow::Continue
    });

    assert!(!actors.send("ghost", 1));
    assert!(actors.send("relay", 1));
    assert_eq!(actors.run(), 1);
}

#[test]
fn test_run_delivers_in_fifo_order() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut actors = LocalActors::new();

    {
        let seen = seen.clone();
        actors.register("sink", move |_: &mut Outbox<String>, msg: String| {
            seen.borrow_mut().push(msg);
            Flow::Continue
        });
    }

    for msg in ["first", "second", "third"] {
        assert!(actors.send("sink", msg.to_string()));
    }

    assert_eq!(actors.run(), 3);
    assert_eq!(*seen.borrow(), vec!["first", "second", "third"]);
    assert_eq!(actors.run(), 0);
}
