//! Fetch-and-report pipeline: a worker pool computes, an exchange fans the
//! results out to two actors.

use conclave::actor::{Actor, ActorBuilder, Context};
use conclave::error::ActorError;
use conclave::exchange::Exchange;
use conclave::pool::PoolBuilder;

struct Printer;

impl Actor for Printer {
    type Message = (u64, u64);

    fn run(&mut self, cx: &mut Context<(u64, u64)>) -> Result<(), ActorError> {
        loop {
            let (n, digits) = cx.receive()?;
            println!("[{}] {n}! has {digits} digits", cx.name());
        }
    }
}

struct Summer {
    total: u64,
}

impl Actor for Summer {
    type Message = (u64, u64);

    fn run(&mut self, cx: &mut Context<(u64, u64)>) -> Result<(), ActorError> {
        while let Ok((_, digits)) = cx.receive() {
            self.total += digits;
        }

        println!("[{}] {} digits in total", cx.name(), self.total);
        Ok(())
    }
}

/// Number of decimal digits of `n!`.
fn factorial_digits(n: u64) -> u64 {
    let log10: f64 = (2..=n).map(|k| (k as f64).log10()).sum();
    log10.floor() as u64 + 1
}

fn main() {
    tracing_subscriber::fmt().init();

    let pool = PoolBuilder::new().workers(4).capacity(16).build().unwrap();
    let exchange = Exchange::new("results");

    let printer = ActorBuilder::new("printer").spawn(Printer).unwrap();
    let summer = ActorBuilder::new("summer").spawn(Summer { total: 0 }).unwrap();

    let _subscription = exchange.subscribe(&[printer.as_mailbox(), summer.as_mailbox()]);

    let inputs: Vec<u64> = (1..=10).map(|i| i * 100).collect();
    let futures = pool.map(inputs.clone(), factorial_digits).unwrap();

    for (n, future) in inputs.into_iter().zip(futures) {
        exchange.send((n, *future.result().unwrap()));
    }

    for actor in [&printer, &summer] {
        actor.close();
        actor.join();
    }
}
