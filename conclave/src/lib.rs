//! # Conclave
//!
//! **Conclave** is a small concurrency core for Rust: the primitives needed
//! to build threaded services that talk through messages rather than
//! shared state, plus a cooperative scheduler for single-threaded I/O
//! multiplexing.
//!
//! It offers:
//!
//! - **Ordered lock sets** that acquire groups of locks in one global order
//!   and reject out-of-order nesting before it can deadlock
//! - **Bounded channels** with blocking, non-blocking and timed operations
//!   and a close sentinel observed once by every consumer
//! - **Actors** owning a private mailbox and a message loop on their own thread
//! - **Exchanges** fanning published messages out to attached mailboxes
//! - **A worker pool** returning single-assignment futures
//! - **A cooperative scheduler** resuming task state machines on I/O
//!   readiness and timers
//!
//! ## Quick Start
//!
//! ```rust
//! use conclave::actor::{Actor, ActorBuilder, Context};
//! use conclave::error::ActorError;
//! use conclave::pool::PoolBuilder;
//!
//! struct Counter(u64);
//!
//! impl Actor for Counter {
//!     type Message = u64;
//!
//!     fn run(&mut self, cx: &mut Context<u64>) -> Result<(), ActorError> {
//!         loop {
//!             self.0 += cx.receive()?;
//!         }
//!     }
//! }
//!
//! let counter = ActorBuilder::new("counter").spawn(Counter(0)).unwrap();
//! let pool = PoolBuilder::new().workers(2).build().unwrap();
//!
//! let squares = pool.map(1..=4u64, |n| n * n).unwrap();
//!
//! for square in &squares {
//!     counter.send(*square.result().unwrap()).unwrap();
//! }
//!
//! counter.close();
//! counter.join();
//! ```
//!
//! ## Modules
//!
//! - [`sync`]: ordered lock sets and one-shot events
//! - [`channel`]: bounded and priority channels, the [`Mailbox`](channel::Mailbox) trait
//! - [`actor`]: thread-backed actors and the worker actor
//! - [`exchange`]: publish/subscribe fan-out
//! - [`pool`]: the worker pool and its futures
//! - [`sched`]: the cooperative scheduler and local actors
//! - [`error`]: every error type of the crate
//!
//! ## Logging
//!
//! Conclave reports lifecycle events and dropped messages through
//! [`tracing`]. It never installs a subscriber.

pub mod actor;
pub mod channel;
pub mod error;
pub mod exchange;
pub mod pool;
pub mod sched;
pub mod sync;

pub use actor::{Actor, ActorBuilder, ActorRef};
pub use channel::{BoundedChannel, Mailbox, Message, Mode};
pub use exchange::Exchange;
pub use pool::{PoolBuilder, TaskFuture, WorkerPool};
pub use sync::{OrderedLock, OrderedLockSet};
