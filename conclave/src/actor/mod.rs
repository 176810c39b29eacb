//! Thread-backed actors.
//!
//! An actor is an independent unit of execution owning a private mailbox.
//! Other threads talk to it only by sending messages; the actor processes
//! them one at a time on its own thread.
//!
//! This module provides:
//! - [`Actor`]: the user-supplied message loop,
//! - [`Context`]: the receiving side of the mailbox, handed to the loop,
//! - [`ActorRef`]: the cloneable handle used to send, start, close and join,
//! - [`ActorBuilder`]: naming and mailbox configuration,
//! - [`Worker`]: an actor executing closures and answering with futures.
//!
//! # Lifecycle
//!
//! `Created` → `start` → `Running` → `close` → `Draining` → `Terminated`.
//! Closing queues a termination sentinel behind pending messages; the actor
//! receives it as [`ActorExit`](crate::error::ActorExit) and exits cleanly.

mod builder;
mod context;
mod core;
mod worker;

pub use self::core::{Actor, ActorRef, ActorState};
pub use builder::ActorBuilder;
pub use context::Context;
pub use worker::Worker;
