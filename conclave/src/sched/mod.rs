//! Cooperative single-threaded execution.
//!
//! This module is the alternative to threads and channels: many tasks
//! share one thread and give control back only at explicit suspension
//! points, so the code between two suspensions never races with another
//! task.
//!
//! It provides:
//! - [`Scheduler`]: runs [`Task`] state machines, resuming them when their
//!   file descriptor is ready, their timer expires or they yielded,
//! - [`LocalActors`]: named message handlers run while messages are pending.

mod actors;

#[cfg(unix)]
mod core;
#[cfg(unix)]
mod poller;
#[cfg(unix)]
mod sys;
#[cfg(unix)]
mod task;
#[cfg(unix)]
mod timer;

pub use actors::{Flow, LocalActor, LocalActors, Outbox};

#[cfg(unix)]
pub use self::core::Scheduler;
#[cfg(unix)]
pub use task::{Context, Resume, Step, Suspend, Task, TaskId};
