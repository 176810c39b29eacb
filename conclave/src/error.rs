//! Error types shared by the concurrency primitives.
//!
//! Errors fall in three families:
//! - transport conditions ([`PutError`], [`GetError`], [`SendError`],
//!   [`SubmitError`]) which are expected and returned to the immediate caller,
//! - contract violations ([`LockOrderViolation`], [`SchedulerError`]) which
//!   are fatal to the offending operation and must not be retried,
//! - control-flow and task outcomes ([`ActorExit`], [`ActorError`],
//!   [`TaskError`]) which are consumed internally or surfaced through a
//!   future.

use crate::sync::LockId;

use std::io;
use thiserror::Error;

/// Locks were requested out of the established ascending order.
///
/// Raised by [`OrderedLockSet::acquire`](crate::sync::OrderedLockSet::acquire)
/// before any new lock is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("lock order violation: holding {held} while requesting {requested}")]
pub struct LockOrderViolation {
    /// Highest lock id already held by the calling thread.
    pub held: LockId,

    /// Lowest lock id of the rejected batch.
    pub requested: LockId,
}

/// Failure to enqueue an item into a channel.
///
/// The rejected item is handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PutError<T> {
    /// The channel is at capacity.
    #[error("channel is full")]
    Full(T),

    /// The channel no longer accepts items.
    #[error("channel is closed")]
    Closed(T),
}

impl<T> PutError<T> {
    /// Returns the rejected item.
    pub fn into_inner(self) -> T {
        match self {
            PutError::Full(item) | PutError::Closed(item) => item,
        }
    }

    /// Returns `true` if the channel was full.
    pub fn is_full(&self) -> bool {
        matches!(self, PutError::Full(_))
    }
}

/// Failure to dequeue an item from a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GetError {
    /// No item became available in time.
    #[error("channel is empty")]
    Empty,
}

/// `task_done` was called more times than items were put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("task_done() called too many times")]
pub struct TaskDoneError;

/// Failure to deliver a message to a [`Mailbox`](crate::channel::Mailbox).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError<M> {
    /// The mailbox is bounded and full.
    #[error("mailbox is full")]
    Full(M),

    /// The mailbox has been closed.
    #[error("mailbox is closed")]
    Closed(M),
}

impl<M> SendError<M> {
    /// Returns the undelivered message.
    pub fn into_inner(self) -> M {
        match self {
            SendError::Full(msg) | SendError::Closed(msg) => msg,
        }
    }
}

impl<M> From<PutError<M>> for SendError<M> {
    fn from(err: PutError<M>) -> Self {
        match err {
            PutError::Full(msg) => SendError::Full(msg),
            PutError::Closed(msg) => SendError::Closed(msg),
        }
    }
}

/// Signal raised by `receive` when an actor dequeues its termination sentinel.
///
/// It is not a failure: the actor's run loop consumes it and terminates
/// cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("actor exit requested")]
pub struct ActorExit;

/// Outcome of a user-supplied actor body.
#[derive(Debug, Error)]
pub enum ActorError {
    /// The termination sentinel was received.
    #[error(transparent)]
    Exit(#[from] ActorExit),

    /// The actor body failed.
    #[error("actor failed: {0}")]
    Failed(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ActorError {
    /// Wraps any error as an actor failure.
    pub fn failed<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ActorError::Failed(Box::new(err))
    }
}

/// Failure to start an actor.
#[derive(Debug, Error)]
pub enum StartError {
    /// `start` was called on an actor that already runs or ran.
    #[error("actor `{0}` has already been started")]
    AlreadyStarted(String),

    /// The actor's thread could not be spawned.
    #[error("failed to spawn actor thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Error captured by a worker while running a submitted task.
///
/// Stored in the task's future and surfaced only when the submitter asks
/// for the result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task panicked; the payload message is preserved when possible.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task reported a failure.
    #[error("task failed: {0}")]
    Failed(String),

    /// The task was discarded before it could run.
    #[error("task was abandoned before completion")]
    Abandoned,
}

/// Failure to hand a task to a worker pool or worker actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The work queue is full (non-blocking submission only).
    #[error("work queue is full")]
    Full,

    /// The pool has been shut down.
    #[error("pool is shut down")]
    Closed,
}

/// Fatal cooperative scheduler errors.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A task suspended with a request the scheduler cannot honour.
    #[error("task {task} broke the scheduler protocol: {reason}")]
    Protocol {
        /// Offending task.
        task: u64,

        /// What was wrong with the suspension.
        reason: &'static str,
    },

    /// The readiness poll itself failed.
    #[error("readiness poll failed: {0}")]
    Poll(#[from] io::Error),
}
