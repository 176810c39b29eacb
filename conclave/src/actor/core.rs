use super::Context;
use crate::channel::{BoundedChannel, Mailbox, Mode};
use crate::error::{ActorError, SendError, StartError};
use crate::pool::panic_message;
use crate::sync::Event;

use parking_lot::Mutex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// User-supplied behaviour of an actor.
///
/// `run` is invoked exactly once, on the actor's own thread, and is
/// expected to loop on [`Context::receive`] until it yields
/// [`ActorExit`](crate::error::ActorExit):
///
/// ```rust
/// use conclave::actor::{Actor, Context};
/// use conclave::error::ActorError;
///
/// struct Printer;
///
/// impl Actor for Printer {
///     type Message = String;
///
///     fn run(&mut self, cx: &mut Context<String>) -> Result<(), ActorError> {
///         loop {
///             let line = cx.receive()?;
///             println!("{}: {line}", cx.name());
///         }
///     }
/// }
/// ```
///
/// Returning `Ok(())` or `Err(ActorError::Exit(_))` terminates the actor
/// cleanly. Any other error, or a panic, terminates it as failed: the
/// failure is logged and kept for [`ActorRef::failure`], never propagated
/// to the creator.
pub trait Actor: Send + 'static {
    /// Type of the messages accepted by the actor.
    type Message: Send + 'static;

    /// Runs the actor's message loop.
    fn run(&mut self, cx: &mut Context<Self::Message>) -> Result<(), ActorError>;
}

/// Lifecycle of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    /// Built but not started; messages are queued.
    Created,

    /// The actor's thread is running its message loop.
    Running,

    /// Close requested; queued messages are still being processed.
    Draining,

    /// The message loop has exited.
    Terminated,
}

/// State shared between all references to an actor and its thread.
pub(crate) struct ActorCell<M> {
    name: String,
    mailbox: BoundedChannel<M>,

    /// The behaviour, taken by `start`.
    actor: Mutex<Option<Box<dyn Actor<Message = M>>>>,

    state: Mutex<ActorState>,

    /// Set once the message loop has exited.
    terminated: Event,

    /// Description of the failure that terminated the actor, if any.
    failure: Mutex<Option<String>>,
}

impl<M: Send + 'static> ActorCell<M> {
    /// Runs the actor body and records how it ended.
    fn run(&self, mut actor: Box<dyn Actor<Message = M>>) {
        tracing::debug!(actor = %self.name, "actor started");

        let mut cx = Context::new(self.name.clone(), self.mailbox.clone());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| actor.run(&mut cx)));

        let failure = match outcome {
            Ok(Ok(())) | Ok(Err(ActorError::Exit(_))) => None,
            Ok(Err(ActorError::Failed(err))) => Some(err.to_string()),
            Err(payload) => Some(format!("panicked: {}", panic_message(&payload))),
        };

        match &failure {
            Some(reason) => tracing::error!(actor = %self.name, %reason, "actor failed"),
            None => tracing::debug!(actor = %self.name, "actor terminated"),
        }

        self.terminate(failure);
    }

    fn terminate(&self, failure: Option<String>) {
        *self.failure.lock() = failure;
        *self.state.lock() = ActorState::Terminated;

        // Nothing drains the mailbox any more; release parked senders.
        self.mailbox.shutdown();

        self.terminated.set();
    }

    fn put(&self, msg: M, mode: Mode) -> Result<(), SendError<M>> {
        if *self.state.lock() == ActorState::Terminated {
            return Err(SendError::Closed(msg));
        }

        self.mailbox.put(msg, mode).map_err(SendError::from)
    }
}

impl<M: Send + 'static> Mailbox<M> for ActorCell<M> {
    fn send(&self, msg: M) -> Result<(), SendError<M>> {
        self.put(msg, Mode::Blocking)
    }

    fn try_send(&self, msg: M) -> Result<(), SendError<M>> {
        self.put(msg, Mode::NonBlocking)
    }
}

/// A shared handle to an actor.
///
/// `ActorRef` is the only way to talk to an actor: it sends messages,
/// starts and closes the actor, and waits for its termination. Cloning
/// it is cheap and every clone refers to the same actor.
pub struct ActorRef<M> {
    cell: Arc<ActorCell<M>>,
}

impl<M: Send + 'static> ActorRef<M> {
    /// Wraps `actor` in a new, not yet started, actor.
    pub(crate) fn new<A>(name: String, capacity: usize, actor: A) -> Self
    where
        A: Actor<Message = M>,
    {
        Self {
            cell: Arc::new(ActorCell {
                name,
                mailbox: BoundedChannel::bounded(capacity),
                actor: Mutex::new(Some(Box::new(actor))),
                state: Mutex::new(ActorState::Created),
                terminated: Event::new(),
                failure: Mutex::new(None),
            }),
        }
    }

    /// Returns the actor's name.
    pub fn name(&self) -> &str {
        &self.cell.name
    }

    /// Starts the actor on a new thread named after it.
    ///
    /// # Errors
    ///
    /// - [`StartError::AlreadyStarted`] if the actor was started before,
    /// - [`StartError::Spawn`] if the thread could not be created; the
    ///   actor is then terminated.
    pub fn start(&self) -> Result<(), StartError> {
        let actor = self
            .cell
            .actor
            .lock()
            .take()
            .ok_or_else(|| StartError::AlreadyStarted(self.cell.name.clone()))?;

        {
            let mut state = self.cell.state.lock();

            *state = if self.cell.mailbox.is_closed() {
                ActorState::Draining
            } else {
                ActorState::Running
            };
        }

        let cell = self.cell.clone();
        let spawned = thread::Builder::new()
            .name(self.cell.name.clone())
            .spawn(move || cell.run(actor));

        if let Err(err) = spawned {
            tracing::error!(actor = %self.cell.name, error = %err, "failed to spawn actor thread");

            self.cell.terminate(Some(err.to_string()));
            return Err(StartError::Spawn(err));
        }

        Ok(())
    }

    /// Sends `msg` to the actor, blocking while a bounded mailbox is full.
    ///
    /// Messages may be sent before [`start`](Self::start); they are
    /// processed once the actor runs.
    ///
    /// # Errors
    ///
    /// [`SendError::Closed`] if the actor has been closed or has terminated.
    pub fn send(&self, msg: M) -> Result<(), SendError<M>> {
        self.cell.put(msg, Mode::Blocking)
    }

    /// Sends `msg` without blocking.
    pub fn try_send(&self, msg: M) -> Result<(), SendError<M>> {
        self.cell.put(msg, Mode::NonBlocking)
    }

    /// Requests termination.
    ///
    /// The termination sentinel is queued behind the messages already sent,
    /// which are all processed before the actor exits. Closing twice is a
    /// no-op.
    pub fn close(&self) {
        if self.state() == ActorState::Terminated {
            return;
        }

        self.cell.mailbox.close();

        let mut state = self.cell.state.lock();

        if *state == ActorState::Running {
            *state = ActorState::Draining;
        }
    }

    /// Blocks until the actor has terminated.
    ///
    /// Any number of threads may join the same actor; all of them wake at
    /// termination. Joining an actor that already terminated returns
    /// immediately, joining one that is never started blocks forever.
    pub fn join(&self) {
        self.cell.terminated.wait();
    }

    /// Like [`join`](Self::join) but gives up after `timeout`.
    ///
    /// Returns `true` if the actor has terminated.
    pub fn join_timeout(&self, timeout: Duration) -> bool {
        self.cell.terminated.wait_timeout(timeout)
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ActorState {
        *self.cell.state.lock()
    }

    /// Returns the failure that terminated the actor, if any.
    ///
    /// `None` while the actor runs and after a clean exit.
    pub fn failure(&self) -> Option<String> {
        self.cell.failure.lock().clone()
    }

    /// Returns the actor as a type-erased mailbox.
    ///
    /// Every call returns a handle to the same underlying actor, so the
    /// result can be attached to and detached from an
    /// [`Exchange`](crate::exchange::Exchange).
    pub fn as_mailbox(&self) -> Arc<dyn Mailbox<M>> {
        self.cell.clone()
    }
}

impl<M: Send + 'static> Mailbox<M> for ActorRef<M> {
    fn send(&self, msg: M) -> Result<(), SendError<M>> {
        ActorRef::send(self, msg)
    }

    fn try_send(&self, msg: M) -> Result<(), SendError<M>> {
        ActorRef::try_send(self, msg)
    }
}

impl<M> Clone for ActorRef<M> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<M> fmt::Debug for ActorRef<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("name", &self.cell.name)
            .field("state", &*self.cell.state.lock())
            .finish()
    }
}
