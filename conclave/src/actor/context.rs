use crate::channel::{BoundedChannel, Message, Mode};
use crate::error::{ActorExit, GetError};

use std::time::Duration;

/// The receiving end of an actor's mailbox.
///
/// A `Context` is handed to [`Actor::run`](super::Actor::run) and is only
/// reachable from the actor's own thread: the mailbox has a single reader.
///
/// Every receive operation returns `Err(ActorExit)` once the termination
/// sentinel is dequeued, so an actor body can simply propagate it with `?`.
pub struct Context<M> {
    /// Name of the actor, also used for its thread.
    name: String,

    /// The actor's mailbox.
    mailbox: BoundedChannel<M>,
}

impl<M> Context<M> {
    pub(crate) fn new(name: String, mailbox: BoundedChannel<M>) -> Self {
        Self { name, mailbox }
    }

    /// Returns the actor's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blocks until the next message arrives.
    ///
    /// # Errors
    ///
    /// [`ActorExit`] once the actor has been closed and every message sent
    /// before [`close`](super::ActorRef::close) has been received.
    pub fn receive(&mut self) -> Result<M, ActorExit> {
        loop {
            match self.mailbox.get(Mode::Blocking) {
                Ok(message) => return unwrap_message(message),
                Err(GetError::Empty) => continue,
            }
        }
    }

    /// Waits up to `timeout` for the next message.
    ///
    /// Returns `Ok(None)` if nothing arrived in time.
    pub fn receive_timeout(&mut self, timeout: Duration) -> Result<Option<M>, ActorExit> {
        self.poll(Mode::Timeout(timeout))
    }

    /// Returns the next message if one is already queued.
    pub fn try_receive(&mut self) -> Result<Option<M>, ActorExit> {
        self.poll(Mode::NonBlocking)
    }

    /// Number of messages waiting in the mailbox.
    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }

    fn poll(&mut self, mode: Mode) -> Result<Option<M>, ActorExit> {
        match self.mailbox.get(mode) {
            Ok(message) => unwrap_message(message).map(Some),
            Err(GetError::Empty) => Ok(None),
        }
    }
}

fn unwrap_message<M>(message: Message<M>) -> Result<M, ActorExit> {
    match message {
        Message::Payload(msg) => Ok(msg),
        Message::Close => Err(ActorExit),
    }
}
