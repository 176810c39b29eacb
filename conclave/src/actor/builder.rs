use super::{Actor, ActorRef};
use crate::error::StartError;

/// Builder for configuring and creating an actor.
///
/// # Examples
///
/// ```rust
/// use conclave::actor::{Actor, ActorBuilder, Context};
/// use conclave::error::ActorError;
///
/// struct Sink;
///
/// impl Actor for Sink {
///     type Message = u32;
///
///     fn run(&mut self, cx: &mut Context<u32>) -> Result<(), ActorError> {
///         loop {
///             cx.receive()?;
///         }
///     }
/// }
///
/// let sink = ActorBuilder::new("sink").capacity(16).spawn(Sink).unwrap();
///
/// sink.send(7).unwrap();
/// sink.close();
/// sink.join();
/// ```
#[derive(Debug, Clone)]
pub struct ActorBuilder {
    /// Name of the actor and of its thread.
    name: String,

    /// Mailbox capacity, `0` meaning unbounded.
    capacity: usize,
}

impl ActorBuilder {
    /// Creates a builder for an actor called `name` with an unbounded
    /// mailbox.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: 0,
        }
    }

    /// Bounds the mailbox.
    ///
    /// Senders block once `capacity` messages are pending. `0` keeps the
    /// mailbox unbounded.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Creates the actor without starting it.
    pub fn build<A: Actor>(self, actor: A) -> ActorRef<A::Message> {
        ActorRef::new(self.name, self.capacity, actor)
    }

    /// Creates the actor and starts it.
    ///
    /// # Errors
    ///
    /// [`StartError::Spawn`] if the actor's thread could not be created.
    pub fn spawn<A: Actor>(self, actor: A) -> Result<ActorRef<A::Message>, StartError> {
        let actor = self.build(actor);
        actor.start()?;

        Ok(actor)
    }
}
