use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Whether a local actor keeps receiving messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// A message handler living on the [`LocalActors`] thread.
pub trait LocalActor<M> {
    /// Handles one message.
    ///
    /// Messages sent through `outbox` are delivered after every message
    /// already queued.
    fn handle(&mut self, outbox: &mut Outbox<'_, M>, msg: M) -> Flow;
}

impl<M, F> LocalActor<M> for F
where
    F: FnMut(&mut Outbox<'_, M>, M) -> Flow,
{
    fn handle(&mut self, outbox: &mut Outbox<'_, M>, msg: M) -> Flow {
        self(outbox, msg)
    }
}

/// Sending side handed to a [`LocalActor`] while it handles a message.
pub struct Outbox<'a, M> {
    queue: &'a mut VecDeque<(String, M)>,
}

impl<M> Outbox<'_, M> {
    /// Queues `msg` for the actor called `to`.
    pub fn send(&mut self, to: &str, msg: M) {
        self.queue.push_back((to.to_string(), msg));
    }
}

/// Message-driven actors sharing one thread.
///
/// Actors are registered by name and run only when a message is delivered
/// to them. [`run`](Self::run) delivers queued messages in FIFO order until
/// none is left, so a handler never runs concurrently with another.
///
/// # Examples
///
/// ```rust
/// use conclave::sched::{Flow, LocalActors, Outbox};
///
/// let mut actors = LocalActors::new();
///
/// actors.register("countdown", |outbox: &mut Outbox<u32>, n: u32| {
///     if n == 0 {
///         return Flow::Stop;
///     }
///
///     outbox.send("countdown", n - 1);
///     Flow::Continue
/// });
///
/// actors.send("countdown", 3);
/// assert_eq!(actors.run(), 4);
/// assert!(!actors.contains("countdown"));
/// ```
pub struct LocalActors<M> {
    actors: HashMap<String, Box<dyn LocalActor<M>>>,
    queue: VecDeque<(String, M)>,
}

impl<M> LocalActors<M> {
    /// Creates an empty set of actors.
    pub fn new() -> Self {
        Self {
            actors: HashMap::new(),
            queue: VecDeque::new(),
        }
    }

    /// Registers `actor` under `name`, replacing any actor of that name.
    pub fn register<A>(&mut self, name: impl Into<String>, actor: A)
    where
        A: LocalActor<M> + 'static,
    {
        self.actors.insert(name.into(), Box::new(actor));
    }

    /// Returns `true` if an actor called `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.actors.contains_key(name)
    }

    /// Queues `msg` for the actor called `to`.
    ///
    /// Returns `false`, dropping the message, if no such actor exists.
    pub fn send(&mut self, to: &str, msg: M) -> bool {
        if !self.actors.contains_key(to) {
            return false;
        }

        self.queue.push_back((to.to_string(), msg));
        true
    }

    /// Delivers messages until the queue is empty.
    ///
    /// Returns the number of messages handled. Messages addressed to an
    /// actor that has stopped are dropped.
    pub fn run(&mut self) -> usize {
        let mut handled = 0;

        while let Some((to, msg)) = self.queue.pop_front() {
            let Some(actor) = self.actors.get_mut(&to) else {
                tracing::warn!(actor = %to, "message to unknown local actor dropped");
                continue;
            };

            let mut outbox = Outbox {
                queue: &mut self.queue,
            };

            handled += 1;

            if actor.handle(&mut outbox, msg) == Flow::Stop {
                tracing::debug!(actor = %to, "local actor stopped");
                self.actors.remove(&to);
            }
        }

        handled
    }
}

impl<M> Default for LocalActors<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for LocalActors<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalActors")
            .field("actors", &self.actors.keys().collect::<Vec<_>>())
            .field("queued", &self.queue.len())
            .finish()
    }
}
