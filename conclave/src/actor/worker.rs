use super::{Actor, ActorBuilder, ActorRef, Context};
use crate::error::{ActorError, SendError, StartError, SubmitError};
use crate::pool::{Job, TaskFuture, package};

use std::time::Duration;

/// An actor running submitted closures one at a time.
///
/// Tasks run sequentially, in submission order, on the worker's thread.
/// Each submission returns a [`TaskFuture`] holding the task's outcome.
///
/// Dropping the worker closes it and waits for queued tasks to finish.
///
/// # Examples
///
/// ```rust
/// use conclave::actor::Worker;
///
/// let worker = Worker::spawn("compute").unwrap();
/// let future = worker.submit(|| 6 * 7).unwrap();
///
/// assert_eq!(future.result(), Ok(&42));
/// ```
#[derive(Debug)]
pub struct Worker {
    actor: ActorRef<Job>,
}

struct Runner;

impl Actor for Runner {
    type Message = Job;

    fn run(&mut self, cx: &mut Context<Job>) -> Result<(), ActorError> {
        loop {
            let job = cx.receive()?;
            job();
        }
    }
}

impl Worker {
    /// Starts a worker named `name`.
    pub fn spawn(name: impl Into<String>) -> Result<Self, StartError> {
        let actor = ActorBuilder::new(name).spawn(Runner)?;

        Ok(Self { actor })
    }

    /// Queues `task` and returns the future of its outcome.
    ///
    /// # Errors
    ///
    /// [`SubmitError::Closed`] if the worker has been closed.
    pub fn submit<F, T>(&self, task: F) -> Result<TaskFuture<T>, SubmitError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        let (job, future) = package(task);

        self.actor.send(job).map_err(|err| match err {
            SendError::Full(_) => SubmitError::Full,
            SendError::Closed(_) => SubmitError::Closed,
        })?;

        Ok(future)
    }

    /// Returns the worker's name.
    pub fn name(&self) -> &str {
        self.actor.name()
    }

    /// Stops accepting tasks; queued ones still run.
    pub fn close(&self) {
        self.actor.close();
    }

    /// Blocks until the worker has terminated.
    pub fn join(&self) {
        self.actor.join();
    }

    /// Like [`join`](Self::join) but gives up after `timeout`.
    pub fn join_timeout(&self, timeout: Duration) -> bool {
        self.actor.join_timeout(timeout)
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.actor.close();
        self.actor.join();
    }
}
