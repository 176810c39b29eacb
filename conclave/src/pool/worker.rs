use super::job::{Job, panic_message};
use crate::channel::{BoundedChannel, Message, Mode};

use std::panic::{self, AssertUnwindSafe};

/// A worker thread of a [`WorkerPool`](super::WorkerPool).
///
/// Workers compete for jobs on the pool's shared queue: each job is taken
/// by exactly one worker.
pub(crate) struct Worker {
    /// Index of the worker inside its pool.
    id: usize,

    /// Queue shared by all workers of the pool.
    queue: BoundedChannel<Job>,
}

impl Worker {
    /// Creates a new worker bound to `queue`.
    pub(crate) fn new(id: usize, queue: BoundedChannel<Job>) -> Self {
        Self { id, queue }
    }

    /// Runs the worker loop.
    ///
    /// # Execution loop
    ///
    /// - Dequeue the next job, blocking while the queue is empty
    /// - Run it and acknowledge it on the queue
    /// - Exit once the close sentinel is observed
    pub(crate) fn run(self) {
        tracing::trace!(worker = self.id, "worker started");

        loop {
            match self.queue.get(Mode::Blocking) {
                Ok(Message::Payload(job)) => {
                    // Packaged tasks capture their own panics; raw jobs sent
                    // through the mailbox interface may not.
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                        tracing::warn!(
                            worker = self.id,
                            panic = %panic_message(&payload),
                            "job panicked"
                        );
                    }

                    let _ = self.queue.task_done();
                }
                Ok(Message::Close) => break,
                Err(_) => continue,
            }
        }

        tracing::trace!(worker = self.id, "worker stopped");
    }
}
