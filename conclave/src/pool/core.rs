use super::PoolBuilder;
use super::future::TaskFuture;
use super::job::{Job, package, package_fallible};
use super::worker::Worker;
use crate::channel::{BoundedChannel, Mailbox, Mode};
use crate::error::{PutError, SendError, SubmitError};

use std::fmt::{self, Display};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A fixed-size pool of worker threads.
///
/// `WorkerPool` is responsible for:
/// - spawning its worker threads once, at build time,
/// - queueing submitted tasks on one shared channel,
/// - handing each task's outcome back through a [`TaskFuture`],
/// - orderly shutdown: queued tasks are drained before workers exit.
///
/// The number of threads never grows. With a bounded queue, submitters
/// block once the queue is full; that backpressure is the pool's throttle.
///
/// Dropping the pool shuts it down and joins all workers.
pub struct WorkerPool {
    /// Queue shared by all workers.
    queue: BoundedChannel<Job>,

    /// Join handles for worker threads.
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Returns a [`PoolBuilder`] with default configuration.
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Creates a pool with `workers` threads named `{name}-{index}`.
    pub(crate) fn new(workers: usize, capacity: usize, name: &str) -> io::Result<Self> {
        let queue = BoundedChannel::bounded(capacity);
        let mut pool = Self {
            queue,
            handles: Vec::with_capacity(workers),
        };

        for id in 0..workers {
            let worker = Worker::new(id, pool.queue.clone());

            let handle = thread::Builder::new()
                .name(format!("{name}-{id}"))
                .spawn(move || worker.run())?;

            pool.handles.push(handle);
        }

        tracing::debug!(workers, capacity, name, "worker pool started");
        Ok(pool)
    }

    /// Submits `task` for execution, blocking while the queue is full.
    ///
    /// A panic inside `task` is captured as
    /// [`TaskError::Panicked`](crate::error::TaskError::Panicked) in the
    /// returned future and does not affect the pool.
    ///
    /// # Errors
    ///
    /// [`SubmitError::Closed`] if the pool has been shut down.
    pub fn submit<F, T>(&self, task: F) -> Result<TaskFuture<T>, SubmitError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        let (job, future) = package(task);
        self.enqueue(job, Mode::Blocking)?;

        Ok(future)
    }

    /// Submits `task` without blocking.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::Full`] if the queue is at capacity,
    /// - [`SubmitError::Closed`] if the pool has been shut down.
    pub fn try_submit<F, T>(&self, task: F) -> Result<TaskFuture<T>, SubmitError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        let (job, future) = package(task);
        self.enqueue(job, Mode::NonBlocking)?;

        Ok(future)
    }

    /// Submits a task that reports its own failures.
    ///
    /// An `Err(e)` returned by `task` is stored as
    /// [`TaskError::Failed`](crate::error::TaskError::Failed) with `e`'s
    /// display text.
    pub fn submit_fallible<F, T, E>(&self, task: F) -> Result<TaskFuture<T>, SubmitError>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + Sync + 'static,
        E: Display,
    {
        let (job, future) = package_fallible(task);
        self.enqueue(job, Mode::Blocking)?;

        Ok(future)
    }

    /// Applies `f` to every item on the pool.
    ///
    /// Futures are returned in input order, whatever order the tasks
    /// complete in.
    pub fn map<I, F, T>(&self, items: I, f: F) -> Result<Vec<TaskFuture<T>>, SubmitError>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> T + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        let f = Arc::new(f);

        items
            .into_iter()
            .map(|item| {
                let f = f.clone();
                self.submit(move || f(item))
            })
            .collect()
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Number of tasks waiting for a worker.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Blocks until every task submitted so far has run.
    pub fn wait_idle(&self) {
        self.queue.join();
    }

    /// Stops accepting tasks.
    ///
    /// Tasks already queued still run; workers exit once the queue is
    /// drained.
    pub fn shutdown(&self) {
        self.queue.close();
    }

    /// Waits for all worker threads to terminate.
    ///
    /// This should be called after [`shutdown`](Self::shutdown).
    pub fn join(&mut self) {
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }

    fn enqueue(&self, job: Job, mode: Mode) -> Result<(), SubmitError> {
        self.queue.put(job, mode).map_err(|err| match err {
            PutError::Full(_) => SubmitError::Full,
            PutError::Closed(_) => SubmitError::Closed,
        })
    }
}

impl Mailbox<Job> for WorkerPool {
    fn send(&self, job: Job) -> Result<(), SendError<Job>> {
        self.queue.put(job, Mode::Blocking).map_err(SendError::from)
    }

    fn try_send(&self, job: Job) -> Result<(), SendError<Job>> {
        self.queue.put(job, Mode::NonBlocking).map_err(SendError::from)
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.handles.len())
            .field("queue", &self.queue)
            .finish()
    }
}

impl Drop for WorkerPool {
    /// Shuts down the pool.
    ///
    /// This performs the following steps:
    /// 1. Closes the work queue
    /// 2. Lets workers drain the tasks already queued
    /// 3. Joins all worker threads
    fn drop(&mut self) {
        self.shutdown();
        self.join();
    }
}
