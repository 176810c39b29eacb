use crate::error::TaskError;
use crate::sync::Event;

use parking_lot::Mutex;
use std::fmt;
use std::mem;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

type Callback<T> = Box<dyn FnOnce(&Result<T, TaskError>) + Send>;

struct Inner<T> {
    /// The single assignment.
    slot: OnceLock<Result<T, TaskError>>,

    /// Set right after `slot` is written.
    done: Event,

    /// Callbacks registered before completion.
    callbacks: Mutex<Vec<Callback<T>>>,
}

/// The read side of a single-assignment result slot.
///
/// A `TaskFuture` is returned by
/// [`WorkerPool::submit`](crate::pool::WorkerPool::submit) and
/// [`Worker::submit`](crate::actor::Worker::submit). It is written exactly
/// once by the worker that ran the task and can be read any number of
/// times, from any number of threads.
///
/// # Examples
///
/// ```rust
/// use conclave::pool::PoolBuilder;
///
/// let pool = PoolBuilder::new().workers(2).build().unwrap();
/// let future = pool.submit(|| 2u32.pow(3)).unwrap();
///
/// assert_eq!(future.result(), Ok(&8));
/// ```
pub struct TaskFuture<T> {
    inner: Arc<Inner<T>>,
}

impl<T> TaskFuture<T> {
    /// Blocks until the task completes and returns its cached outcome.
    ///
    /// Every call returns a reference to the same stored value; the task is
    /// never re-run.
    pub fn result(&self) -> Result<&T, &TaskError> {
        loop {
            if let Some(outcome) = self.inner.slot.get() {
                return outcome.as_ref();
            }

            self.inner.done.wait();
        }
    }

    /// Like [`result`](Self::result) but gives up after `timeout`.
    pub fn result_timeout(&self, timeout: Duration) -> Option<Result<&T, &TaskError>> {
        if !self.inner.done.wait_timeout(timeout) {
            return None;
        }

        self.inner.slot.get().map(Result::as_ref)
    }

    /// Returns `true` once the outcome is available.
    pub fn is_done(&self) -> bool {
        self.inner.slot.get().is_some()
    }

    /// Registers `callback` to run with the outcome.
    ///
    /// If the task has already completed, the callback runs immediately on
    /// the calling thread; otherwise it runs on the worker thread right
    /// after completion.
    pub fn add_done_callback<F>(&self, callback: F)
    where
        F: FnOnce(&Result<T, TaskError>) + Send + 'static,
    {
        let mut callbacks = self.inner.callbacks.lock();

        match self.inner.slot.get() {
            Some(outcome) => {
                drop(callbacks);
                callback(outcome);
            }
            None => callbacks.push(Box::new(callback)),
        }
    }
}

impl<T> Clone for TaskFuture<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for TaskFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFuture")
            .field("outcome", &self.inner.slot.get())
            .finish()
    }
}

/// The write side of a [`TaskFuture`].
///
/// Dropping a promise that was never completed resolves the future with
/// [`TaskError::Abandoned`], so readers never block forever on work that
/// will not run.
pub(crate) struct Promise<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Promise<T> {
    /// Creates a connected promise/future pair.
    pub(crate) fn new() -> (Self, TaskFuture<T>) {
        let inner = Arc::new(Inner {
            slot: OnceLock::new(),
            done: Event::new(),
            callbacks: Mutex::new(Vec::new()),
        });

        (
            Self {
                inner: inner.clone(),
            },
            TaskFuture { inner },
        )
    }

    /// Stores the outcome, wakes readers and runs pending callbacks.
    ///
    /// Only the first completion is kept.
    pub(crate) fn complete(&self, outcome: Result<T, TaskError>) {
        let callbacks = {
            let mut callbacks = self.inner.callbacks.lock();

            if self.inner.slot.set(outcome).is_err() {
                return;
            }

            mem::take(&mut *callbacks)
        };

        self.inner.done.set();

        if let Some(outcome) = self.inner.slot.get() {
            for callback in callbacks {
                callback(outcome);
            }
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if self.inner.slot.get().is_none() {
            self.complete(Err(TaskError::Abandoned));
        }
    }
}
