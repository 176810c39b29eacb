use super::future::{Promise, TaskFuture};
use crate::error::TaskError;

use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

/// A unit of work understood by worker threads.
///
/// Jobs built by [`package`] never unwind: panics raised by the wrapped task
/// are captured into its future before the job returns.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Wraps `task` into a [`Job`] completing the returned future.
pub(crate) fn package<F, T>(task: F) -> (Job, TaskFuture<T>)
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + Sync + 'static,
{
    let (promise, future) = Promise::new();

    let job: Job = Box::new(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(task))
            .map_err(|payload| TaskError::Panicked(panic_message(&payload)));

        promise.complete(outcome);
    });

    (job, future)
}

/// Like [`package`] for tasks reporting their own failures.
pub(crate) fn package_fallible<F, T, E>(task: F) -> (Job, TaskFuture<T>)
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + Sync + 'static,
    E: Display,
{
    let (promise, future) = Promise::new();

    let job: Job = Box::new(move || {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(TaskError::Failed(err.to_string())),
            Err(payload) => Err(TaskError::Panicked(panic_message(&payload))),
        };

        promise.complete(outcome);
    });

    (job, future)
}

/// Extracts a human-readable message from a panic payload.
pub(crate) fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
