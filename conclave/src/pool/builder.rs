use super::WorkerPool;

use std::io;
use std::thread;

/// Builder for configuring and creating a [`WorkerPool`].
///
/// # Examples
///
/// ```rust
/// use conclave::pool::PoolBuilder;
///
/// let pool = PoolBuilder::new()
///     .workers(4)
///     .capacity(64)
///     .thread_name("fetch")
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.workers(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct PoolBuilder {
    /// Number of worker threads.
    workers: usize,

    /// Capacity of the work queue, `0` meaning unbounded.
    capacity: usize,

    /// Prefix of worker thread names.
    thread_name: String,
}

impl PoolBuilder {
    /// Creates a new `PoolBuilder` with default configuration.
    ///
    /// By default, the number of workers is set to the number of available
    /// logical CPUs, falling back to `1` if unavailable, and the work queue
    /// is unbounded.
    pub fn new() -> Self {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            workers,
            capacity: 0,
            thread_name: "conclave-worker".to_string(),
        }
    }

    /// Sets the number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn workers(mut self, n: usize) -> Self {
        assert!(n > 0, "workers must be > 0");

        self.workers = n;
        self
    }

    /// Bounds the work queue.
    ///
    /// Submitters block once `capacity` jobs are pending, which throttles
    /// producers to the pool's pace. `0` keeps the queue unbounded.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the prefix used to name worker threads (`{prefix}-{index}`).
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Builds the pool and starts its workers.
    ///
    /// # Errors
    ///
    /// Returns the OS error if a worker thread cannot be spawned; workers
    /// started before the failure are shut down.
    pub fn build(self) -> io::Result<WorkerPool> {
        WorkerPool::new(self.workers, self.capacity, &self.thread_name)
    }
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}
