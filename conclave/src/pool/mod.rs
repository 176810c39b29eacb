//! Fixed-size worker pool.
//!
//! This module contains:
//! - [`WorkerPool`]: N named threads draining one shared job channel,
//! - [`PoolBuilder`]: configuration of worker count, queue bound and thread names,
//! - [`TaskFuture`]: the single-assignment result of a submitted task.
//!
//! Workers compete for jobs: every submitted task runs on exactly one worker.
//! Task outcomes, including panics, are captured in the task's future and
//! never reach the pool.

mod builder;
mod core;
pub(crate) mod future;
mod job;
mod worker;

pub use self::core::WorkerPool;
pub use builder::PoolBuilder;
pub use future::TaskFuture;
pub use job::Job;

pub(crate) use job::{package, panic_message};
