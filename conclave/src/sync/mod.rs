//! Blocking synchronization primitives.
//!
//! This module provides the thread-level building blocks used by the rest
//! of the crate:
//! - [`OrderedLockSet`]: deadlock-free acquisition of groups of
//!   [`OrderedLock`]s, with lock-order violations detected per thread,
//! - [`Event`]: a one-shot broadcast used for termination and completion
//!   notifications.
//!
//! ## Design notes
//!
//! - Locks are ordered by a monotonic [`LockId`] assigned at construction,
//!   so the order is the same for every thread of the process.
//! - The acquisition record is a map keyed by thread id, shared by every
//!   [`OrderedLockSet`], so nested acquisitions cannot bypass it by going
//!   through a second set.

mod deadline;
mod event;
mod lockset;

pub(crate) use deadline::deadline_after;

pub use event::Event;
pub use lockset::{LockId, LockSetGuard, OrderedLock, OrderedLockSet};
