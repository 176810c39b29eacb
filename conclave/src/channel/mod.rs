//! Message-passing channels.
//!
//! This module provides the transport used for all inter-thread
//! communication in the crate:
//! - [`BoundedChannel`]: a multi-producer, multi-consumer FIFO queue with
//!   blocking, non-blocking and timed operations and a close sentinel,
//! - [`PriorityChannel`]: an unbounded queue ordered by priority,
//! - [`Mailbox`]: the `send` capability implemented by every message sink.
//!
//! Channels never copy items: ownership of a put item moves to whichever
//! consumer receives it.

mod core;
mod mailbox;
mod priority;

pub use self::core::{BoundedChannel, Message, Mode};
pub use mailbox::Mailbox;
pub use priority::PriorityChannel;
