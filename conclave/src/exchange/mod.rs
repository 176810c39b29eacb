//! Publish/subscribe fan-out.
//!
//! An [`Exchange`] forwards every published message to the mailboxes
//! currently attached to it; an [`ExchangeRegistry`] maps names to
//! exchanges. Any [`Mailbox`](crate::channel::Mailbox) can subscribe:
//! channels, actors (through
//! [`ActorRef::as_mailbox`](crate::actor::ActorRef::as_mailbox)) or custom
//! sinks.

mod core;
mod registry;

pub use self::core::{Delivery, Exchange, Subscription};
pub use registry::ExchangeRegistry;
