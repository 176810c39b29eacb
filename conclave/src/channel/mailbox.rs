use super::{BoundedChannel, Mode};
use crate::error::SendError;

/// Anything that accepts messages.
///
/// `Mailbox` is the single capability shared by every message sink in the
/// crate: channels, actors and worker pools. Fan-out helpers such as
/// [`Exchange`](crate::exchange::Exchange) only depend on this trait.
pub trait Mailbox<M>: Send + Sync {
    /// Delivers `msg`, blocking while a bounded mailbox is full.
    fn send(&self, msg: M) -> Result<(), SendError<M>>;

    /// Delivers `msg` without blocking.
    ///
    /// Fails with [`SendError::Full`] if the mailbox is at capacity.
    fn try_send(&self, msg: M) -> Result<(), SendError<M>>;
}

impl<M: Send> Mailbox<M> for BoundedChannel<M> {
    fn send(&self, msg: M) -> Result<(), SendError<M>> {
        self.put(msg, Mode::Blocking).map_err(SendError::from)
    }

    fn try_send(&self, msg: M) -> Result<(), SendError<M>> {
        self.put(msg, Mode::NonBlocking).map_err(SendError::from)
    }
}
