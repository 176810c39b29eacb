use crate::channel::Mailbox;
use crate::error::SendError;

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Identity of a subscriber: the address of its shared allocation.
///
/// The exchange keeps a `Weak` to every subscriber, which pins the
/// allocation, so a key cannot be reused while it is present in the map.
fn key<M>(sub: &Arc<dyn Mailbox<M>>) -> usize {
    Arc::as_ptr(sub) as *const () as usize
}

/// Result of publishing one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delivery {
    /// Subscribers that accepted the message.
    pub delivered: usize,

    /// Subscribers whose mailbox was full or closed.
    pub dropped: usize,
}

/// A named publish/subscribe fan-out point.
///
/// Subscribers are held weakly: the exchange never keeps a subscriber
/// alive, and subscribers dropped by their owners are pruned on the next
/// [`send`](Self::send).
///
/// Delivery is best-effort and never blocks the publisher. A subscriber
/// whose mailbox is full or closed misses the message; misses are reported
/// per send and accumulated in [`dropped`](Self::dropped).
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
///
/// use conclave::channel::{BoundedChannel, Mailbox, Message, Mode};
/// use conclave::exchange::Exchange;
///
/// let exchange = Exchange::new("ticks");
/// let channel = BoundedChannel::<u32>::unbounded();
/// let sub: Arc<dyn Mailbox<u32>> = Arc::new(channel.clone());
///
/// let _subscription = exchange.subscribe(&[sub]);
/// exchange.send(1);
///
/// assert_eq!(channel.get(Mode::NonBlocking), Ok(Message::Payload(1)));
/// ```
pub struct Exchange<M> {
    name: String,

    /// Attached subscribers keyed by identity.
    subscribers: Mutex<HashMap<usize, Weak<dyn Mailbox<M>>>>,

    /// Messages dropped since creation.
    dropped: AtomicU64,
}

impl<M> Exchange<M> {
    /// Creates an exchange without subscribers.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscribers: Mutex::new(HashMap::new()),
            dropped: AtomicU64::new(0),
        }
    }

    /// Returns the exchange's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attaches `sub`.
    ///
    /// Returns `false` if it was already attached.
    pub fn attach(&self, sub: &Arc<dyn Mailbox<M>>) -> bool {
        self.subscribers
            .lock()
            .insert(key(sub), Arc::downgrade(sub))
            .is_none()
    }

    /// Detaches `sub`.
    ///
    /// Returns `false` if it was not attached.
    pub fn detach(&self, sub: &Arc<dyn Mailbox<M>>) -> bool {
        self.subscribers.lock().remove(&key(sub)).is_some()
    }

    /// Attaches every subscriber in `subs` for the lifetime of the
    /// returned guard.
    ///
    /// The subscribers are detached when the guard is dropped, including
    /// during unwinding.
    pub fn subscribe(&self, subs: &[Arc<dyn Mailbox<M>>]) -> Subscription<'_, M> {
        for sub in subs {
            self.attach(sub);
        }

        Subscription {
            exchange: self,
            subs: subs.to_vec(),
        }
    }

    /// Number of live attached subscribers.
    pub fn subscribers(&self) -> usize {
        self.subscribers
            .lock()
            .values()
            .filter(|sub| sub.strong_count() > 0)
            .count()
    }

    /// Total number of messages dropped because a subscriber's mailbox was
    /// full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Takes a snapshot of the live subscribers, pruning dead ones.
    fn snapshot(&self) -> Vec<Arc<dyn Mailbox<M>>> {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|_, sub| sub.strong_count() > 0);

        subscribers.values().filter_map(Weak::upgrade).collect()
    }
}

impl<M: Clone> Exchange<M> {
    /// Publishes `msg` to every subscriber attached at the time of the call.
    ///
    /// The subscriber set is snapshotted first, so subscribers may attach
    /// or detach concurrently. Delivery order is unspecified.
    pub fn send(&self, msg: M) -> Delivery {
        let mut delivery = Delivery::default();

        for sub in self.snapshot() {
            match sub.try_send(msg.clone()) {
                Ok(()) => delivery.delivered += 1,
                Err(err) => {
                    let reason = match err {
                        SendError::Full(_) => "full",
                        SendError::Closed(_) => "closed",
                    };

                    tracing::warn!(exchange = %self.name, reason, "message dropped");
                    delivery.dropped += 1;
                }
            }
        }

        if delivery.dropped > 0 {
            self.dropped
                .fetch_add(delivery.dropped as u64, Ordering::Relaxed);
        }

        delivery
    }
}

impl<M> fmt::Debug for Exchange<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("name", &self.name)
            .field("subscribers", &self.subscribers.lock().len())
            .field("dropped", &self.dropped())
            .finish()
    }
}

/// Scope guard returned by [`Exchange::subscribe`].
#[must_use = "subscribers are detached as soon as the subscription is dropped"]
pub struct Subscription<'a, M> {
    exchange: &'a Exchange<M>,
    subs: Vec<Arc<dyn Mailbox<M>>>,
}

impl<M> Drop for Subscription<'_, M> {
    fn drop(&mut self) {
        for sub in &self.subs {
            self.exchange.detach(sub);
        }
    }
}
