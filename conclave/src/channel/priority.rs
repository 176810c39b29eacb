use super::Mode;
use crate::error::GetError;

use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

/// A heap entry.
///
/// Ordered by priority first, then by insertion sequence reversed so that
/// equal priorities leave the heap in FIFO order.
struct Entry<T> {
    priority: i64,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Inner<T> {
    heap: BinaryHeap<Entry<T>>,
    next_seq: u64,
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    condvar: Condvar,
}

/// An unbounded channel that delivers the highest priority item first.
///
/// Items sharing a priority are delivered in insertion order. `put` never
/// blocks; `get` honours the same [`Mode`]s as
/// [`BoundedChannel::get`](super::BoundedChannel::get).
pub struct PriorityChannel<T> {
    shared: Arc<Shared<T>>,
}

impl<T> PriorityChannel<T> {
    /// Creates an empty priority channel.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    heap: BinaryHeap::new(),
                    next_seq: 0,
                }),
                condvar: Condvar::new(),
            }),
        }
    }

    /// Enqueues `item` with the given priority. Higher values come out first.
    pub fn put(&self, item: T, priority: i64) {
        let mut inner = self.shared.inner.lock();

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.heap.push(Entry {
            priority,
            seq,
            item,
        });

        self.shared.condvar.notify_one();
    }

    /// Dequeues the highest priority item.
    ///
    /// # Errors
    ///
    /// [`GetError::Empty`] if nothing became available (non-blocking and
    /// timeout modes only).
    pub fn get(&self, mode: Mode) -> Result<T, GetError> {
        let deadline = mode.deadline();

        let mut inner = self.shared.inner.lock();

        loop {
            if let Some(entry) = inner.heap.pop() {
                return Ok(entry.item);
            }

            match (mode, deadline) {
                (Mode::NonBlocking, _) => return Err(GetError::Empty),
                (_, Some(deadline)) => {
                    if self
                        .shared
                        .condvar
                        .wait_until(&mut inner, deadline)
                        .timed_out()
                    {
                        return inner.heap.pop().map(|e| e.item).ok_or(GetError::Empty);
                    }
                }
                (_, None) => self.shared.condvar.wait(&mut inner),
            }
        }
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.shared.inner.lock().heap.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for PriorityChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for PriorityChannel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}
