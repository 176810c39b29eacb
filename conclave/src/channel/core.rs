use crate::error::{GetError, PutError, TaskDoneError};
use crate::sync::deadline_after;

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// An element travelling through a [`BoundedChannel`].
///
/// `Close` is the shutdown sentinel. It is a distinct variant so that no
/// payload value can ever be mistaken for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<T> {
    /// Regular application data.
    Payload(T),

    /// Shutdown request.
    Close,
}

impl<T> Message<T> {
    /// Returns the payload, or `None` for the sentinel.
    pub fn into_payload(self) -> Option<T> {
        match self {
            Message::Payload(item) => Some(item),
            Message::Close => None,
        }
    }

    /// Returns `true` for the shutdown sentinel.
    pub fn is_close(&self) -> bool {
        matches!(self, Message::Close)
    }
}

/// How a channel operation behaves when it cannot complete immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Wait as long as necessary.
    Blocking,

    /// Fail at once.
    NonBlocking,

    /// Wait up to the given duration, then fail.
    ///
    /// A duration too large to be represented behaves like `Blocking`.
    Timeout(Duration),
}

impl Mode {
    pub(crate) fn deadline(self) -> Option<Instant> {
        match self {
            Mode::Timeout(d) => deadline_after(d),
            _ => None,
        }
    }
}

/// State protected by the channel mutex.
struct State<T> {
    /// Pending messages, oldest first.
    queue: VecDeque<Message<T>>,

    /// Maximum queue length, `0` meaning unbounded.
    capacity: usize,

    /// Payloads put but not yet acknowledged with `task_done`.
    unfinished: usize,

    /// A `Close` has been enqueued; further puts are refused.
    closing: bool,

    /// A consumer has dequeued the `Close` sentinel.
    closed: bool,
}

impl<T> State<T> {
    fn is_full(&self) -> bool {
        self.capacity > 0 && self.queue.len() >= self.capacity
    }
}

struct Shared<T> {
    state: Mutex<State<T>>,

    /// Signalled when an item is enqueued or the channel closes.
    not_empty: Condvar,

    /// Signalled when an item is dequeued.
    not_full: Condvar,

    /// Signalled when `unfinished` drops to zero.
    all_done: Condvar,
}

/// A thread-safe FIFO channel with an optional capacity bound.
///
/// `BoundedChannel` is the transport used by actors and worker pools. It is
/// a multi-producer, multi-consumer queue: cloning the channel yields
/// another handle to the same queue.
///
/// # Shutdown
///
/// [`close`](Self::close) enqueues a [`Message::Close`] behind any pending
/// payloads. When a consumer dequeues it, the channel latches closed and
/// every subsequent [`get`](Self::get) returns `Message::Close` as soon as
/// the queue is drained. Each consumer loop therefore observes shutdown once,
/// no consumer stays blocked and no sentinel is left behind.
///
/// # Examples
///
/// ```rust
/// use conclave::channel::{BoundedChannel, Message, Mode};
///
/// let channel = BoundedChannel::bounded(2);
///
/// channel.put(1, Mode::NonBlocking).unwrap();
/// channel.put(2, Mode::NonBlocking).unwrap();
/// assert!(channel.put(3, Mode::NonBlocking).unwrap_err().is_full());
///
/// assert_eq!(channel.get(Mode::Blocking), Ok(Message::Payload(1)));
/// ```
pub struct BoundedChannel<T> {
    shared: Arc<Shared<T>>,
}

impl<T> BoundedChannel<T> {
    /// Creates a channel holding at most `capacity` messages.
    ///
    /// A capacity of `0` creates an unbounded channel.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    capacity,
                    unfinished: 0,
                    closing: false,
                    closed: false,
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
                all_done: Condvar::new(),
            }),
        }
    }

    /// Creates a channel without a capacity bound.
    pub fn unbounded() -> Self {
        Self::bounded(0)
    }

    /// Enqueues `item` according to `mode`.
    ///
    /// # Errors
    ///
    /// - [`PutError::Full`] if the channel stayed at capacity (non-blocking
    ///   and timeout modes only),
    /// - [`PutError::Closed`] if [`close`](Self::close) has been called.
    ///
    /// In both cases the item is handed back inside the error.
    pub fn put(&self, item: T, mode: Mode) -> Result<(), PutError<T>> {
        self.push(item, mode, Message::Payload)
    }

    /// Enqueues an arbitrary message, including the `Close` sentinel.
    ///
    /// Sending `Message::Close` is equivalent to [`close`](Self::close)
    /// with an explicit mode.
    pub fn send(&self, message: Message<T>, mode: Mode) -> Result<(), PutError<Message<T>>> {
        self.push(message, mode, |message| message)
    }

    fn push<U>(
        &self,
        value: U,
        mode: Mode,
        wrap: impl FnOnce(U) -> Message<T>,
    ) -> Result<(), PutError<U>> {
        let deadline = mode.deadline();
        let mut state = self.shared.state.lock();
        let mut expired = false;

        loop {
            if state.closing {
                return Err(PutError::Closed(value));
            }

            if !state.is_full() {
                break;
            }

            if expired {
                return Err(PutError::Full(value));
            }

            expired = !park(&self.shared.not_full, &mut state, mode, deadline);
        }

        let message = wrap(value);

        match message {
            Message::Payload(_) => state.unfinished += 1,
            Message::Close => state.closing = true,
        }

        state.queue.push_back(message);
        self.shared.not_empty.notify_one();

        Ok(())
    }

    /// Dequeues the oldest message according to `mode`.
    ///
    /// Returns `Message::Close` once the channel has been closed and
    /// drained; see the type-level documentation.
    ///
    /// # Errors
    ///
    /// [`GetError::Empty`] if nothing became available (non-blocking and
    /// timeout modes only).
    pub fn get(&self, mode: Mode) -> Result<Message<T>, GetError> {
        let deadline = mode.deadline();
        let mut state = self.shared.state.lock();
        let mut expired = false;

        loop {
            if let Some(message) = state.queue.pop_front() {
                if message.is_close() {
                    state.closed = true;
                    tracing::trace!("channel closed");

                    self.shared.not_empty.notify_all();
                    self.shared.not_full.notify_all();
                } else {
                    self.shared.not_full.notify_one();
                }

                return Ok(message);
            }

            if state.closed {
                return Ok(Message::Close);
            }

            if expired {
                return Err(GetError::Empty);
            }

            expired = !park(&self.shared.not_empty, &mut state, mode, deadline);
        }
    }

    /// Requests shutdown by enqueuing the `Close` sentinel.
    ///
    /// Blocks while the channel is full, like a blocking [`put`](Self::put).
    /// Closing twice is a no-op.
    pub fn close(&self) {
        let _ = self.send(Message::Close, Mode::Blocking);
    }

    /// Latches the channel closed whatever its fill level.
    ///
    /// Unlike [`close`](Self::close) no sentinel is queued: puts are refused
    /// at once, producers parked on a full channel return
    /// [`PutError::Closed`], and consumers see `Message::Close` after the
    /// pending messages.
    pub(crate) fn shutdown(&self) {
        let mut state = self.shared.state.lock();

        state.closing = true;
        state.closed = true;

        self.shared.not_empty.notify_all();
        self.shared.not_full.notify_all();
    }

    /// Acknowledges that a previously received payload has been processed.
    ///
    /// # Errors
    ///
    /// [`TaskDoneError`] if called more times than payloads were put.
    pub fn task_done(&self) -> Result<(), TaskDoneError> {
        let mut state = self.shared.state.lock();

        if state.unfinished == 0 {
            return Err(TaskDoneError);
        }

        state.unfinished -= 1;

        if state.unfinished == 0 {
            self.shared.all_done.notify_all();
        }

        Ok(())
    }

    /// Blocks until every payload put so far has been acknowledged with
    /// [`task_done`](Self::task_done).
    pub fn join(&self) {
        let mut state = self.shared.state.lock();

        while state.unfinished > 0 {
            self.shared.all_done.wait(&mut state);
        }
    }

    /// Like [`join`](Self::join) but gives up after `timeout`.
    ///
    /// Returns `true` if all work was acknowledged.
    pub fn join_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = deadline_after(timeout) else {
            self.join();
            return true;
        };

        let mut state = self.shared.state.lock();

        while state.unfinished > 0 {
            if self
                .shared
                .all_done
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.unfinished == 0;
            }
        }

        true
    }

    /// Number of queued messages, sentinel included.
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Returns `true` if no message is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Capacity bound, `0` meaning unbounded.
    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Returns `true` once [`close`](Self::close) has been requested.
    pub fn is_closed(&self) -> bool {
        self.lock().closing
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.shared.state.lock()
    }
}

/// Waits on `condvar` as allowed by `mode`.
///
/// Returns `false` when the caller must stop waiting: immediately for
/// [`Mode::NonBlocking`], or once the deadline has passed.
fn park<T>(
    condvar: &Condvar,
    state: &mut MutexGuard<'_, State<T>>,
    mode: Mode,
    deadline: Option<Instant>,
) -> bool {
    match (mode, deadline) {
        (Mode::NonBlocking, _) => false,
        (_, Some(deadline)) => !condvar.wait_until(state, deadline).timed_out(),
        (_, None) => {
            condvar.wait(state);
            true
        }
    }
}

impl<T> Clone for BoundedChannel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for BoundedChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();

        f.debug_struct("BoundedChannel")
            .field("len", &state.queue.len())
            .field("capacity", &state.capacity)
            .field("closed", &state.closing)
            .finish()
    }
}
