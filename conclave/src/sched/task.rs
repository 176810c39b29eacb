use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::os::fd::{OwnedFd, RawFd};
use std::time::Duration;

/// Identifier of a scheduler task.
///
/// Ids are never reused within a scheduler.
pub type TaskId = u64;

/// Why a task gives control back to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suspend {
    /// Reschedule behind every other ready task.
    Yield,

    /// Read at most `max` bytes once `fd` is readable.
    Read { fd: RawFd, max: usize },

    /// Write `data` once `fd` is writable.
    Write { fd: RawFd, data: Vec<u8> },

    /// Accept a connection once the listening socket `fd` is readable.
    Accept { fd: RawFd },

    /// Resume after the given delay.
    Sleep(Duration),
}

/// What a task is resumed with.
#[derive(Debug)]
pub enum Resume {
    /// First resumption.
    Start,

    /// After [`Suspend::Yield`] or [`Suspend::Sleep`].
    Resumed,

    /// Bytes read after [`Suspend::Read`]; empty at end of stream.
    Read(io::Result<Vec<u8>>),

    /// Number of bytes written after [`Suspend::Write`].
    Written(io::Result<usize>),

    /// Accepted connection after [`Suspend::Accept`].
    ///
    /// The socket is non-blocking and owned by the task.
    Accepted(io::Result<(OwnedFd, SocketAddr)>),
}

/// Outcome of a single resumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The task waits for the given condition.
    Suspend(Suspend),

    /// The task has finished and can be dropped.
    Done,
}

/// A resumable state machine.
///
/// A task runs until it returns a [`Step`]; between two resumptions it
/// holds no thread, only its own state. Code between suspension points
/// runs without interruption from other tasks.
///
/// Closures with the matching signature are tasks:
///
/// ```rust
/// use conclave::sched::{Context, Resume, Scheduler, Step, Suspend};
///
/// let mut ticks = 0;
/// let mut scheduler = Scheduler::new();
///
/// scheduler.spawn(move |_: &mut Context, _: Resume| {
///     ticks += 1;
///
///     if ticks < 3 {
///         Step::Suspend(Suspend::Yield)
///     } else {
///         Step::Done
///     }
/// });
///
/// scheduler.run().unwrap();
/// ```
pub trait Task {
    /// Advances the task with the result of its last suspension.
    fn resume(&mut self, cx: &mut Context, input: Resume) -> Step;
}

impl<F> Task for F
where
    F: FnMut(&mut Context, Resume) -> Step,
{
    fn resume(&mut self, cx: &mut Context, input: Resume) -> Step {
        self(cx, input)
    }
}

/// Scheduler services available to a running task.
///
/// Spawns and cancellations requested through the context take effect as
/// soon as the current resumption returns.
pub struct Context {
    /// Task currently being resumed.
    pub(crate) current: TaskId,

    /// Next id to hand out.
    pub(crate) next_id: TaskId,

    /// Tasks spawned during the current resumption.
    pub(crate) spawned: Vec<(TaskId, Box<dyn Task>)>,

    /// Tasks cancelled during the current resumption.
    pub(crate) cancelled: Vec<TaskId>,
}

impl Context {
    pub(crate) fn new() -> Self {
        Self {
            current: 0,
            next_id: 1,
            spawned: Vec::new(),
            cancelled: Vec::new(),
        }
    }

    pub(crate) fn next_id(&mut self) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Id of the running task.
    pub fn id(&self) -> TaskId {
        self.current
    }

    /// Spawns `task`; it is resumed with [`Resume::Start`] after every
    /// task already ready.
    pub fn spawn<T: Task + 'static>(&mut self, task: T) -> TaskId {
        let id = self.next_id();
        self.spawned.push((id, Box::new(task)));
        id
    }

    /// Cancels task `id`.
    ///
    /// The task is dropped without being resumed again. A task may cancel
    /// itself, in which case it ends after the current resumption whatever
    /// step it returns.
    pub fn cancel(&mut self, id: TaskId) {
        self.cancelled.push(id);
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("current", &self.current)
            .field("spawned", &self.spawned.len())
            .field("cancelled", &self.cancelled)
            .finish()
    }
}
