use super::poller::{self, Interest};
use super::sys::{sys_accept, sys_read, sys_write};
use super::timer::TimerEntry;
use super::{Context, Resume, Step, Suspend, Task, TaskId};
use crate::error::SchedulerError;
use crate::sync::deadline_after;

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::fmt;
use std::io;
use std::mem;
use std::os::fd::RawFd;
use std::time::{Duration, Instant};

/// A task waiting for its file descriptor to become readable.
enum ReadWait {
    Read { task: TaskId, max: usize },
    Accept { task: TaskId },
}

impl ReadWait {
    fn task(&self) -> TaskId {
        match self {
            ReadWait::Read { task, .. } | ReadWait::Accept { task } => *task,
        }
    }
}

/// A task waiting for its file descriptor to become writable.
struct WriteWait {
    task: TaskId,
    data: Vec<u8>,
}

/// A single-threaded cooperative scheduler.
///
/// `Scheduler` multiplexes many [`Task`]s on the calling thread. Tasks are
/// never preempted: a task runs until it returns a [`Step`], and the
/// scheduler then parks it according to its [`Suspend`] request.
///
/// It keeps:
/// - a FIFO queue of ready tasks, each with the value it is resumed with,
/// - one map of readers and one map of writers keyed by file descriptor,
/// - a timer heap of sleeping tasks.
///
/// When no task is ready, the scheduler blocks in `poll(2)` until a
/// descriptor is ready or the earliest timer expires, performs the pending
/// operation and makes the waiting task ready with its result.
///
/// File descriptors handed to the scheduler should be non-blocking.
pub struct Scheduler {
    /// Every live task not currently being resumed.
    tasks: HashMap<TaskId, Box<dyn Task>>,

    /// Tasks ready to run, oldest first.
    ready: VecDeque<(TaskId, Resume)>,

    readers: HashMap<RawFd, ReadWait>,
    writers: HashMap<RawFd, WriteWait>,

    /// Sleeping tasks, earliest deadline first.
    timers: BinaryHeap<TimerEntry>,

    /// Context lent to the task being resumed.
    cx: Context,
}

impl Scheduler {
    /// Creates a scheduler without tasks.
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            ready: VecDeque::new(),
            readers: HashMap::new(),
            writers: HashMap::new(),
            timers: BinaryHeap::new(),
            cx: Context::new(),
        }
    }

    /// Adds `task`; it is first resumed with [`Resume::Start`].
    pub fn spawn<T: Task + 'static>(&mut self, task: T) -> TaskId {
        let id = self.cx.next_id();
        self.admit(id, Box::new(task));
        id
    }

    /// Cancels task `id`, dropping it without resuming it.
    ///
    /// Returns `false` if no such task is alive.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        if self.tasks.remove(&id).is_none() {
            return false;
        }

        self.ready.retain(|(task, _)| *task != id);
        self.readers.retain(|_, wait| wait.task() != id);
        self.writers.retain(|_, wait| wait.task != id);

        // Stale timer entries are skipped when they fire.
        tracing::debug!(task = id, "task cancelled");
        true
    }

    /// Number of live tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` when no task is alive.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs tasks until none is left.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Protocol`] if a task suspends with a request
    ///   that cannot be honoured: a negative file descriptor, an empty
    ///   read, or a descriptor already awaited in the same direction,
    /// - [`SchedulerError::Poll`] if `poll(2)` itself fails.
    ///
    /// Both abort the run. A task whose request was rejected is dropped,
    /// cancellations it issued still apply, and the remaining tasks stay in
    /// the scheduler so `run` can be called again.
    pub fn run(&mut self) -> Result<(), SchedulerError> {
        while !self.tasks.is_empty() {
            self.fire_timers(Instant::now());

            if let Some((id, input)) = self.ready.pop_front() {
                self.resume(id, input)?;
                continue;
            }

            if !self.wait()? {
                tracing::warn!(tasks = self.tasks.len(), "no task can make progress");
                break;
            }
        }

        Ok(())
    }

    fn admit(&mut self, id: TaskId, task: Box<dyn Task>) {
        tracing::trace!(task = id, "task spawned");

        self.tasks.insert(id, task);
        self.ready.push_back((id, Resume::Start));
    }

    /// Resumes task `id` once and files it according to its step.
    fn resume(&mut self, id: TaskId, input: Resume) -> Result<(), SchedulerError> {
        let Some(mut task) = self.tasks.remove(&id) else {
            return Ok(());
        };

        self.cx.current = id;
        let step = task.resume(&mut self.cx, input);

        for (child, spawned) in mem::take(&mut self.cx.spawned) {
            self.admit(child, spawned);
        }

        let filed = match step {
            Step::Done => {
                tracing::trace!(task = id, "task completed");
                Ok(())
            }
            Step::Suspend(suspend) => {
                let filed = self.suspend(id, suspend);

                if filed.is_ok() {
                    self.tasks.insert(id, task);
                }

                filed
            }
        };

        for victim in mem::take(&mut self.cx.cancelled) {
            self.cancel(victim);
        }

        filed
    }

    fn suspend(&mut self, id: TaskId, suspend: Suspend) -> Result<(), SchedulerError> {
        match suspend {
            Suspend::Yield => self.ready.push_back((id, Resume::Resumed)),

            // A delay past the representable range never fires.
            Suspend::Sleep(delay) => {
                if let Some(deadline) = deadline_after(delay) {
                    self.timers.push(TimerEntry { deadline, task: id });
                }
            }

            Suspend::Read { fd, max } => {
                if max == 0 {
                    return Err(protocol(id, "read of zero bytes"));
                }

                self.wait_readable(id, fd, ReadWait::Read { task: id, max })?;
            }

            Suspend::Accept { fd } => {
                self.wait_readable(id, fd, ReadWait::Accept { task: id })?;
            }

            Suspend::Write { fd, data } => {
                if fd < 0 {
                    return Err(protocol(id, "negative file descriptor"));
                }

                if self.writers.contains_key(&fd) {
                    return Err(protocol(id, "file descriptor already has a writer"));
                }

                self.writers.insert(fd, WriteWait { task: id, data });
            }
        }

        Ok(())
    }

    fn wait_readable(&mut self, id: TaskId, fd: RawFd, wait: ReadWait) -> Result<(), SchedulerError> {
        if fd < 0 {
            return Err(protocol(id, "negative file descriptor"));
        }

        if self.readers.contains_key(&fd) {
            return Err(protocol(id, "file descriptor already has a reader"));
        }

        self.readers.insert(fd, wait);
        Ok(())
    }

    /// Makes ready every sleeping task whose deadline has passed.
    fn fire_timers(&mut self, now: Instant) {
        while self.timers.peek().is_some_and(|entry| entry.deadline <= now) {
            let Some(entry) = self.timers.pop() else {
                break;
            };

            if self.tasks.contains_key(&entry.task) {
                self.ready.push_back((entry.task, Resume::Resumed));
            }
        }
    }

    /// Time until the earliest live timer, if any.
    fn next_timeout(&mut self) -> Option<Duration> {
        while let Some(entry) = self.timers.peek() {
            if self.tasks.contains_key(&entry.task) {
                return Some(entry.deadline.saturating_duration_since(Instant::now()));
            }

            self.timers.pop();
        }

        None
    }

    /// Blocks until I/O or a timer makes progress possible.
    ///
    /// Returns `false` if nothing is awaited at all.
    fn wait(&mut self) -> Result<bool, SchedulerError> {
        let timeout = self.next_timeout();

        let mut interests: HashMap<RawFd, Interest> = HashMap::new();

        for &fd in self.readers.keys() {
            interests.entry(fd).or_default().read = true;
        }

        for &fd in self.writers.keys() {
            interests.entry(fd).or_default().write = true;
        }

        if interests.is_empty() && timeout.is_none() {
            return Ok(false);
        }

        let interests: Vec<_> = interests.into_iter().collect();

        for ready in poller::wait(&interests, timeout)? {
            if ready.readable {
                self.complete_read(ready.fd);
            }

            if ready.writable {
                self.complete_write(ready.fd);
            }
        }

        Ok(true)
    }

    fn complete_read(&mut self, fd: RawFd) {
        let Some(wait) = self.readers.remove(&fd) else {
            return;
        };

        let input = match &wait {
            ReadWait::Read { max, .. } => match sys_read(fd, *max) {
                Err(err) if would_block(&err) => None,
                read => Some(Resume::Read(read)),
            },
            ReadWait::Accept { .. } => match sys_accept(fd) {
                Err(err) if would_block(&err) => None,
                accepted => Some(Resume::Accepted(accepted)),
            },
        };

        match input {
            Some(input) => self.ready.push_back((wait.task(), input)),
            None => {
                self.readers.insert(fd, wait);
            }
        }
    }

    fn complete_write(&mut self, fd: RawFd) {
        let Some(wait) = self.writers.remove(&fd) else {
            return;
        };

        match sys_write(fd, &wait.data) {
            Err(err) if would_block(&err) => {
                self.writers.insert(fd, wait);
            }
            written => self.ready.push_back((wait.task, Resume::Written(written))),
        }
    }
}

/// Returns `true` for a spurious readiness report.
fn would_block(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
}

fn protocol(task: TaskId, reason: &'static str) -> SchedulerError {
    tracing::error!(task, reason, "scheduler protocol violation");
    SchedulerError::Protocol { task, reason }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.tasks.len())
            .field("ready", &self.ready.len())
            .field("readers", &self.readers.len())
            .field("writers", &self.writers.len())
            .field("timers", &self.timers.len())
            .finish()
    }
}
