use super::deadline_after;

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// A one-shot broadcast notification.
///
/// An `Event` starts unset. [`set`](Self::set) flips it exactly once and
/// wakes every thread blocked in [`wait`](Self::wait); later waiters
/// return immediately. There is no way to reset it.
#[derive(Debug, Default)]
pub struct Event {
    flag: Mutex<bool>,
    condvar: Condvar,
}

impl Event {
    /// Creates an unset event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the event and wakes all waiters.
    ///
    /// Returns `false` if the event was already set.
    pub fn set(&self) -> bool {
        let mut flag = self.flag.lock();

        if *flag {
            return false;
        }

        *flag = true;
        self.condvar.notify_all();
        true
    }

    /// Returns `true` once the event has been set.
    pub fn is_set(&self) -> bool {
        *self.flag.lock()
    }

    /// Blocks until the event is set.
    pub fn wait(&self) {
        let mut flag = self.flag.lock();

        while !*flag {
            self.condvar.wait(&mut flag);
        }
    }

    /// Blocks until the event is set or `timeout` elapses.
    ///
    /// Returns `true` if the event was set. A timeout too large to be
    /// represented waits like [`wait`](Self::wait).
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = deadline_after(timeout) else {
            self.wait();
            return true;
        };

        let mut flag = self.flag.lock();

        while !*flag {
            if self.condvar.wait_until(&mut flag, deadline).timed_out() {
                return *flag;
            }
        }

        true
    }
}
