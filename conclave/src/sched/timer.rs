use super::TaskId;

use std::cmp::Ordering;
use std::time::Instant;

/// A sleeping task in the scheduler's timer heap.
pub(crate) struct TimerEntry {
    /// When the task becomes ready again.
    pub(crate) deadline: Instant,

    /// The sleeping task.
    pub(crate) task: TaskId,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline.eq(&other.deadline) && self.task == other.task
    }
}

impl Ord for TimerEntry {
    /// Orders entries by deadline, then by task id.
    ///
    /// The comparison is **reversed** so that a `BinaryHeap<TimerEntry>`
    /// pops the earliest deadline first. Tasks sleeping until the same
    /// instant wake in spawn order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.task.cmp(&self.task))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
