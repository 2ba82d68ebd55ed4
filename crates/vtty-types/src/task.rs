//! Task identifiers and lifecycle states.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

/// Task identifier. 0 is reserved and never assigned.
pub type TaskId = u32;

/// Lifecycle state of a task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Admitted, execution unit not yet spawned.
    Waiting,
    /// Execution unit spawned and running the command body.
    Running,
    /// Command body returned normally.
    Completed,
    /// Marked for removal; erased on the next tick.
    Deleted,
    /// Command body panicked or its execution unit could not be spawned.
    Deathed,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Running => "RUNNING",
            TaskState::Waiting => "WAITING",
            TaskState::Completed => "COMPLETED",
            TaskState::Deleted => "DELETED",
            TaskState::Deathed => "DEATHED",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic task-id source.
///
/// Clones share the same counter. Every scheduler built from
/// [`TaskIdCounter::process`] draws from one process-wide sequence; tests
/// build isolated counters with [`TaskIdCounter::new`].
#[derive(Debug, Clone, Default)]
pub struct TaskIdCounter {
    last: Arc<AtomicU32>,
}

impl TaskIdCounter {
    /// A fresh counter whose first id is 1.
    pub fn new() -> Self {
        Self::starting_after(0)
    }

    /// A fresh counter whose first id is `last + 1` (skipping 0).
    pub fn starting_after(last: TaskId) -> Self {
        Self {
            last: Arc::new(AtomicU32::new(last)),
        }
    }

    /// The counter shared by the whole process.
    pub fn process() -> Self {
        static PROCESS: OnceLock<TaskIdCounter> = OnceLock::new();
        PROCESS.get_or_init(TaskIdCounter::new).clone()
    }

    /// Allocate the next id, never returning 0.
    pub fn next_id(&self) -> TaskId {
        loop {
            let id = self.last.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            if id != 0 {
                return id;
            }
        }
    }
}

/// Parse a base-10 task id.
///
/// Rejects empty input, any non-digit character (signs and whitespace
/// included), overflow, and the reserved id 0.
pub fn parse_task_id(s: &str) -> Option<TaskId> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match s.parse::<TaskId>() {
        Ok(0) | Err(_) => None,
        Ok(id) => Some(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one() {
        let ids = TaskIdCounter::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
    }

    #[test]
    fn wraparound_skips_zero() {
        let ids = TaskIdCounter::starting_after(u32::MAX - 1);
        assert_eq!(ids.next_id(), u32::MAX);
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
    }

    #[test]
    fn clones_share_the_sequence() {
        let a = TaskIdCounter::new();
        let b = a.clone();
        assert_eq!(a.next_id(), 1);
        assert_eq!(b.next_id(), 2);
        assert_eq!(a.next_id(), 3);
    }

    #[test]
    fn process_counter_is_shared() {
        let a = TaskIdCounter::process();
        let b = TaskIdCounter::process();
        let first = a.next_id();
        let second = b.next_id();
        assert_ne!(first, second);
    }

    #[test]
    fn parse_accepts_plain_digits() {
        assert_eq!(parse_task_id("1"), Some(1));
        assert_eq!(parse_task_id("0042"), Some(42));
        assert_eq!(parse_task_id("4294967295"), Some(u32::MAX));
    }

    #[test]
    fn parse_rejects_non_digits() {
        assert_eq!(parse_task_id(""), None);
        assert_eq!(parse_task_id("+1"), None);
        assert_eq!(parse_task_id("-1"), None);
        assert_eq!(parse_task_id(" 1"), None);
        assert_eq!(parse_task_id("1a"), None);
        assert_eq!(parse_task_id("١"), None);
    }

    #[test]
    fn parse_rejects_zero_and_overflow() {
        assert_eq!(parse_task_id("0"), None);
        assert_eq!(parse_task_id("4294967296"), None);
    }

    #[test]
    fn state_names() {
        assert_eq!(TaskState::Running.to_string(), "RUNNING");
        assert_eq!(TaskState::Deathed.to_string(), "DEATHED");
    }
}
