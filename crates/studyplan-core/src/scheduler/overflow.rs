//! Overflow policies for hours that do not fit in the requested range.
//!
//! The generator never carries hours over between calls. Whatever is still
//! queued when the last slot of the range is filled is reported here and then
//! dropped from the timetable.

use serde::{Deserialize, Serialize};

use super::QueuedTask;

/// Hours of one task that the range could not hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overflow {
    pub task_id: String,
    /// Hours left unplaced.
    pub remaining_hours: i64,
    /// Whether the task received at least one slot before the range ended.
    pub started: bool,
}

impl Overflow {
    pub(crate) fn from_queued(task: &QueuedTask) -> Self {
        Self {
            task_id: task.id.clone(),
            remaining_hours: task.remaining_hours,
            started: task.remaining_hours < task.duration_hours,
        }
    }
}

/// Receives each task left over at the end of a generation call.
pub trait OverflowHandler {
    fn on_overflow(&mut self, overflow: Overflow);
}

/// Default policy: drop overflow without a trace in the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct Truncate;

impl OverflowHandler for Truncate {
    fn on_overflow(&mut self, _overflow: Overflow) {}
}

/// Records overflow so callers can surface a partial-completion warning.
#[derive(Debug, Clone, Default)]
pub struct CollectOverflow {
    overflows: Vec<Overflow>,
}

impl CollectOverflow {
    pub fn overflows(&self) -> &[Overflow] {
        &self.overflows
    }

    pub fn is_empty(&self) -> bool {
        self.overflows.is_empty()
    }

    /// Total unplaced hours across all reported tasks.
    pub fn total_hours(&self) -> i64 {
        self.overflows.iter().map(|o| o.remaining_hours).sum()
    }

    pub fn into_inner(self) -> Vec<Overflow> {
        self.overflows
    }
}

impl OverflowHandler for CollectOverflow {
    fn on_overflow(&mut self, overflow: Overflow) {
        self.overflows.push(overflow);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queued(id: &str, duration: i64, remaining: i64) -> QueuedTask {
        QueuedTask {
            id: id.to_string(),
            due_date: None,
            duration_hours: duration,
            remaining_hours: remaining,
        }
    }

    #[test]
    fn started_reflects_consumed_hours() {
        assert!(Overflow::from_queued(&queued("a", 5, 2)).started);
        assert!(!Overflow::from_queued(&queued("b", 5, 5)).started);
    }

    #[test]
    fn collector_sums_remaining_hours() {
        let mut collect = CollectOverflow::default();
        collect.on_overflow(Overflow::from_queued(&queued("a", 5, 2)));
        collect.on_overflow(Overflow::from_queued(&queued("b", 3, 3)));

        assert_eq!(collect.total_hours(), 5);
        assert_eq!(collect.into_inner().len(), 2);
    }

    #[test]
    fn truncate_ignores_overflow() {
        let mut truncate = Truncate;
        truncate.on_overflow(Overflow::from_queued(&queued("x", 1, 1)));
    }
}
