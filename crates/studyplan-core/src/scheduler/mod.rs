//! Timetable generator for study slots.
//!
//! This module turns a task backlog and an inclusive date range into a flat,
//! ordered list of one-hour slots:
//! - Every day in the range gets twelve slots covering the 08:00-20:00 work window
//! - Tasks are ordered by due date, then by duration (shorter first)
//! - The head task fills consecutive slots until its hours run out; tasks are
//!   never interleaved
//! - Hours that do not fit before the range ends are handed to an
//!   [`OverflowHandler`] and dropped from the timetable
//!
//! Slot times are naive wall-clock hours carried as UTC instants.

pub mod overflow;

use std::cmp::Ordering;
use std::collections::VecDeque;

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::schedule::{Slot, SlotStatus, Task};

pub use overflow::{CollectOverflow, Overflow, OverflowHandler, Truncate};

/// First hour of the daily work window.
pub const WORK_DAY_START_HOUR: u32 = 8;
/// Hour at which the daily work window closes (exclusive).
pub const WORK_DAY_END_HOUR: u32 = 20;
/// Number of one-hour slots generated per day.
pub const SLOTS_PER_DAY: usize = (WORK_DAY_END_HOUR - WORK_DAY_START_HOUR) as usize;

/// Per-call generation options.
///
/// Reserved for per-user working-hour preferences. The generator accepts the
/// options but does not read them yet; the work window is fixed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateOptions {
    #[serde(default)]
    pub preferred_start_hour: Option<u32>,
    #[serde(default)]
    pub preferred_end_hour: Option<u32>,
}

/// A task copied into the generator's queue.
///
/// Normalization happens once here: a missing or non-positive duration
/// becomes one hour, and both the ordering and the assignment loop read
/// `duration_hours` from this copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTask {
    pub id: String,
    pub due_date: Option<NaiveDate>,
    pub duration_hours: i64,
    pub remaining_hours: i64,
}

impl QueuedTask {
    pub fn from_task(task: &Task) -> Self {
        let duration_hours = normalized_duration(task.estimated_duration_hours);
        Self {
            id: task.id.clone(),
            due_date: task.due_date,
            duration_hours,
            remaining_hours: duration_hours,
        }
    }

    /// Due date used for ordering; undated tasks sort last.
    fn sort_due_date(&self) -> NaiveDate {
        self.due_date.unwrap_or(NaiveDate::MAX)
    }
}

/// Duration in hours after applying the one-hour default.
pub fn normalized_duration(estimated_hours: Option<i64>) -> i64 {
    match estimated_hours {
        Some(h) if h > 0 => h,
        _ => 1,
    }
}

/// Queue ordering: due date ascending, then duration ascending.
fn compare_queued(a: &QueuedTask, b: &QueuedTask) -> Ordering {
    a.sort_due_date()
        .cmp(&b.sort_due_date())
        .then(a.duration_hours.cmp(&b.duration_hours))
}

/// Copy, normalize and order the backlog.
fn build_queue(tasks: &[Task]) -> VecDeque<QueuedTask> {
    let mut queued: Vec<QueuedTask> = tasks.iter().map(QueuedTask::from_task).collect();
    queued.sort_by(compare_queued);
    queued.into()
}

/// Take one hour from the head of the queue.
///
/// Returns the id of the task that receives the slot, or `None` once the
/// queue is exhausted.
fn take_hour(queue: &mut VecDeque<QueuedTask>) -> Option<String> {
    while let Some(head) = queue.front_mut() {
        if head.remaining_hours > 0 {
            head.remaining_hours -= 1;
            let id = head.id.clone();
            if head.remaining_hours == 0 {
                queue.pop_front();
            }
            return Some(id);
        }
        // unreachable after normalization
        queue.pop_front();
    }
    None
}

/// Generate the timetable for `start..=end`, truncating overflow silently.
///
/// # Errors
/// Returns [`ValidationError::InvalidDateRange`] when `end` is before `start`.
pub fn generate(
    tasks: &[Task],
    start: NaiveDate,
    end: NaiveDate,
    options: &GenerateOptions,
) -> Result<Vec<Slot>, ValidationError> {
    generate_with_overflow(tasks, start, end, options, &mut Truncate)
}

/// Generate the timetable for `start..=end`, reporting unplaced hours.
///
/// Every task still queued when the range ends is passed to `overflow` once,
/// in queue order. The handler observes the overflow; it cannot change the
/// returned slots.
///
/// # Errors
/// Returns [`ValidationError::InvalidDateRange`] when `end` is before `start`.
pub fn generate_with_overflow<H>(
    tasks: &[Task],
    start: NaiveDate,
    end: NaiveDate,
    _options: &GenerateOptions,
    overflow: &mut H,
) -> Result<Vec<Slot>, ValidationError>
where
    H: OverflowHandler + ?Sized,
{
    if end < start {
        return Err(ValidationError::InvalidDateRange { start, end });
    }

    let mut queue = build_queue(tasks);
    let days = (end - start).num_days() as usize + 1;
    let mut slots = Vec::with_capacity(days * SLOTS_PER_DAY);

    for day in start.iter_days().take(days) {
        let midnight = day.and_time(NaiveTime::MIN).and_utc();

        for hour in WORK_DAY_START_HOUR..WORK_DAY_END_HOUR {
            let slot_start = midnight + Duration::hours(i64::from(hour));
            let task = take_hour(&mut queue);
            let status = if task.is_some() {
                SlotStatus::Scheduled
            } else {
                SlotStatus::Free
            };

            slots.push(Slot {
                start: slot_start,
                end: slot_start + Duration::hours(1),
                task,
                status,
            });
        }
    }

    let mut dropped_hours = 0;
    for leftover in queue {
        dropped_hours += leftover.remaining_hours.max(0);
        overflow.on_overflow(Overflow::from_queued(&leftover));
    }

    tracing::debug!(
        tasks = tasks.len(),
        days,
        slots = slots.len(),
        dropped_hours,
        "generated timetable {start}..={end}"
    );

    Ok(slots)
}

/// Slots whose start falls on `date`, between 00:00:00.000 and 23:59:59.999.
///
/// Pure filter over an already generated list; order is preserved.
pub fn slots_for_day(all_slots: &[Slot], date: NaiveDate) -> Vec<Slot> {
    all_slots
        .iter()
        .filter(|s| s.starts_on(date))
        .cloned()
        .collect()
}
