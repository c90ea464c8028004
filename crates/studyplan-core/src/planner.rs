//! Regenerate-and-save flow tying the generator to the plan store.
//!
//! Loads the pending backlog, generates the timetable for the range, and
//! replaces whatever slots were stored for that range in one transaction.

use chrono::NaiveDate;

use crate::error::{Result, ValidationError};
use crate::scheduler::{self, GenerateOptions, OverflowHandler};
use crate::schedule::StoredSlot;
use crate::storage::PlanDb;

/// Regenerate and persist the timetable for `start..=end`.
///
/// Overflow is reported to `overflow` before anything is written.
///
/// # Errors
/// Returns a validation error for a reversed range, or a database error if
/// loading tasks or saving slots fails. Nothing is written on error.
pub fn regenerate<H>(
    db: &PlanDb,
    start: NaiveDate,
    end: NaiveDate,
    options: &GenerateOptions,
    overflow: &mut H,
) -> Result<Vec<StoredSlot>>
where
    H: OverflowHandler + ?Sized,
{
    if end < start {
        return Err(ValidationError::InvalidDateRange { start, end }.into());
    }

    let backlog = db.list_pending_tasks()?;
    tracing::debug!(pending = backlog.len(), "loaded backlog");

    let slots = scheduler::generate_with_overflow(&backlog, start, end, options, overflow)?;
    db.replace_slots_in_range(start, end, &slots)
}
