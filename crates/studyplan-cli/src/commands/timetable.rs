//! Timetable commands: generate, inspect, and update study slots.

use chrono::{Days, Local, NaiveDate};
use clap::Subcommand;
use studyplan_core::planner;
use studyplan_core::{
    generate_with_overflow, parse_date, slots_for_day, CollectOverflow, Config,
    GenerateOptions, OverflowHandler, PlanDb, SlotStatus, SlotUpdate, Truncate, ValidationError,
};

#[derive(Subcommand)]
pub enum TimetableAction {
    /// Generate and save the timetable, replacing slots in the range
    Generate {
        /// First day (YYYY-MM-DD, default: today)
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,
        /// Last day, inclusive (default: timetable.default_range_days from start)
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,
    },
    /// Generate without saving
    Preview {
        /// First day (YYYY-MM-DD, default: today)
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,
        /// Last day, inclusive (default: timetable.default_range_days from start)
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,
        /// Only print slots of this day
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Show saved slots of one day
    Day {
        /// Day to show (YYYY-MM-DD, default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Change a slot's status or assigned task
    Update {
        /// Slot ID
        id: String,
        /// New status: free, scheduled or done
        #[arg(long)]
        status: Option<SlotStatus>,
        /// Assign this task ID
        #[arg(long, conflicts_with = "clear_task")]
        task: Option<String>,
        /// Remove the assigned task
        #[arg(long)]
        clear_task: bool,
    },
    /// Mark a slot as done
    Done {
        /// Slot ID
        id: String,
    },
}

/// Resolve the range from optional arguments and the configured default length.
fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    config: &Config,
) -> Result<(NaiveDate, NaiveDate), ValidationError> {
    let start = start.unwrap_or_else(|| Local::now().date_naive());
    let end = match end {
        Some(end) => end,
        None => {
            let span = u64::from(config.timetable.default_range_days.max(1)) - 1;
            start
                .checked_add_days(Days::new(span))
                .ok_or_else(|| ValidationError::InvalidValue {
                    field: "timetable.default_range_days".to_string(),
                    message: format!("range of {span} day(s) from {start} is out of bounds"),
                })?
        }
    };
    Ok((start, end))
}

/// Log and summarize overflow collected during generation.
fn report_overflow(overflow: &CollectOverflow) {
    if overflow.is_empty() {
        return;
    }
    for o in overflow.overflows() {
        tracing::warn!(
            task = %o.task_id,
            hours = o.remaining_hours,
            started = o.started,
            "task did not fit in the range"
        );
    }
    eprintln!(
        "warning: {} hour(s) across {} task(s) did not fit in the range",
        overflow.total_hours(),
        overflow.overflows().len()
    );
}

pub fn run(action: TimetableAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimetableAction::Generate { start, end } => {
            let (start, end) = resolve_range(start, end, config)?;
            let db = PlanDb::open()?;
            let mut overflow = CollectOverflow::default();
            let mut truncate = Truncate;
            let handler: &mut dyn OverflowHandler = if config.timetable.report_overflow {
                &mut overflow
            } else {
                &mut truncate
            };

            let created =
                planner::regenerate(&db, start, end, &GenerateOptions::default(), handler)?;
            report_overflow(&overflow);
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
        TimetableAction::Preview { start, end, date } => {
            let (start, end) = resolve_range(start, end, config)?;
            let db = PlanDb::open()?;
            let backlog = db.list_pending_tasks()?;
            let mut overflow = CollectOverflow::default();

            let slots = generate_with_overflow(
                &backlog,
                start,
                end,
                &GenerateOptions::default(),
                &mut overflow,
            )?;
            if config.timetable.report_overflow {
                report_overflow(&overflow);
            }

            let shown = match date {
                Some(day) => slots_for_day(&slots, day),
                None => slots,
            };
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        TimetableAction::Day { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let db = PlanDb::open()?;
            let slots = db.list_slots_for_day(date)?;
            println!("{}", serde_json::to_string_pretty(&slots)?);
        }
        TimetableAction::Update {
            id,
            status,
            task,
            clear_task,
        } => {
            let task = if clear_task { Some(None) } else { task.map(Some) };
            if status.is_none() && task.is_none() {
                return Err("nothing to update: pass --status, --task or --clear-task".into());
            }

            let db = PlanDb::open()?;
            let updated = db.update_slot(&id, &SlotUpdate { status, task })?;
            println!("Slot updated:");
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        TimetableAction::Done { id } => {
            let db = PlanDb::open()?;
            let updated = db.mark_slot_done(&id)?;
            println!("Slot marked done:");
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
    }
    Ok(())
}
