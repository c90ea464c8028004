//! # Studyplan Core Library
//!
//! This library provides the core logic for Studyplan, a study-planning tool
//! that turns a backlog of subject tasks into an hour-by-hour timetable.
//! All operations are available through the `studyplan` CLI, which is a thin
//! layer over this crate.
//!
//! ## Architecture
//!
//! - **Scheduler**: a pure timetable generator. Given tasks and an inclusive
//!   date range it returns twelve one-hour slots per day (08:00-20:00), packing
//!   tasks greedily by due date
//! - **Storage**: SQLite-backed subjects, tasks, notes, and persisted slots, plus
//!   TOML-based configuration
//! - **Planner**: loads the pending backlog, generates, and atomically replaces
//!   the stored slots for a range
//!
//! ## Key Components
//!
//! - [`generate`]: timetable generation
//! - [`slots_for_day`]: day filter over generated slots
//! - [`PlanDb`]: subject, task, note, and slot persistence
//! - [`Config`]: application configuration management

pub mod error;
pub mod planner;
pub mod schedule;
pub mod scheduler;
pub mod storage;

pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use schedule::{parse_date, Note, Slot, SlotStatus, SlotUpdate, StoredSlot, Subject, Task};
pub use scheduler::{
    generate, generate_with_overflow, slots_for_day, CollectOverflow, GenerateOptions, Overflow,
    OverflowHandler, Truncate,
};
pub use storage::{Config, PlanDb};
