//! Schedule types for subjects, tasks, and timetable slots.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A subject groups related study tasks (e.g. "Linear Algebra").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subject {
    pub id: String,
    pub title: String,
    /// Display color as a hex string.
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// A study task in the backlog.
///
/// `due_date` and `estimated_duration_hours` are optional on purpose: the
/// generator treats a missing due date as "due last" and a missing or
/// non-positive duration as one hour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_duration_hours: Option<i64>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a pending task with no subject.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        due_date: Option<NaiveDate>,
        estimated_duration_hours: Option<i64>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subject_id: None,
            due_date,
            estimated_duration_hours,
            completed: false,
            created_at: Utc::now(),
        }
    }
}

/// A free-form study note, optionally filed under a subject.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle status of a timetable slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    /// No task assigned
    Free,
    /// Task assigned by the generator
    Scheduled,
    /// Marked as studied
    Done,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Free => "free",
            SlotStatus::Scheduled => "scheduled",
            SlotStatus::Done => "done",
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(SlotStatus::Free),
            "scheduled" => Ok(SlotStatus::Scheduled),
            "done" => Ok(SlotStatus::Done),
            other => Err(ValidationError::InvalidValue {
                field: "status".to_string(),
                message: format!("expected free, scheduled or done, got '{other}'"),
            }),
        }
    }
}

/// One hour of a work day, either free or holding a single task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Assigned task id, `None` when the slot is free.
    pub task: Option<String>,
    pub status: SlotStatus,
}

impl Slot {
    /// Whether `start` falls on the given calendar day.
    pub fn starts_on(&self, date: NaiveDate) -> bool {
        self.start.date_naive() == date
    }
}

/// A slot as persisted by the slot store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredSlot {
    pub id: String,
    #[serde(flatten)]
    pub slot: Slot,
}

/// Partial update for a persisted slot.
///
/// `task: Some(None)` clears the assignment, `task: None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotUpdate {
    pub status: Option<SlotStatus>,
    pub task: Option<Option<String>>,
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(s.to_string()))
}
