//! SQLite-based storage for subjects, tasks, and timetable slots.

use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::data_dir;
use crate::error::{CoreError, DatabaseError, Result, ValidationError};
use crate::schedule::{Note, Slot, SlotStatus, SlotUpdate, StoredSlot, Subject, Task};

// === Helper Functions ===

/// Format an instant for storage; fixed width so text comparison orders by time.
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_due_date(idx: usize, s: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    s.map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// Parse slot status from database string; unknown values are a conversion error.
fn parse_slot_status(idx: usize, status_str: &str) -> rusqlite::Result<SlotStatus> {
    status_str.parse().map_err(|e| conversion_error(idx, e))
}

/// Midnight at the start of `date` and of the day after `end`.
fn day_bounds(start: NaiveDate, end: NaiveDate) -> (String, String) {
    let from = start.and_time(NaiveTime::MIN).and_utc();
    let until = end.and_time(NaiveTime::MIN).and_utc() + Duration::days(1);
    (format_timestamp(&from), format_timestamp(&until))
}

fn required_text(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field).into());
    }
    Ok(trimmed.to_string())
}

fn row_to_subject(row: &Row) -> rusqlite::Result<Subject> {
    let created_at: String = row.get(3)?;
    Ok(Subject {
        id: row.get(0)?,
        title: row.get(1)?,
        color: row.get(2)?,
        created_at: parse_timestamp(3, &created_at)?,
    })
}

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let created_at: String = row.get(6)?;
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        subject_id: row.get(2)?,
        due_date: parse_due_date(3, row.get(3)?)?,
        estimated_duration_hours: row.get(4)?,
        completed: row.get(5)?,
        created_at: parse_timestamp(6, &created_at)?,
    })
}

fn row_to_note(row: &Row) -> rusqlite::Result<Note> {
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        subject_id: row.get(3)?,
        favorite: row.get(4)?,
        created_at: parse_timestamp(5, &created_at)?,
        updated_at: parse_timestamp(6, &updated_at)?,
    })
}

fn row_to_slot(row: &Row) -> rusqlite::Result<StoredSlot> {
    let start: String = row.get(1)?;
    let end: String = row.get(2)?;
    let status: String = row.get(4)?;
    Ok(StoredSlot {
        id: row.get(0)?,
        slot: Slot {
            start: parse_timestamp(1, &start)?,
            end: parse_timestamp(2, &end)?,
            task: row.get(3)?,
            status: parse_slot_status(4, &status)?,
        },
    })
}

const SUBJECT_COLUMNS: &str = "id, title, color, created_at";
const TASK_COLUMNS: &str =
    "id, title, subject_id, due_date, estimated_duration_hours, completed, created_at";
const NOTE_COLUMNS: &str = "id, title, content, subject_id, favorite, created_at, updated_at";
const SLOT_COLUMNS: &str = "id, start_time, end_time, task_id, status";

/// Fields for a new task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub subject_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub estimated_duration_hours: Option<i64>,
}

/// Partial task update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub subject_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub estimated_duration_hours: Option<i64>,
    pub completed: Option<bool>,
}

/// Task list filter.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub subject_id: Option<String>,
}

/// Fields for a new note.
#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub subject_id: Option<String>,
    pub favorite: bool,
}

/// Partial note update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub subject_id: Option<String>,
    pub favorite: Option<bool>,
}

/// Note list filter.
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub subject_id: Option<String>,
    pub favorite_only: bool,
    /// Case-insensitive substring matched against title and content.
    pub search: Option<String>,
}

/// SQLite database for study planning.
///
/// Stores subjects, tasks, notes, and persisted timetable slots.
pub struct PlanDb {
    conn: Connection,
}

impl PlanDb {
    /// Open the database at `<data dir>/studyplan.db`.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("studyplan.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS subjects (
                    id          TEXT PRIMARY KEY,
                    title       TEXT NOT NULL,
                    color       TEXT NOT NULL,
                    created_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS tasks (
                    id                        TEXT PRIMARY KEY,
                    title                     TEXT NOT NULL,
                    subject_id                TEXT,
                    due_date                  TEXT,
                    estimated_duration_hours  INTEGER,
                    completed                 INTEGER NOT NULL DEFAULT 0,
                    created_at                TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS notes (
                    id          TEXT PRIMARY KEY,
                    title       TEXT NOT NULL,
                    content     TEXT NOT NULL DEFAULT '',
                    subject_id  TEXT,
                    favorite    INTEGER NOT NULL DEFAULT 0,
                    created_at  TEXT NOT NULL,
                    updated_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS timetable_slots (
                    id          TEXT PRIMARY KEY,
                    start_time  TEXT NOT NULL,
                    end_time    TEXT NOT NULL,
                    task_id     TEXT,
                    status      TEXT NOT NULL DEFAULT 'free'
                );

                CREATE INDEX IF NOT EXISTS idx_timetable_slots_start
                    ON timetable_slots(start_time);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    /// Run `f` inside an immediate transaction, rolling back on error.
    fn in_transaction<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        match f() {
            Ok(value) => {
                self.conn.execute_batch("COMMIT;")?;
                Ok(value)
            }
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK;");
                Err(err)
            }
        }
    }

    // === Subject CRUD ===

    /// Create a subject; `title` must not be blank.
    pub fn create_subject(&self, title: &str, color: &str) -> Result<Subject> {
        let subject = Subject {
            id: Uuid::new_v4().to_string(),
            title: required_text("title", title)?,
            color: required_text("color", color)?,
            created_at: Utc::now(),
        };

        self.conn.execute(
            "INSERT INTO subjects (id, title, color, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                subject.id,
                subject.title,
                subject.color,
                format_timestamp(&subject.created_at),
            ],
        )?;
        tracing::info!(id = %subject.id, "created subject '{}'", subject.title);
        Ok(subject)
    }

    pub fn get_subject(&self, id: &str) -> Result<Option<Subject>> {
        let subject = self
            .conn
            .query_row(
                &format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = ?1"),
                params![id],
                row_to_subject,
            )
            .optional()?;
        Ok(subject)
    }

    /// List subjects, newest first.
    pub fn list_subjects(&self) -> Result<Vec<Subject>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects ORDER BY created_at DESC, rowid DESC"
        ))?;
        let subjects = stmt
            .query_map([], row_to_subject)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(subjects)
    }

    /// Update title and/or color, keeping stored values for `None`.
    pub fn update_subject(
        &self,
        id: &str,
        title: Option<&str>,
        color: Option<&str>,
    ) -> Result<Subject> {
        let mut subject = self
            .get_subject(id)?
            .ok_or_else(|| CoreError::not_found("Subject", id))?;

        if let Some(t) = title {
            subject.title = required_text("title", t)?;
        }
        if let Some(c) = color {
            subject.color = required_text("color", c)?;
        }

        self.conn.execute(
            "UPDATE subjects SET title = ?1, color = ?2 WHERE id = ?3",
            params![subject.title, subject.color, subject.id],
        )?;
        tracing::info!(id, "updated subject");
        Ok(subject)
    }

    /// Delete a subject and detach its tasks and notes.
    pub fn delete_subject(&self, id: &str) -> Result<()> {
        self.in_transaction(|| {
            let deleted = self
                .conn
                .execute("DELETE FROM subjects WHERE id = ?1", params![id])?;
            if deleted == 0 {
                return Err(CoreError::not_found("Subject", id));
            }
            self.conn.execute(
                "UPDATE tasks SET subject_id = NULL WHERE subject_id = ?1",
                params![id],
            )?;
            self.conn.execute(
                "UPDATE notes SET subject_id = NULL WHERE subject_id = ?1",
                params![id],
            )?;
            Ok(())
        })?;
        tracing::info!(id, "deleted subject");
        Ok(())
    }

    // === Task CRUD ===

    fn ensure_subject_exists(&self, subject_id: &str) -> Result<()> {
        if self.get_subject(subject_id)?.is_none() {
            return Err(CoreError::not_found("Subject", subject_id));
        }
        Ok(())
    }

    /// Create a pending task.
    pub fn create_task(&self, new: &NewTask) -> Result<Task> {
        if let Some(subject_id) = new.subject_id.as_deref() {
            self.ensure_subject_exists(subject_id)?;
        }

        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: required_text("title", &new.title)?,
            subject_id: new.subject_id.clone(),
            due_date: new.due_date,
            estimated_duration_hours: new.estimated_duration_hours,
            completed: false,
            created_at: Utc::now(),
        };

        self.conn.execute(
            &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                task.id,
                task.title,
                task.subject_id,
                task.due_date.map(|d| d.to_string()),
                task.estimated_duration_hours,
                task.completed,
                format_timestamp(&task.created_at),
            ],
        )?;
        tracing::info!(id = %task.id, "created task '{}'", task.title);
        Ok(task)
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    /// List tasks by due date (undated last), newest first within a date.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE (?1 IS NULL OR completed = ?1)
               AND (?2 IS NULL OR subject_id = ?2)
             ORDER BY due_date IS NULL, due_date ASC, created_at DESC, rowid DESC"
        ))?;
        let tasks = stmt
            .query_map(params![filter.completed, filter.subject_id], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Incomplete tasks, the backlog handed to the generator.
    pub fn list_pending_tasks(&self) -> Result<Vec<Task>> {
        self.list_tasks(&TaskFilter {
            completed: Some(false),
            subject_id: None,
        })
    }

    pub fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Task> {
        let mut task = self
            .get_task(id)?
            .ok_or_else(|| CoreError::not_found("Task", id))?;

        if let Some(t) = patch.title.as_deref() {
            task.title = required_text("title", t)?;
        }
        if let Some(s) = patch.subject_id.as_deref() {
            self.ensure_subject_exists(s)?;
            task.subject_id = Some(s.to_string());
        }
        if let Some(d) = patch.due_date {
            task.due_date = Some(d);
        }
        if let Some(h) = patch.estimated_duration_hours {
            task.estimated_duration_hours = Some(h);
        }
        if let Some(c) = patch.completed {
            task.completed = c;
        }

        self.conn.execute(
            "UPDATE tasks
             SET title = ?1, subject_id = ?2, due_date = ?3,
                 estimated_duration_hours = ?4, completed = ?5
             WHERE id = ?6",
            params![
                task.title,
                task.subject_id,
                task.due_date.map(|d| d.to_string()),
                task.estimated_duration_hours,
                task.completed,
                task.id,
            ],
        )?;
        tracing::info!(id, "updated task");
        Ok(task)
    }

    /// Delete a task and free any slots still scheduled for it.
    pub fn delete_task(&self, id: &str) -> Result<()> {
        self.in_transaction(|| {
            let deleted = self
                .conn
                .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            if deleted == 0 {
                return Err(CoreError::not_found("Task", id));
            }
            self.conn.execute(
                "UPDATE timetable_slots
                 SET task_id = NULL,
                     status = CASE WHEN status = 'scheduled' THEN 'free' ELSE status END
                 WHERE task_id = ?1",
                params![id],
            )?;
            Ok(())
        })?;
        tracing::info!(id, "deleted task");
        Ok(())
    }

    // === Notes ===

    pub fn create_note(&self, new: &NewNote) -> Result<Note> {
        if let Some(subject_id) = new.subject_id.as_deref() {
            self.ensure_subject_exists(subject_id)?;
        }

        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4().to_string(),
            title: required_text("title", &new.title)?,
            content: new.content.clone(),
            subject_id: new.subject_id.clone(),
            favorite: new.favorite,
            created_at: now,
            updated_at: now,
        };

        self.conn.execute(
            &format!("INSERT INTO notes ({NOTE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                note.id,
                note.title,
                note.content,
                note.subject_id,
                note.favorite,
                format_timestamp(&note.created_at),
                format_timestamp(&note.updated_at),
            ],
        )?;
        tracing::info!(id = %note.id, "created note '{}'", note.title);
        Ok(note)
    }

    pub fn get_note(&self, id: &str) -> Result<Option<Note>> {
        let note = self
            .conn
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
                params![id],
                row_to_note,
            )
            .optional()?;
        Ok(note)
    }

    /// List notes, most recently updated first.
    pub fn list_notes(&self, filter: &NoteFilter) -> Result<Vec<Note>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes
             WHERE (?1 IS NULL OR subject_id = ?1)
               AND (?2 = 0 OR favorite = 1)
               AND (?3 IS NULL
                    OR instr(lower(title), lower(?3)) > 0
                    OR instr(lower(content), lower(?3)) > 0)
             ORDER BY updated_at DESC, rowid DESC"
        ))?;
        let notes = stmt
            .query_map(
                params![filter.subject_id, filter.favorite_only, search],
                row_to_note,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    pub fn update_note(&self, id: &str, patch: &NotePatch) -> Result<Note> {
        let mut note = self
            .get_note(id)?
            .ok_or_else(|| CoreError::not_found("Note", id))?;

        if let Some(t) = patch.title.as_deref() {
            note.title = required_text("title", t)?;
        }
        if let Some(c) = &patch.content {
            note.content = c.clone();
        }
        if let Some(s) = patch.subject_id.as_deref() {
            self.ensure_subject_exists(s)?;
            note.subject_id = Some(s.to_string());
        }
        if let Some(f) = patch.favorite {
            note.favorite = f;
        }
        note.updated_at = Utc::now();

        self.conn.execute(
            "UPDATE notes
             SET title = ?1, content = ?2, subject_id = ?3, favorite = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                note.title,
                note.content,
                note.subject_id,
                note.favorite,
                format_timestamp(&note.updated_at),
                note.id,
            ],
        )?;
        tracing::info!(id, "updated note");
        Ok(note)
    }

    /// Flip the favorite flag.
    pub fn toggle_note_favorite(&self, id: &str) -> Result<Note> {
        let note = self
            .get_note(id)?
            .ok_or_else(|| CoreError::not_found("Note", id))?;
        self.update_note(
            id,
            &NotePatch {
                favorite: Some(!note.favorite),
                ..Default::default()
            },
        )
    }

    pub fn delete_note(&self, id: &str) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(CoreError::not_found("Note", id));
        }
        tracing::info!(id, "deleted note");
        Ok(())
    }

    // === Timetable slots ===

    /// Atomically replace every slot starting within `start..=end` with `slots`.
    ///
    /// Returns the inserted slots with their new ids, in input order.
    pub fn replace_slots_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        slots: &[Slot],
    ) -> Result<Vec<StoredSlot>> {
        if end < start {
            return Err(ValidationError::InvalidDateRange { start, end }.into());
        }
        let (from, until) = day_bounds(start, end);

        let stored = self.in_transaction(|| {
            let removed = self.conn.execute(
                "DELETE FROM timetable_slots WHERE start_time >= ?1 AND start_time < ?2",
                params![from, until],
            )?;
            tracing::debug!(removed, "cleared slots {start}..={end}");

            let mut insert = self.conn.prepare(&format!(
                "INSERT INTO timetable_slots ({SLOT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"
            ))?;
            let mut stored = Vec::with_capacity(slots.len());
            for slot in slots {
                let record = StoredSlot {
                    id: Uuid::new_v4().to_string(),
                    slot: slot.clone(),
                };
                insert.execute(params![
                    record.id,
                    format_timestamp(&record.slot.start),
                    format_timestamp(&record.slot.end),
                    record.slot.task,
                    record.slot.status.as_str(),
                ])?;
                stored.push(record);
            }
            Ok(stored)
        })?;

        tracing::info!(slots = stored.len(), "saved timetable {start}..={end}");
        Ok(stored)
    }

    /// Slots starting within `start..=end`, ordered by start time.
    pub fn list_slots_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<StoredSlot>> {
        let (from, until) = day_bounds(start, end);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SLOT_COLUMNS} FROM timetable_slots
             WHERE start_time >= ?1 AND start_time < ?2
             ORDER BY start_time ASC"
        ))?;
        let slots = stmt
            .query_map(params![from, until], row_to_slot)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(slots)
    }

    /// Slots of a single day, ordered by start time.
    pub fn list_slots_for_day(&self, date: NaiveDate) -> Result<Vec<StoredSlot>> {
        self.list_slots_in_range(date, date)
    }

    pub fn get_slot(&self, id: &str) -> Result<Option<StoredSlot>> {
        let slot = self
            .conn
            .query_row(
                &format!("SELECT {SLOT_COLUMNS} FROM timetable_slots WHERE id = ?1"),
                params![id],
                row_to_slot,
            )
            .optional()?;
        Ok(slot)
    }

    /// Apply a status change and/or task reassignment.
    ///
    /// Without an explicit status, assigning a task to a free slot makes it
    /// `scheduled` and clearing the task of a scheduled slot makes it `free`.
    pub fn update_slot(&self, id: &str, update: &SlotUpdate) -> Result<StoredSlot> {
        let mut stored = self
            .get_slot(id)?
            .ok_or_else(|| CoreError::not_found("Slot", id))?;

        if let Some(task) = &update.task {
            if let Some(task_id) = task.as_deref() {
                if self.get_task(task_id)?.is_none() {
                    return Err(CoreError::not_found("Task", task_id));
                }
            }
            stored.slot.task = task.clone();

            if update.status.is_none() {
                stored.slot.status = match (&stored.slot.task, stored.slot.status) {
                    (Some(_), SlotStatus::Free) => SlotStatus::Scheduled,
                    (None, SlotStatus::Scheduled) => SlotStatus::Free,
                    (_, unchanged) => unchanged,
                };
            }
        }
        if let Some(status) = update.status {
            stored.slot.status = status;
        }

        self.conn.execute(
            "UPDATE timetable_slots SET task_id = ?1, status = ?2 WHERE id = ?3",
            params![stored.slot.task, stored.slot.status.as_str(), stored.id],
        )?;
        tracing::info!(id, status = %stored.slot.status, "updated slot");
        Ok(stored)
    }

    /// Mark a slot as studied.
    pub fn mark_slot_done(&self, id: &str) -> Result<StoredSlot> {
        self.update_slot(
            id,
            &SlotUpdate {
                status: Some(SlotStatus::Done),
                task: None,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn slot_at(day: NaiveDate, hour: u32, task: Option<&str>) -> Slot {
        let start = day.and_hms_opt(hour, 0, 0).unwrap().and_utc();
        Slot {
            start,
            end: start + Duration::hours(1),
            task: task.map(str::to_string),
            status: if task.is_some() {
                SlotStatus::Scheduled
            } else {
                SlotStatus::Free
            },
        }
    }

    fn new_task(title: &str, due: Option<NaiveDate>, hours: Option<i64>) -> NewTask {
        NewTask {
            title: title.to_string(),
            subject_id: None,
            due_date: due,
            estimated_duration_hours: hours,
        }
    }

    #[test]
    fn subject_crud() {
        let db = PlanDb::open_memory().unwrap();

        let math = db.create_subject("  Math ", "#FF0000").unwrap();
        assert_eq!(math.title, "Math");
        let physics = db.create_subject("Physics", "#00FF00").unwrap();

        let listed = db.list_subjects().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, physics.id);

        let updated = db.update_subject(&math.id, None, Some("#0000FF")).unwrap();
        assert_eq!(updated.title, "Math");
        assert_eq!(updated.color, "#0000FF");

        db.delete_subject(&math.id).unwrap();
        assert!(db.get_subject(&math.id).unwrap().is_none());
        assert!(matches!(
            db.delete_subject(&math.id),
            Err(CoreError::NotFound { kind: "Subject", .. })
        ));
    }

    #[test]
    fn blank_titles_are_rejected() {
        let db = PlanDb::open_memory().unwrap();
        assert!(matches!(
            db.create_subject("   ", "#FFF"),
            Err(CoreError::Validation(ValidationError::EmptyField("title")))
        ));
        assert!(db.create_task(&new_task("", None, None)).is_err());
    }

    #[test]
    fn task_crud_and_filters() {
        let db = PlanDb::open_memory().unwrap();
        let subject = db.create_subject("Math", "#FF0000").unwrap();

        let mut essay = new_task("Essay", Some(date(2024, 1, 10)), Some(3));
        essay.subject_id = Some(subject.id.clone());
        let essay = db.create_task(&essay).unwrap();
        let reading = db.create_task(&new_task("Reading", None, None)).unwrap();
        let quiz = db
            .create_task(&new_task("Quiz prep", Some(date(2024, 1, 5)), Some(1)))
            .unwrap();

        let all = db.list_tasks(&TaskFilter::default()).unwrap();
        let ids: Vec<_> = all.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![quiz.id.as_str(), essay.id.as_str(), reading.id.as_str()]);

        let by_subject = db
            .list_tasks(&TaskFilter {
                completed: None,
                subject_id: Some(subject.id.clone()),
            })
            .unwrap();
        assert_eq!(by_subject.len(), 1);
        assert_eq!(by_subject[0].estimated_duration_hours, Some(3));

        db.update_task(
            &quiz.id,
            &TaskPatch {
                completed: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        let pending = db.list_pending_tasks().unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|t| t.id != quiz.id));

        db.delete_task(&reading.id).unwrap();
        assert!(db.get_task(&reading.id).unwrap().is_none());
    }

    #[test]
    fn task_with_unknown_subject_is_rejected() {
        let db = PlanDb::open_memory().unwrap();
        let mut task = new_task("Essay", None, None);
        task.subject_id = Some("missing".to_string());

        assert!(matches!(
            db.create_task(&task),
            Err(CoreError::NotFound { kind: "Subject", .. })
        ));
    }

    #[test]
    fn deleting_subject_detaches_tasks() {
        let db = PlanDb::open_memory().unwrap();
        let subject = db.create_subject("Math", "#FF0000").unwrap();
        let mut new = new_task("Essay", None, None);
        new.subject_id = Some(subject.id.clone());
        let task = db.create_task(&new).unwrap();

        db.delete_subject(&subject.id).unwrap();

        assert_eq!(db.get_task(&task.id).unwrap().unwrap().subject_id, None);
    }

    fn new_note(title: &str, content: &str) -> NewNote {
        NewNote {
            title: title.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn note_crud() {
        let db = PlanDb::open_memory().unwrap();
        let subject = db.create_subject("Biology", "#00AA00").unwrap();

        let mut cells = new_note(" Cells ", "Mitochondria");
        cells.subject_id = Some(subject.id.clone());
        let cells = db.create_note(&cells).unwrap();
        assert_eq!(cells.title, "Cells");
        assert_eq!(cells.created_at, cells.updated_at);

        let fetched = db.get_note(&cells.id).unwrap().unwrap();
        assert_eq!(fetched.content, "Mitochondria");

        let updated = db
            .update_note(
                &cells.id,
                &NotePatch {
                    content: Some("Ribosomes".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Cells");
        assert_eq!(updated.content, "Ribosomes");
        assert!(updated.updated_at >= cells.updated_at);

        let toggled = db.toggle_note_favorite(&cells.id).unwrap();
        assert!(toggled.favorite);

        db.delete_note(&cells.id).unwrap();
        assert!(db.get_note(&cells.id).unwrap().is_none());
        assert!(matches!(
            db.delete_note(&cells.id),
            Err(CoreError::NotFound { kind: "Note", .. })
        ));
    }

    #[test]
    fn note_filters() {
        let db = PlanDb::open_memory().unwrap();
        let subject = db.create_subject("History", "#AA0000").unwrap();

        let mut rome = new_note("Rome", "Founded in 753 BC");
        rome.subject_id = Some(subject.id.clone());
        rome.favorite = true;
        let rome = db.create_note(&rome).unwrap();
        db.create_note(&new_note("Vocabulary", "rome is also a city"))
            .unwrap();
        db.create_note(&new_note("Groceries", "milk")).unwrap();

        assert_eq!(db.list_notes(&NoteFilter::default()).unwrap().len(), 3);

        let by_subject = db
            .list_notes(&NoteFilter {
                subject_id: Some(subject.id.clone()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_subject.len(), 1);
        assert_eq!(by_subject[0].id, rome.id);

        let favorites = db
            .list_notes(&NoteFilter {
                favorite_only: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(favorites.len(), 1);

        let found = db
            .list_notes(&NoteFilter {
                search: Some("ROME".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn deleting_subject_detaches_notes() {
        let db = PlanDb::open_memory().unwrap();
        let subject = db.create_subject("Math", "#FF0000").unwrap();
        let mut note = new_note("Limits", "");
        note.subject_id = Some(subject.id.clone());
        let note = db.create_note(&note).unwrap();

        db.delete_subject(&subject.id).unwrap();

        assert_eq!(db.get_note(&note.id).unwrap().unwrap().subject_id, None);
    }

    #[test]
    fn note_with_unknown_subject_is_rejected() {
        let db = PlanDb::open_memory().unwrap();
        let mut note = new_note("Orphan", "");
        note.subject_id = Some("missing".to_string());

        assert!(matches!(
            db.create_note(&note),
            Err(CoreError::NotFound { kind: "Subject", .. })
        ));
    }

    #[test]
    fn corrupt_slot_status_is_an_error() {
        let db = PlanDb::open_memory().unwrap();
        let day = date(2024, 1, 1);
        let stored = db.replace_slots_in_range(day, day, &[slot_at(day, 8, None)]).unwrap();
        db.conn
            .execute(
                "UPDATE timetable_slots SET status = 'lost' WHERE id = ?1",
                params![stored[0].id],
            )
            .unwrap();

        assert!(matches!(
            db.get_slot(&stored[0].id),
            Err(CoreError::Database(DatabaseError::QueryFailed(_)))
        ));
        assert!(db.list_slots_for_day(day).is_err());
    }

    #[test]
    fn replace_slots_only_touches_range() {
        let db = PlanDb::open_memory().unwrap();
        let d1 = date(2024, 1, 1);
        let d2 = date(2024, 1, 2);
        let d3 = date(2024, 1, 3);

        let spread = [slot_at(d1, 8, None), slot_at(d2, 8, None), slot_at(d3, 8, None)];
        db.replace_slots_in_range(d1, d3, &spread).unwrap();
        db.replace_slots_in_range(d2, d2, &[slot_at(d2, 9, None), slot_at(d2, 10, None)])
            .unwrap();

        assert_eq!(db.list_slots_for_day(d1).unwrap().len(), 1);
        assert_eq!(db.list_slots_for_day(d3).unwrap().len(), 1);

        let day_two = db.list_slots_for_day(d2).unwrap();
        assert_eq!(day_two.len(), 2);
        assert_eq!(
            day_two[0].slot.start,
            Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap()
        );
        assert_eq!(db.list_slots_in_range(d1, d3).unwrap().len(), 4);
    }

    #[test]
    fn replace_slots_rejects_reversed_range() {
        let db = PlanDb::open_memory().unwrap();
        let err = db
            .replace_slots_in_range(date(2024, 1, 2), date(2024, 1, 1), &[])
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn mark_done_and_reassign() {
        let db = PlanDb::open_memory().unwrap();
        let task = db.create_task(&new_task("Essay", None, Some(2))).unwrap();
        let day = date(2024, 1, 1);
        let slots = [slot_at(day, 8, Some(&task.id)), slot_at(day, 9, None)];
        let stored = db.replace_slots_in_range(day, day, &slots).unwrap();

        let done = db.mark_slot_done(&stored[0].id).unwrap();
        assert_eq!(done.slot.status, SlotStatus::Done);
        assert_eq!(done.slot.task.as_deref(), Some(task.id.as_str()));

        let reassigned = db
            .update_slot(
                &stored[1].id,
                &SlotUpdate {
                    status: None,
                    task: Some(Some(task.id.clone())),
                },
            )
            .unwrap();
        assert_eq!(reassigned.slot.status, SlotStatus::Scheduled);

        let cleared = db
            .update_slot(
                &stored[1].id,
                &SlotUpdate {
                    status: None,
                    task: Some(None),
                },
            )
            .unwrap();
        assert_eq!(cleared.slot.status, SlotStatus::Free);
        assert_eq!(db.get_slot(&stored[1].id).unwrap().unwrap(), cleared);
    }

    #[test]
    fn update_unknown_slot_is_not_found() {
        let db = PlanDb::open_memory().unwrap();
        assert!(matches!(
            db.mark_slot_done("nope"),
            Err(CoreError::NotFound { kind: "Slot", .. })
        ));
    }

    #[test]
    fn reassign_to_unknown_task_is_rejected() {
        let db = PlanDb::open_memory().unwrap();
        let day = date(2024, 1, 1);
        let stored = db.replace_slots_in_range(day, day, &[slot_at(day, 8, None)]).unwrap();

        let err = db
            .update_slot(
                &stored[0].id,
                &SlotUpdate {
                    status: None,
                    task: Some(Some("ghost".to_string())),
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "Task", .. }));
    }

    #[test]
    fn deleting_task_frees_its_scheduled_slots() {
        let db = PlanDb::open_memory().unwrap();
        let task = db.create_task(&new_task("Essay", None, Some(2))).unwrap();
        let day = date(2024, 1, 1);
        let stored = db
            .replace_slots_in_range(
                day,
                day,
                &[slot_at(day, 8, Some(&task.id)), slot_at(day, 9, Some(&task.id))],
            )
            .unwrap();
        db.mark_slot_done(&stored[0].id).unwrap();

        db.delete_task(&task.id).unwrap();

        let slots = db.list_slots_for_day(day).unwrap();
        assert_eq!(slots[0].slot.status, SlotStatus::Done);
        assert_eq!(slots[0].slot.task, None);
        assert_eq!(slots[1].slot.status, SlotStatus::Free);
    }

    #[test]
    fn open_at_persists_between_connections() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("studyplan.db");

        let id = {
            let db = PlanDb::open_at(&path).unwrap();
            db.create_subject("History", "#123456").unwrap().id
        };

        let db = PlanDb::open_at(&path).unwrap();
        assert_eq!(db.get_subject(&id).unwrap().unwrap().title, "History");
    }
}
