mod config;
pub mod plan_db;

pub use config::{Config, LoggingConfig, SubjectsConfig, TimetableConfig, MAX_RANGE_DAYS};
pub use plan_db::{NewNote, NewTask, NoteFilter, NotePatch, PlanDb, TaskFilter, TaskPatch};

use std::path::PathBuf;

use crate::error::Result;

/// Returns the data directory, creating it if needed.
///
/// Resolution order:
/// 1. `STUDYPLAN_DATA_DIR`, used as-is.
/// 2. `~/.config/studyplan-dev/` when `STUDYPLAN_ENV=dev`.
/// 3. `~/.config/studyplan/`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("STUDYPLAN_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("STUDYPLAN_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("studyplan-dev")
            } else {
                base_dir.join("studyplan")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
