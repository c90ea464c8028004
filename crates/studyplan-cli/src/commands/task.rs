//! Task management commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use studyplan_core::storage::{NewTask, TaskFilter, TaskPatch};
use studyplan_core::{parse_date, CoreError, PlanDb};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Create {
        /// Task title
        title: String,
        /// Subject ID to associate with
        #[arg(long)]
        subject: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        due: Option<NaiveDate>,
        /// Estimated study hours (default: 1)
        #[arg(long, allow_negative_numbers = true)]
        hours: Option<i64>,
    },
    /// List tasks by due date
    List {
        /// Filter by completion (true or false)
        #[arg(long)]
        completed: Option<bool>,
        /// Filter by subject ID
        #[arg(long)]
        subject: Option<String>,
    },
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// Update a task
    Update {
        /// Task ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New subject ID
        #[arg(long)]
        subject: Option<String>,
        /// New due date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        due: Option<NaiveDate>,
        /// New estimated hours
        #[arg(long, allow_negative_numbers = true)]
        hours: Option<i64>,
        /// Set completed status
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Mark a task as completed
    Complete {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = PlanDb::open()?;

    match action {
        TaskAction::Create {
            title,
            subject,
            due,
            hours,
        } => {
            let task = db.create_task(&NewTask {
                title,
                subject_id: subject,
                due_date: due,
                estimated_duration_hours: hours,
            })?;
            println!("Task created: {}", task.id);
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List { completed, subject } => {
            let tasks = db.list_tasks(&TaskFilter {
                completed,
                subject_id: subject,
            })?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        TaskAction::Get { id } => {
            let task = db
                .get_task(&id)?
                .ok_or_else(|| CoreError::not_found("Task", id.as_str()))?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Update {
            id,
            title,
            subject,
            due,
            hours,
            completed,
        } => {
            let task = db.update_task(
                &id,
                &TaskPatch {
                    title,
                    subject_id: subject,
                    due_date: due,
                    estimated_duration_hours: hours,
                    completed,
                },
            )?;
            println!("Task updated:");
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Complete { id } => {
            db.update_task(
                &id,
                &TaskPatch {
                    completed: Some(true),
                    ..Default::default()
                },
            )?;
            println!("Task completed: {id}");
        }
        TaskAction::Delete { id } => {
            db.delete_task(&id)?;
            println!("Task deleted: {id}");
        }
    }
    Ok(())
}
