//! Subject management commands for CLI.

use clap::Subcommand;
use studyplan_core::{Config, PlanDb};

#[derive(Subcommand)]
pub enum SubjectAction {
    /// Create a new subject
    Create {
        /// Subject title
        title: String,
        /// Hex color (default: subjects.default_color)
        #[arg(long)]
        color: Option<String>,
    },
    /// List subjects, newest first
    List,
    /// Update a subject
    Update {
        /// Subject ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New hex color
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a subject (its tasks are kept without a subject)
    Delete {
        /// Subject ID
        id: String,
    },
}

pub fn run(action: SubjectAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let db = PlanDb::open()?;

    match action {
        SubjectAction::Create { title, color } => {
            let color = color.unwrap_or_else(|| config.subjects.default_color.clone());
            let subject = db.create_subject(&title, &color)?;
            println!("Subject created: {}", subject.id);
            println!("{}", serde_json::to_string_pretty(&subject)?);
        }
        SubjectAction::List => {
            let subjects = db.list_subjects()?;
            println!("{}", serde_json::to_string_pretty(&subjects)?);
        }
        SubjectAction::Update { id, title, color } => {
            let subject = db.update_subject(&id, title.as_deref(), color.as_deref())?;
            println!("Subject updated:");
            println!("{}", serde_json::to_string_pretty(&subject)?);
        }
        SubjectAction::Delete { id } => {
            db.delete_subject(&id)?;
            println!("Subject deleted: {id}");
        }
    }
    Ok(())
}
