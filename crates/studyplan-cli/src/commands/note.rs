//! Note management commands for CLI.

use clap::Subcommand;
use studyplan_core::storage::{NewNote, NoteFilter, NotePatch};
use studyplan_core::{CoreError, PlanDb};

#[derive(Subcommand)]
pub enum NoteAction {
    /// Create a new note
    Create {
        /// Note title
        title: String,
        /// Note body
        #[arg(long, default_value = "")]
        content: String,
        /// Subject ID to file the note under
        #[arg(long)]
        subject: Option<String>,
        /// Mark as favorite
        #[arg(long)]
        favorite: bool,
    },
    /// List notes, most recently updated first
    List {
        /// Filter by subject ID
        #[arg(long)]
        subject: Option<String>,
        /// Only favorites
        #[arg(long)]
        favorites: bool,
        /// Case-insensitive text search in title and content
        #[arg(long)]
        search: Option<String>,
    },
    /// Get note details
    Get {
        /// Note ID
        id: String,
    },
    /// Update a note
    Update {
        /// Note ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New body
        #[arg(long)]
        content: Option<String>,
        /// New subject ID
        #[arg(long)]
        subject: Option<String>,
        /// Set favorite status
        #[arg(long)]
        favorite: Option<bool>,
    },
    /// Toggle the favorite flag
    Favorite {
        /// Note ID
        id: String,
    },
    /// Delete a note
    Delete {
        /// Note ID
        id: String,
    },
}

pub fn run(action: NoteAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = PlanDb::open()?;

    match action {
        NoteAction::Create {
            title,
            content,
            subject,
            favorite,
        } => {
            let note = db.create_note(&NewNote {
                title,
                content,
                subject_id: subject,
                favorite,
            })?;
            println!("Note created: {}", note.id);
            println!("{}", serde_json::to_string_pretty(&note)?);
        }
        NoteAction::List {
            subject,
            favorites,
            search,
        } => {
            let notes = db.list_notes(&NoteFilter {
                subject_id: subject,
                favorite_only: favorites,
                search,
            })?;
            println!("{}", serde_json::to_string_pretty(&notes)?);
        }
        NoteAction::Get { id } => {
            let note = db
                .get_note(&id)?
                .ok_or_else(|| CoreError::not_found("Note", id.as_str()))?;
            println!("{}", serde_json::to_string_pretty(&note)?);
        }
        NoteAction::Update {
            id,
            title,
            content,
            subject,
            favorite,
        } => {
            let note = db.update_note(
                &id,
                &NotePatch {
                    title,
                    content,
                    subject_id: subject,
                    favorite,
                },
            )?;
            println!("Note updated:");
            println!("{}", serde_json::to_string_pretty(&note)?);
        }
        NoteAction::Favorite { id } => {
            let note = db.toggle_note_favorite(&id)?;
            println!("Note updated:");
            println!("{}", serde_json::to_string_pretty(&note)?);
        }
        NoteAction::Delete { id } => {
            db.delete_note(&id)?;
            println!("Note deleted: {id}");
        }
    }
    Ok(())
}
