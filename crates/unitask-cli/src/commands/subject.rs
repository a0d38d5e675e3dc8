//! Subject management commands for CLI.

use clap::Subcommand;

use super::{print_json, CliResult, Session};

#[derive(Subcommand)]
pub enum SubjectAction {
    /// Add a subject
    Add {
        /// Subject name (unique, case-insensitive)
        name: String,
        /// Color as six hex digits, with or without '#'
        #[arg(long, default_value = "#3B82F6")]
        color: String,
        /// Teacher or lecturer name
        #[arg(long)]
        teacher: Option<String>,
    },
    /// Replace a subject's name, color and teacher
    Edit {
        id: String,
        name: String,
        #[arg(long)]
        color: String,
        #[arg(long)]
        teacher: Option<String>,
    },
    /// Delete a subject
    Delete {
        id: String,
        /// Also delete the subject's tasks and their reminders
        #[arg(long)]
        cascade: bool,
    },
    /// List all subjects
    List,
}

pub fn run(action: SubjectAction) -> CliResult {
    let session = Session::open()?;
    let subjects = session.app.subjects();

    match action {
        SubjectAction::Add {
            name,
            color,
            teacher,
        } => {
            let subject = subjects.add_subject(&name, &color, teacher.as_deref())?;
            print_json(&subject)?;
        }
        SubjectAction::Edit {
            id,
            name,
            color,
            teacher,
        } => {
            let subject = subjects.edit_subject(&id, &name, &color, teacher.as_deref())?;
            print_json(&subject)?;
        }
        SubjectAction::Delete { id, cascade } => {
            let removed = session.app.delete_subject(&id, cascade)?;
            print_json(&serde_json::json!({ "deleted": id, "tasks_removed": removed }))?;
        }
        SubjectAction::List => {
            print_json(&subjects.list()?)?;
        }
    }
    Ok(())
}
