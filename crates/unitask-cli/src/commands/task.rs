//! Task management commands for CLI.

use chrono::Duration;
use clap::Subcommand;

use super::{parse_time, print_json, CliResult, Session};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task title (max 50 characters)
        title: String,
        /// Owning subject id
        #[arg(long)]
        subject: String,
        /// Due time as RFC 3339, e.g. 2025-03-01T18:00:00Z
        #[arg(long)]
        due: String,
    },
    /// List tasks ordered by due time
    List {
        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },
    /// List tasks due soon
    Urgent {
        /// Look-ahead window in hours (defaults to tasks.urgent_window_hours)
        #[arg(long)]
        hours: Option<i64>,
        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },
    /// Mark a task done and collect its XP
    Complete { id: String },
    /// Change a task's title, subject or due time
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        due: Option<String>,
    },
    /// Delete a task and its reminders
    Delete { id: String },
}

pub fn run(action: TaskAction) -> CliResult {
    let session = Session::open()?;
    let app = &session.app;

    match action {
        TaskAction::Add {
            title,
            subject,
            due,
        } => {
            let due = parse_time("--due", &due)?;
            let task = app.tasks().add_task(&title, &subject, due)?;
            print_json(&task)?;
        }
        TaskAction::List { all } => {
            let feed = app
                .tasks()
                .get_all_tasks(all || session.config.tasks.include_completed);
            print_json(&feed.snapshot())?;
        }
        TaskAction::Urgent { hours, all } => {
            let window = match hours {
                Some(h) => {
                    Duration::try_hours(h).ok_or_else(|| format!("--hours {h} is out of range"))?
                }
                None => session.config.urgent_window(),
            };
            let feed = app
                .tasks()
                .get_urgent_tasks(window, all || session.config.tasks.include_completed)?;
            print_json(&feed.snapshot())?;
        }
        TaskAction::Complete { id } => {
            let completion = app.complete_task_with_reward(&id)?;
            print_json(&completion)?;
        }
        TaskAction::Update {
            id,
            title,
            subject,
            due,
        } => {
            let mut task = app.tasks().get_task(&id)?;
            if let Some(title) = title {
                task.title = title;
            }
            if let Some(subject) = subject {
                task.subject_id = subject;
            }
            if let Some(due) = due {
                task.due_at = parse_time("--due", &due)?;
            }
            let updated = app.tasks().update_task(&task)?;
            print_json(&updated)?;
        }
        TaskAction::Delete { id } => {
            let reminders = app.delete_task(&id)?;
            print_json(&serde_json::json!({ "deleted": id, "reminders_removed": reminders }))?;
        }
    }
    Ok(())
}
