//! Reminder commands for CLI.
//!
//! Without an OS alarm manager the queue lives in the database; `alarm due`
//! is meant to be polled (cron, a shell prompt hook, a systemd timer).

use chrono::Utc;
use clap::Subcommand;
use unitask_core::{NotificationSetting, SqliteAlarmQueue};

use super::{parse_time, print_json, CliResult, Session};

#[derive(Subcommand)]
pub enum AlarmAction {
    /// Schedule a reminder
    Schedule {
        /// Trigger time as RFC 3339
        #[arg(long)]
        at: String,
        /// Task the reminder belongs to
        #[arg(long)]
        task: Option<String>,
        /// Repeat every N minutes
        #[arg(long)]
        every_mins: Option<i64>,
        /// Ask for approximate delivery even when exact is allowed
        #[arg(long)]
        approximate: bool,
        /// Store the reminder without requesting delivery
        #[arg(long)]
        disabled: bool,
    },
    /// Cancel a reminder and its queued delivery
    Cancel { id: String },
    /// List reminders and queued deliveries
    List,
    /// Show deliveries that have come due
    Due {
        /// Acknowledge them: drop one-shots, advance repeating ones
        #[arg(long)]
        ack: bool,
    },
}

pub fn run(action: AlarmAction) -> CliResult {
    let session = Session::open()?;
    let notifications = session.app.notifications();

    match action {
        AlarmAction::Schedule {
            at,
            task,
            every_mins,
            approximate,
            disabled,
        } => {
            let at_millis = parse_time("--at", &at)?.timestamp_millis();
            let mut setting = match every_mins {
                Some(mins) => NotificationSetting {
                    use_minutes: true,
                    ..NotificationSetting::repeating(task, at_millis, mins.saturating_mul(60_000))
                },
                None => NotificationSetting::one_shot(task, at_millis),
            };
            setting.exact =
                setting.exact && !approximate && session.config.notifications.default_exact;
            setting.enabled = !disabled && session.config.notifications.enabled;

            let request = notifications.schedule(&setting)?;
            print_json(&serde_json::json!({ "setting": setting, "request": request }))?;
        }
        AlarmAction::Cancel { id } => {
            notifications.cancel(&id)?;
            print_json(&serde_json::json!({ "cancelled": id }))?;
        }
        AlarmAction::List => {
            let settings = notifications.observe_all().borrow().clone();
            let queued = SqliteAlarmQueue::new(session.store.clone()).pending()?;
            print_json(&serde_json::json!({ "settings": settings, "queued": queued }))?;
        }
        AlarmAction::Due { ack } => {
            let queue = SqliteAlarmQueue::new(session.store.clone());
            let now = Utc::now().timestamp_millis();
            let due = queue.due(now)?;
            if ack {
                for alarm in &due {
                    queue.acknowledge(alarm, now)?;
                }
            }
            print_json(&due)?;
        }
    }
    Ok(())
}
