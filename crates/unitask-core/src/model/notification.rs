use serde::{Deserialize, Serialize};

/// A persisted reminder. Scheduling it also requests delivery from the
/// platform alarm service; cancelling revokes both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSetting {
    pub id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    pub enabled: bool,
    /// Absolute epoch time in milliseconds.
    pub trigger_at_millis: i64,
    #[serde(default)]
    pub repeat_interval_millis: Option<i64>,
    /// Display hint: show the repeat interval in minutes rather than hours.
    #[serde(default)]
    pub use_minutes: bool,
    /// Request exact (idle-proof) delivery for one-shot reminders.
    #[serde(default = "default_true")]
    pub exact: bool,
}

fn default_true() -> bool {
    true
}

impl NotificationSetting {
    pub fn one_shot(task_id: Option<String>, trigger_at_millis: i64) -> Self {
        Self {
            id: super::new_id(),
            task_id,
            enabled: true,
            trigger_at_millis,
            repeat_interval_millis: None,
            use_minutes: false,
            exact: true,
        }
    }

    pub fn repeating(task_id: Option<String>, trigger_at_millis: i64, every_millis: i64) -> Self {
        Self {
            repeat_interval_millis: Some(every_millis),
            exact: false,
            ..Self::one_shot(task_id, trigger_at_millis)
        }
    }
}
