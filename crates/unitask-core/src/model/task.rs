use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Practical title limit shown by the task editor.
pub const TITLE_MAX_CHARS: usize = 50;

/// A piece of coursework due at a point in time.
///
/// `is_completed` only ever moves from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub subject_id: String,
    pub due_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_completed: bool,
}

impl Task {
    pub fn new(
        title: String,
        subject_id: String,
        due_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: super::new_id(),
            title,
            subject_id,
            due_at,
            created_at,
            is_completed: false,
        }
    }

    /// Whether the due time falls inside the closed interval `[from, to]`.
    pub fn is_due_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.due_at >= from && self.due_at <= to
    }
}

/// Trim and bound-check a task title.
pub fn validate_title(title: &str) -> Result<String, ValidationError> {
    super::required_text("title", title, TITLE_MAX_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn due_between_is_closed_on_both_ends() {
        let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        let task = Task::new("Lab report".into(), "s1".into(), t0, t0);

        assert!(task.is_due_between(t0, t0 + Duration::hours(1)));
        assert!(task.is_due_between(t0 - Duration::hours(1), t0));
        assert!(!task.is_due_between(t0 + Duration::milliseconds(1), t0 + Duration::hours(1)));
    }

    #[test]
    fn title_limit() {
        assert!(validate_title(&"a".repeat(TITLE_MAX_CHARS)).is_ok());
        assert!(validate_title(&"a".repeat(TITLE_MAX_CHARS + 1)).is_err());
    }

    #[test]
    fn new_task_starts_incomplete() {
        let now = Utc::now();
        let task = Task::new("Read ch. 4".into(), "s1".into(), now, now);
        assert!(!task.is_completed);
        assert!(!task.id.is_empty());
    }
}
