//! Entity records and the field validation shared by the use-cases.

pub mod notification;
pub mod subject;
pub mod task;
pub mod user;

pub use notification::NotificationSetting;
pub use subject::Subject;
pub use task::Task;
pub use user::{UserProfile, MAX_TOTAL_XP};

use crate::error::ValidationError;

/// Generate a fresh entity id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Trim `value` and require it to be non-blank and at most `max` characters.
pub(crate) fn required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank { field });
    }
    check_length(field, trimmed, max)?;
    Ok(trimmed.to_string())
}

/// Trim an optional value; blank collapses to `None`.
pub(crate) fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(trimmed) => {
            check_length(field, trimmed, max)?;
            Ok(Some(trimmed.to_string()))
        }
    }
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::TooLong { field, max, len });
    }
    Ok(())
}
