//! Core error types for unitask-core.
//!
//! Use-cases validate their input before touching storage, so a
//! [`CoreError::Validation`] always means nothing was mutated. Storage-level
//! failures surface unchanged through the use-case layer.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for unitask-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Caller input is malformed
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    /// Duplicate name or duplicate id on insert
    #[error("{entity} conflict: {message}")]
    Conflict { entity: Entity, message: String },

    /// Subject still has tasks and cascade was not requested
    #[error("Subject {subject_id} still has {task_count} task(s); delete them first or cascade")]
    Dependency { subject_id: String, task_count: usize },

    /// Storage adapter errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Alarm service refused or failed a request
    #[error("Alarm error: {0}")]
    Alarm(#[from] AlarmError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn conflict(entity: Entity, message: impl Into<String>) -> Self {
        CoreError::Conflict {
            entity,
            message: message.into(),
        }
    }

    /// True for lookup misses, regardless of entity kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }
}

/// Entity kinds named in not-found and conflict errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Task,
    Subject,
    Notification,
    User,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Entity::Task => "Task",
            Entity::Subject => "Subject",
            Entity::Notification => "Notification",
            Entity::User => "User",
        };
        f.write_str(name)
    }
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text is empty after trimming
    #[error("'{field}' must not be blank")]
    Blank { field: &'static str },

    /// Text exceeds its length limit
    #[error("'{field}' must be at most {max} characters (got {len})")]
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },

    /// Color is not six hex digits
    #[error("Invalid color '{0}': expected #RRGGBB")]
    InvalidColor(String),

    /// Due time lies before the current time
    #[error("Due time {due} is before now ({now})")]
    DueInPast {
        due: chrono::DateTime<chrono::Utc>,
        now: chrono::DateTime<chrono::Utc>,
    },

    /// Urgency window is zero or negative
    #[error("Urgency window must be positive (got {minutes} minutes)")]
    NonPositiveWindow { minutes: i64 },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Connection mutex was poisoned by a panicking writer
    #[error("Database connection poisoned")]
    Poisoned,

    /// Stored row could not be decoded
    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: &'static str, message: String },
}

/// Errors reported by a platform alarm service.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AlarmError {
    /// Exact delivery capability is not granted right now
    #[error("Exact alarms are not permitted")]
    ExactDenied,

    /// Any other platform failure
    #[error("Alarm service failure: {0}")]
    Platform(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Home/config directory could not be resolved or created
    #[error("Cannot prepare data directory {path}: {message}")]
    DataDir { path: PathBuf, message: String },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown key in dot-path access
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
