mod config;
pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use config::{Config, NotificationsConfig, ProfileConfig, RewardsConfig, TasksConfig, UiConfig};
pub use sqlite::{SqliteRewardRepository, SqliteStore};

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Returns `~/.config/unitask[-dev]/` based on UNITASK_ENV.
///
/// Set UNITASK_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("UNITASK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("unitask-dev")
    } else {
        base_dir.join("unitask")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
