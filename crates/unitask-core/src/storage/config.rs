//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Urgency window and list defaults for tasks
//! - XP awarded per completed task
//! - Reminder delivery defaults
//! - Theme and accent color
//! - The active local profile
//!
//! Configuration is stored at `~/.config/unitask/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::alarm::MIN_REPEAT_INTERVAL_MILLIS;
use crate::error::{ConfigError, Result};
use crate::model::subject::normalize_color;

/// Task list configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    #[serde(default = "default_urgent_window_hours")]
    pub urgent_window_hours: u32,
    #[serde(default)]
    pub include_completed: bool,
}

/// Reward configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsConfig {
    #[serde(default = "default_xp_per_task")]
    pub xp_per_task: u64,
}

/// Reminder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Ask for exact delivery on new one-shot reminders.
    #[serde(default = "default_true")]
    pub default_exact: bool,
    /// Floor for repeating reminders; never below 60.
    #[serde(default = "default_min_repeat_secs")]
    pub min_repeat_secs: u64,
}

/// UI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_true")]
    pub dark_mode: bool,
    #[serde(default = "default_accent_color")]
    pub accent_color: String,
}

/// Local profile used for reward scope and leaderboard credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default = "default_display_name")]
    pub display_name: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/unitask/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
}

fn default_urgent_window_hours() -> u32 {
    48
}
fn default_xp_per_task() -> u64 {
    20
}
fn default_min_repeat_secs() -> u64 {
    60
}
fn default_true() -> bool {
    true
}
fn default_accent_color() -> String {
    "#3B82F6".into()
}
fn default_user_id() -> String {
    "local".into()
}
fn default_display_name() -> String {
    "Student".into()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            urgent_window_hours: default_urgent_window_hours(),
            include_completed: false,
        }
    }
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            xp_per_task: default_xp_per_task(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_exact: true,
            min_repeat_secs: default_min_repeat_secs(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            dark_mode: true,
            accent_color: default_accent_color(),
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            display_name: default_display_name(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> std::result::Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(unknown());
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::path()?)
    }

    /// Load from an explicit path, writing defaults there if it is missing.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::path()?)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. The caller saves.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or fails validation; `self` is left untouched in that case.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let mut next: Config = serde_json::from_value(json)?;
        next.normalize()?;
        next.validate()?;
        *self = next;
        Ok(())
    }

    fn normalize(&mut self) -> std::result::Result<(), ConfigError> {
        self.ui.accent_color =
            normalize_color(&self.ui.accent_color).map_err(|e| ConfigError::InvalidValue {
                key: "ui.accent_color".into(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.tasks.urgent_window_hours == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tasks.urgent_window_hours".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.min_repeat_millis() < MIN_REPEAT_INTERVAL_MILLIS {
            return Err(ConfigError::InvalidValue {
                key: "notifications.min_repeat_secs".into(),
                message: format!("must be at least {}", MIN_REPEAT_INTERVAL_MILLIS / 1000),
            });
        }
        if self.profile.user_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "profile.user_id".into(),
                message: "must not be blank".into(),
            });
        }
        Ok(())
    }

    pub fn urgent_window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.tasks.urgent_window_hours))
    }

    pub fn min_repeat_millis(&self) -> i64 {
        i64::try_from(self.notifications.min_repeat_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}
