//! # UniTask Core Library
//!
//! Business logic for UniTask, a study planner for university students:
//! subjects, assignment tasks with due dates, reminders, and an XP/level
//! reward loop. The `unitask` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Model**: plain records (`Subject`, `Task`, `NotificationSetting`,
//!   `UserProfile`) with field validation
//! - **Repositories**: synchronous ports with `watch`-based live views,
//!   backed by memory or SQLite and bundled per backend in [`Repositories`]
//! - **Use-cases**: one service per aggregate, composed by [`UniTask`]
//! - **Alarm**: [`AlarmScheduler`] policy over the platform [`AlarmService`]
//! - **Storage**: SQLite persistence and TOML configuration
//!
//! ## Key Components
//!
//! - [`TaskService`]: task lifecycle and urgent/all-task feeds
//! - [`apply_xp`] / [`profile_level`]: the two leveling formulas
//! - [`Config`]: application configuration management

pub mod alarm;
pub mod clock;
pub mod error;
pub mod model;
pub mod repository;
pub mod reward;
pub mod storage;
pub mod usecase;

pub use alarm::{AlarmRequest, AlarmScheduler, AlarmService, DeliveryHandle, SqliteAlarmQueue};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AlarmError, ConfigError, CoreError, Result, StorageError, ValidationError};
pub use model::{NotificationSetting, Subject, Task, UserProfile};
pub use repository::Repositories;
pub use reward::{apply_xp, profile_level, ProfileLevel, RewardState};
pub use storage::{Config, SqliteStore};
pub use usecase::{
    Completion, LeaderboardEntry, NotificationService, RewardService, SubjectService, TaskFeed,
    TaskService, UniTask,
};
