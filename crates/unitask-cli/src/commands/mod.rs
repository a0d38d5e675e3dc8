pub mod alarm;
pub mod completions;
pub mod config;
pub mod subject;
pub mod task;
pub mod xp;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use unitask_core::{Config, Repositories, SqliteStore, SystemClock, UniTask};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Everything a command needs: the on-disk store, settings, and the app
/// composed over them.
pub struct Session {
    pub store: Arc<SqliteStore>,
    pub config: Config,
    pub app: UniTask,
}

impl Session {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let store = Arc::new(SqliteStore::open()?);
        let repos = Repositories::sqlite(store.clone(), &config.profile.user_id);
        let app = UniTask::new(repos, Arc::new(SystemClock), &config);
        Ok(Self { store, config, app })
    }
}

/// Parse an RFC 3339 timestamp given on the command line.
pub fn parse_time(flag: &str, value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid {flag} '{value}': {e} (expected RFC 3339)"))
}

pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
