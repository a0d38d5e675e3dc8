//! Database schema migrations for unitask.
//!
//! Migrations are versioned and applied automatically when opening the store.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Schema version after all migrations have run.
pub const CURRENT_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    }) {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    tracing::debug!(version, "schema migrated");
    Ok(())
}

/// Migration v1: subjects, tasks and reward state.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS subjects (
            id        TEXT PRIMARY KEY,
            name      TEXT NOT NULL,
            color_hex TEXT NOT NULL,
            teacher   TEXT
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id           TEXT PRIMARY KEY,
            title        TEXT NOT NULL,
            subject_id   TEXT NOT NULL,
            due_at       TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            is_completed INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS rewards (
            scope TEXT PRIMARY KEY,
            xp    INTEGER NOT NULL DEFAULT 0,
            level INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_subject_id ON tasks(subject_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_due_at ON tasks(due_at);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: reminders and the pending alarm queue.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS notifications (
            id                     TEXT PRIMARY KEY,
            task_id                TEXT,
            enabled                INTEGER NOT NULL DEFAULT 1,
            trigger_at_millis      INTEGER NOT NULL,
            repeat_interval_millis INTEGER,
            use_minutes            INTEGER NOT NULL DEFAULT 0,
            exact                  INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS alarm_requests (
            id                TEXT PRIMARY KEY,
            task_id           TEXT,
            label             TEXT NOT NULL DEFAULT '',
            kind              TEXT NOT NULL,
            trigger_at_millis INTEGER NOT NULL,
            interval_millis   INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_alarm_requests_trigger ON alarm_requests(trigger_at_millis);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}

/// Migration v3: user profiles and case-insensitive subject names.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id           TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            total_xp     INTEGER NOT NULL DEFAULT 0
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_subjects_name_nocase
            ON subjects(name COLLATE NOCASE);",
    )?;
    set_schema_version(&tx, 3)?;
    tx.commit()
}
