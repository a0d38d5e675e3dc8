//! SQLite-backed repositories.
//!
//! One [`SqliteStore`] owns the connection and serves the task, subject,
//! notification and user ports. Reward state is scoped (one row per scope)
//! and served by [`SqliteRewardRepository`]. After every successful write the
//! affected collection is re-read and pushed to its watch channel.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use super::{data_dir, migrations};
use crate::error::{CoreError, Entity, Result, StorageError};
use crate::model::{NotificationSetting, Subject, Task, UserProfile, MAX_TOTAL_XP};
use crate::repository::{
    NotificationRepository, RewardRepository, SubjectRepository, TaskRepository, UserRepository,
};
use crate::reward::RewardState;

const DB_FILE: &str = "unitask.db";

/// Parse an RFC 3339 column.
fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        subject_id: row.get(2)?,
        due_at: parse_timestamp(row, 3)?,
        created_at: parse_timestamp(row, 4)?,
        is_completed: row.get(5)?,
    })
}

fn row_to_subject(row: &rusqlite::Row) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: row.get(0)?,
        name: row.get(1)?,
        color_hex: row.get(2)?,
        teacher: row.get(3)?,
    })
}

fn row_to_notification(row: &rusqlite::Row) -> rusqlite::Result<NotificationSetting> {
    Ok(NotificationSetting {
        id: row.get(0)?,
        task_id: row.get(1)?,
        enabled: row.get(2)?,
        trigger_at_millis: row.get(3)?,
        repeat_interval_millis: row.get(4)?,
        use_minutes: row.get(5)?,
        exact: row.get(6)?,
    })
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(0)?,
        display_name: row.get(1)?,
        total_xp: row.get(2)?,
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Map a unique-constraint failure to a conflict, anything else to storage.
fn insert_error(entity: Entity, err: rusqlite::Error) -> CoreError {
    if is_constraint_violation(&err) {
        CoreError::conflict(entity, err.to_string())
    } else {
        err.into()
    }
}

fn load_tasks(conn: &Connection) -> rusqlite::Result<Vec<Task>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, subject_id, due_at, created_at, is_completed
         FROM tasks ORDER BY due_at ASC, created_at ASC",
    )?;
    let rows = stmt.query_map([], row_to_task)?;
    rows.collect()
}

fn load_subjects(conn: &Connection) -> rusqlite::Result<Vec<Subject>> {
    let mut stmt =
        conn.prepare("SELECT id, name, color_hex, teacher FROM subjects ORDER BY name COLLATE NOCASE")?;
    let rows = stmt.query_map([], row_to_subject)?;
    rows.collect()
}

fn load_notifications(conn: &Connection) -> rusqlite::Result<Vec<NotificationSetting>> {
    let mut stmt = conn.prepare(
        "SELECT id, task_id, enabled, trigger_at_millis, repeat_interval_millis, use_minutes, exact
         FROM notifications ORDER BY trigger_at_millis ASC",
    )?;
    let rows = stmt.query_map([], row_to_notification)?;
    rows.collect()
}

fn load_users(conn: &Connection) -> rusqlite::Result<Vec<UserProfile>> {
    let mut stmt = conn.prepare("SELECT id, display_name, total_xp FROM users ORDER BY id")?;
    let rows = stmt.query_map([], row_to_user)?;
    rows.collect()
}

/// SQLite database for subjects, tasks, reminders and profiles.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    tasks: watch::Sender<Vec<Task>>,
    subjects: watch::Sender<Vec<Subject>>,
    notifications: watch::Sender<Vec<NotificationSetting>>,
    users: watch::Sender<Vec<UserProfile>>,
    rewards: Mutex<HashMap<String, Arc<watch::Sender<RewardState>>>>,
}

impl SqliteStore {
    /// Open the database at `~/.config/unitask/unitask.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(data_dir()?.join(DB_FILE))
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "opened database");
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn).map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        let store = Self {
            tasks: watch::channel(load_tasks(&conn)?).0,
            subjects: watch::channel(load_subjects(&conn)?).0,
            notifications: watch::channel(load_notifications(&conn)?).0,
            users: watch::channel(load_users(&conn)?).0,
            rewards: Mutex::new(HashMap::new()),
            conn: Mutex::new(conn),
        };
        Ok(store)
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Storage(StorageError::Poisoned))
    }

    /// The reward channel for `scope`, shared by every repository handle on
    /// this store.
    fn reward_channel(&self, scope: &str) -> Result<Arc<watch::Sender<RewardState>>> {
        let mut channels = self
            .rewards
            .lock()
            .map_err(|_| CoreError::Storage(StorageError::Poisoned))?;
        if let Some(tx) = channels.get(scope) {
            return Ok(tx.clone());
        }
        let initial = {
            let conn = self.lock()?;
            SqliteRewardRepository::read(&conn, scope)?
        };
        let tx = Arc::new(watch::channel(initial).0);
        channels.insert(scope.to_string(), tx.clone());
        Ok(tx)
    }

    fn refresh_tasks(&self, conn: &Connection) -> Result<()> {
        self.tasks.send_replace(load_tasks(conn)?);
        Ok(())
    }

    fn refresh_subjects(&self, conn: &Connection) -> Result<()> {
        self.subjects.send_replace(load_subjects(conn)?);
        Ok(())
    }

    fn refresh_notifications(&self, conn: &Connection) -> Result<()> {
        self.notifications.send_replace(load_notifications(conn)?);
        Ok(())
    }

    fn refresh_users(&self, conn: &Connection) -> Result<()> {
        self.users.send_replace(load_users(conn)?);
        Ok(())
    }

    fn get_task_row(conn: &Connection, id: &str) -> rusqlite::Result<Option<Task>> {
        conn.query_row(
            "SELECT id, title, subject_id, due_at, created_at, is_completed
             FROM tasks WHERE id = ?1",
            params![id],
            row_to_task,
        )
        .optional()
    }
}

impl TaskRepository for SqliteStore {
    fn observe(&self) -> watch::Receiver<Vec<Task>> {
        self.tasks.subscribe()
    }

    fn list(&self) -> Result<Vec<Task>> {
        let conn = self.lock()?;
        Ok(load_tasks(&conn)?)
    }

    fn get(&self, id: &str) -> Result<Option<Task>> {
        let conn = self.lock()?;
        Ok(Self::get_task_row(&conn, id)?)
    }

    fn add(&self, task: &Task) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks (id, title, subject_id, due_at, created_at, is_completed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                task.id,
                task.title,
                task.subject_id,
                task.due_at.to_rfc3339(),
                task.created_at.to_rfc3339(),
                task.is_completed,
            ],
        )
        .map_err(|e| insert_error(Entity::Task, e))?;
        self.refresh_tasks(&conn)
    }

    fn update(&self, task: &Task) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE tasks SET title = ?2, subject_id = ?3, due_at = ?4, is_completed = ?5
             WHERE id = ?1",
            params![
                task.id,
                task.title,
                task.subject_id,
                task.due_at.to_rfc3339(),
                task.is_completed,
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found(Entity::Task, &task.id));
        }
        self.refresh_tasks(&conn)
    }

    fn complete(&self, id: &str) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE tasks SET is_completed = 1 WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found(Entity::Task, id));
        }
        self.refresh_tasks(&conn)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(CoreError::not_found(Entity::Task, id));
        }
        self.refresh_tasks(&conn)
    }
}

impl SubjectRepository for SqliteStore {
    fn observe(&self) -> watch::Receiver<Vec<Subject>> {
        self.subjects.subscribe()
    }

    fn list(&self) -> Result<Vec<Subject>> {
        let conn = self.lock()?;
        Ok(load_subjects(&conn)?)
    }

    fn get(&self, id: &str) -> Result<Option<Subject>> {
        let conn = self.lock()?;
        let subject = conn
            .query_row(
                "SELECT id, name, color_hex, teacher FROM subjects WHERE id = ?1",
                params![id],
                row_to_subject,
            )
            .optional()?;
        Ok(subject)
    }

    fn add(&self, subject: &Subject) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO subjects (id, name, color_hex, teacher) VALUES (?1, ?2, ?3, ?4)",
            params![subject.id, subject.name, subject.color_hex, subject.teacher],
        )
        .map_err(|e| insert_error(Entity::Subject, e))?;
        self.refresh_subjects(&conn)
    }

    fn edit(&self, subject: &Subject) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE subjects SET name = ?2, color_hex = ?3, teacher = ?4 WHERE id = ?1",
                params![subject.id, subject.name, subject.color_hex, subject.teacher],
            )
            .map_err(|e| insert_error(Entity::Subject, e))?;
        if changed == 0 {
            return Err(CoreError::not_found(Entity::Subject, &subject.id));
        }
        self.refresh_subjects(&conn)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM subjects WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(CoreError::not_found(Entity::Subject, id));
        }
        self.refresh_subjects(&conn)
    }

    fn delete_with_tasks(&self, id: &str) -> Option<Result<usize>> {
        Some(self.delete_subject_cascade(id))
    }
}

impl SqliteStore {
    /// Delete a subject and all of its tasks in a single transaction.
    ///
    /// Returns the number of tasks removed.
    pub fn delete_subject_cascade(&self, id: &str) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM tasks WHERE subject_id = ?1", params![id])?;
        let changed = tx.execute("DELETE FROM subjects WHERE id = ?1", params![id])?;
        if changed == 0 {
            // dropping the transaction rolls back the task deletes
            return Err(CoreError::not_found(Entity::Subject, id));
        }
        tx.commit()?;
        self.refresh_tasks(&conn)?;
        self.refresh_subjects(&conn)?;
        Ok(removed)
    }
}

impl NotificationRepository for SqliteStore {
    fn observe(&self) -> watch::Receiver<Vec<NotificationSetting>> {
        self.notifications.subscribe()
    }

    fn get(&self, id: &str) -> Result<Option<NotificationSetting>> {
        let conn = self.lock()?;
        let setting = conn
            .query_row(
                "SELECT id, task_id, enabled, trigger_at_millis, repeat_interval_millis,
                        use_minutes, exact
                 FROM notifications WHERE id = ?1",
                params![id],
                row_to_notification,
            )
            .optional()?;
        Ok(setting)
    }

    fn save(&self, setting: &NotificationSetting) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO notifications
                (id, task_id, enabled, trigger_at_millis, repeat_interval_millis, use_minutes, exact)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                task_id = excluded.task_id,
                enabled = excluded.enabled,
                trigger_at_millis = excluded.trigger_at_millis,
                repeat_interval_millis = excluded.repeat_interval_millis,
                use_minutes = excluded.use_minutes,
                exact = excluded.exact",
            params![
                setting.id,
                setting.task_id,
                setting.enabled,
                setting.trigger_at_millis,
                setting.repeat_interval_millis,
                setting.use_minutes,
                setting.exact,
            ],
        )?;
        self.refresh_notifications(&conn)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM notifications WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(CoreError::not_found(Entity::Notification, id));
        }
        self.refresh_notifications(&conn)
    }
}

impl UserRepository for SqliteStore {
    fn observe(&self) -> watch::Receiver<Vec<UserProfile>> {
        self.users.subscribe()
    }

    fn upsert(&self, user: &UserProfile) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (id, display_name, total_xp) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                total_xp = excluded.total_xp",
            params![user.id, user.display_name, user.total_xp],
        )?;
        self.refresh_users(&conn)
    }

    /// Saturates at [`MAX_TOTAL_XP`]; SQLite would otherwise turn the
    /// column into a REAL past `i64::MAX`.
    fn add_total_xp(&self, id: &str, amount: u64) -> Result<UserProfile> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut user = tx
            .query_row(
                "SELECT id, display_name, total_xp FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()?
            .ok_or_else(|| CoreError::not_found(Entity::User, id))?;
        user.total_xp = user.total_xp.saturating_add(amount).min(MAX_TOTAL_XP);
        tx.execute(
            "UPDATE users SET total_xp = ?2 WHERE id = ?1",
            params![id, user.total_xp],
        )?;
        tx.commit()?;
        self.refresh_users(&conn)?;
        Ok(user)
    }
}

/// Reward state for one scope (a user id, or `"global"`).
///
/// Handles on the same store and scope share one watch channel, so each sees
/// the others' writes.
pub struct SqliteRewardRepository {
    store: Arc<SqliteStore>,
    scope: String,
    tx: Arc<watch::Sender<RewardState>>,
}

impl SqliteRewardRepository {
    pub fn new(store: Arc<SqliteStore>, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        let tx = store.reward_channel(&scope).unwrap_or_else(|e| {
            tracing::warn!(error = %e, scope = %scope, "failed to read reward state");
            Arc::new(watch::channel(RewardState::default()).0)
        });
        Self { store, scope, tx }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    fn read(conn: &Connection, scope: &str) -> Result<RewardState> {
        let row = conn
            .query_row(
                "SELECT xp, level FROM rewards WHERE scope = ?1",
                params![scope],
                |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u32>(1)?)),
            )
            .optional()?;
        Ok(row
            .map(|(xp, level)| RewardState { xp, level })
            .unwrap_or_default())
    }

    fn write(conn: &Connection, scope: &str, state: RewardState) -> Result<()> {
        conn.execute(
            "INSERT INTO rewards (scope, xp, level) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope) DO UPDATE SET xp = excluded.xp, level = excluded.level",
            params![scope, state.xp, state.level],
        )?;
        Ok(())
    }
}

impl RewardRepository for SqliteRewardRepository {
    fn observe(&self) -> watch::Receiver<RewardState> {
        self.tx.subscribe()
    }

    fn state(&self) -> Result<RewardState> {
        let conn = self.store.lock()?;
        Self::read(&conn, &self.scope)
    }

    fn add_xp(&self, amount: u64) -> Result<RewardState> {
        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let next = Self::read(&tx, &self.scope)?.award(amount);
        Self::write(&tx, &self.scope, next)?;
        tx.commit()?;
        self.tx.send_replace(next);
        Ok(next)
    }

    fn reset(&self) -> Result<()> {
        let conn = self.store.lock()?;
        Self::write(&conn, &self.scope, RewardState::default())?;
        self.tx.send_replace(RewardState::default());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn subject(name: &str) -> Subject {
        Subject::new(name.into(), "#112233".into(), None)
    }

    fn task_for(subject_id: &str, title: &str) -> Task {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        Task::new(title.into(), subject_id.into(), at + Duration::days(1), at)
    }

    #[test]
    fn task_round_trip() {
        let store = SqliteStore::open_memory().unwrap();
        let t = task_for("s1", "Essay draft");
        TaskRepository::add(&store, &t).unwrap();

        let loaded = TaskRepository::get(&store, &t.id).unwrap().unwrap();
        assert_eq!(loaded, t);
    }

    #[test]
    fn update_and_complete_task() {
        let store = SqliteStore::open_memory().unwrap();
        let mut t = task_for("s1", "Essay draft");
        TaskRepository::add(&store, &t).unwrap();

        t.title = "Essay final".into();
        TaskRepository::update(&store, &t).unwrap();
        store.complete(&t.id).unwrap();

        let loaded = TaskRepository::get(&store, &t.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Essay final");
        assert!(loaded.is_completed);
    }

    #[test]
    fn missing_task_is_not_found() {
        let store = SqliteStore::open_memory().unwrap();
        assert!(store.complete("nope").unwrap_err().is_not_found());
        assert!(TaskRepository::delete(&store, "nope").unwrap_err().is_not_found());
    }

    #[test]
    fn duplicate_task_id_conflicts() {
        let store = SqliteStore::open_memory().unwrap();
        let t = task_for("s1", "Essay");
        TaskRepository::add(&store, &t).unwrap();
        let err = TaskRepository::add(&store, &t).unwrap_err();
        assert!(matches!(err, CoreError::Conflict { entity: Entity::Task, .. }));
    }

    #[test]
    fn subject_name_collision_is_conflict() {
        let store = SqliteStore::open_memory().unwrap();
        SubjectRepository::add(&store, &subject("Biology")).unwrap();
        let err = SubjectRepository::add(&store, &subject("BIOLOGY")).unwrap_err();
        assert!(matches!(err, CoreError::Conflict { entity: Entity::Subject, .. }));
    }

    #[test]
    fn cascade_delete_is_atomic() {
        let store = SqliteStore::open_memory().unwrap();
        let bio = subject("Biology");
        let chem = subject("Chemistry");
        SubjectRepository::add(&store, &bio).unwrap();
        SubjectRepository::add(&store, &chem).unwrap();
        TaskRepository::add(&store, &task_for(&bio.id, "Cells")).unwrap();
        TaskRepository::add(&store, &task_for(&bio.id, "Genetics")).unwrap();
        TaskRepository::add(&store, &task_for(&chem.id, "Titration")).unwrap();

        assert_eq!(store.delete_subject_cascade(&bio.id).unwrap(), 2);

        let tasks = TaskRepository::list(&store).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].subject_id, chem.id);
        assert!(SubjectRepository::get(&store, &bio.id).unwrap().is_none());
    }

    #[test]
    fn cascade_delete_of_missing_subject_rolls_back() {
        let store = SqliteStore::open_memory().unwrap();
        // orphan task pointing at a subject id that was never stored
        TaskRepository::add(&store, &task_for("ghost", "Orphan")).unwrap();
        assert!(store.delete_subject_cascade("ghost").unwrap_err().is_not_found());
        assert_eq!(TaskRepository::list(&store).unwrap().len(), 1);
    }

    #[test]
    fn observers_see_writes() {
        let store = SqliteStore::open_memory().unwrap();
        let mut rx = TaskRepository::observe(&store);
        rx.borrow_and_update();
        TaskRepository::add(&store, &task_for("s1", "Quiz prep")).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow().len(), 1);
    }

    #[test]
    fn notification_upsert() {
        let store = SqliteStore::open_memory().unwrap();
        let mut n = NotificationSetting::repeating(Some("t1".into()), 5_000, 120_000);
        store.save(&n).unwrap();
        n.trigger_at_millis = 9_000;
        store.save(&n).unwrap();

        let loaded = NotificationRepository::get(&store, &n.id).unwrap().unwrap();
        assert_eq!(loaded, n);
        assert_eq!(NotificationRepository::list(&store).unwrap().len(), 1);
    }

    #[test]
    fn reward_scopes_are_independent() {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let a = SqliteRewardRepository::new(store.clone(), "alice");
        let b = SqliteRewardRepository::new(store.clone(), "bob");

        assert_eq!(a.add_xp(250).unwrap(), RewardState { xp: 150, level: 2 });
        assert_eq!(b.state().unwrap(), RewardState::default());

        // a second handle on the same scope reads the persisted row
        let a2 = SqliteRewardRepository::new(store, "alice");
        assert_eq!(a2.state().unwrap(), RewardState { xp: 150, level: 2 });
        a2.reset().unwrap();
        assert_eq!(a.state().unwrap(), RewardState::default());
    }

    #[test]
    fn reward_handles_on_one_scope_share_observers() {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let first = SqliteRewardRepository::new(store.clone(), "alice");
        let second = SqliteRewardRepository::new(store.clone(), "alice");
        let other = SqliteRewardRepository::new(store, "bob");
        let rx = second.observe();

        first.add_xp(120).unwrap();
        assert_eq!(*rx.borrow(), RewardState { xp: 20, level: 2 });
        assert_eq!(*other.observe().borrow(), RewardState::default());
    }

    #[test]
    fn total_xp_saturates_and_store_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unitask.db");
        {
            let store = SqliteStore::open_at(&path).unwrap();
            store
                .upsert(&UserProfile {
                    total_xp: MAX_TOTAL_XP - 5,
                    ..UserProfile::new("u1", "Ana")
                })
                .unwrap();
            assert_eq!(store.add_total_xp("u1", 10).unwrap().total_xp, MAX_TOTAL_XP);
            assert_eq!(store.add_total_xp("u1", u64::MAX).unwrap().total_xp, MAX_TOTAL_XP);
            assert!(store.add_total_xp("ghost", 1).unwrap_err().is_not_found());
        }
        let store = SqliteStore::open_at(&path).unwrap();
        let users = UserRepository::list(&store).unwrap();
        assert_eq!(users[0].total_xp, MAX_TOTAL_XP);
    }

    #[test]
    fn reopening_file_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unitask.db");
        let bio = subject("Biology");
        {
            let store = SqliteStore::open_at(&path).unwrap();
            SubjectRepository::add(&store, &bio).unwrap();
        }
        let store = SqliteStore::open_at(&path).unwrap();
        assert_eq!(SubjectRepository::list(&store).unwrap(), vec![bio]);
    }
}
