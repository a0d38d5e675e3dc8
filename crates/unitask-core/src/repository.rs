//! Repository ports.
//!
//! Each port is a synchronous CRUD contract plus a live view backed by a
//! `tokio::sync::watch` channel: observers always see the latest whole
//! collection, and every successful mutation re-emits it.
//!
//! Backends (in-memory, SQLite) are picked when a [`Repositories`] bundle is
//! composed; use-cases only ever hold the trait objects.

use std::sync::Arc;
use tokio::sync::watch;

use crate::alarm::AlarmService;
use crate::error::Result;
use crate::model::{NotificationSetting, Subject, Task, UserProfile};
use crate::reward::RewardState;

pub trait TaskRepository: Send + Sync {
    /// Live view of every stored task.
    fn observe(&self) -> watch::Receiver<Vec<Task>>;

    /// Current snapshot.
    fn list(&self) -> Result<Vec<Task>> {
        Ok(self.observe().borrow().clone())
    }

    fn get(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.list()?.into_iter().find(|t| t.id == id))
    }

    /// Insert; fails with a conflict when the id is taken.
    fn add(&self, task: &Task) -> Result<()>;

    /// Replace the record with the same id; fails when absent.
    fn update(&self, task: &Task) -> Result<()>;

    /// Flip `is_completed` to true; fails when absent.
    fn complete(&self, id: &str) -> Result<()>;

    fn delete(&self, id: &str) -> Result<()>;
}

pub trait SubjectRepository: Send + Sync {
    fn observe(&self) -> watch::Receiver<Vec<Subject>>;

    fn list(&self) -> Result<Vec<Subject>> {
        Ok(self.observe().borrow().clone())
    }

    fn get(&self, id: &str) -> Result<Option<Subject>> {
        Ok(self.list()?.into_iter().find(|s| s.id == id))
    }

    fn add(&self, subject: &Subject) -> Result<()>;

    fn edit(&self, subject: &Subject) -> Result<()>;

    fn delete(&self, id: &str) -> Result<()>;

    /// Backends with real transactions delete a subject and its tasks in one
    /// step. `None` means unsupported and the caller deletes in order itself.
    fn delete_with_tasks(&self, _id: &str) -> Option<Result<usize>> {
        None
    }
}

pub trait RewardRepository: Send + Sync {
    fn observe(&self) -> watch::Receiver<RewardState>;

    fn state(&self) -> Result<RewardState> {
        Ok(*self.observe().borrow())
    }

    fn observe_xp(&self) -> watch::Receiver<u64> {
        project(self.observe(), |s| s.xp)
    }

    fn observe_level(&self) -> watch::Receiver<u32> {
        project(self.observe(), |s| s.level)
    }

    /// Add XP and settle the level; returns the new state.
    fn add_xp(&self, amount: u64) -> Result<RewardState>;

    fn reset(&self) -> Result<()>;
}

pub trait NotificationRepository: Send + Sync {
    fn observe(&self) -> watch::Receiver<Vec<NotificationSetting>>;

    fn list(&self) -> Result<Vec<NotificationSetting>> {
        Ok(self.observe().borrow().clone())
    }

    fn get(&self, id: &str) -> Result<Option<NotificationSetting>> {
        Ok(self.list()?.into_iter().find(|n| n.id == id))
    }

    /// Insert or replace by id.
    fn save(&self, setting: &NotificationSetting) -> Result<()>;

    fn delete(&self, id: &str) -> Result<()>;
}

pub trait UserRepository: Send + Sync {
    fn observe(&self) -> watch::Receiver<Vec<UserProfile>>;

    fn list(&self) -> Result<Vec<UserProfile>> {
        Ok(self.observe().borrow().clone())
    }

    fn get(&self, id: &str) -> Result<Option<UserProfile>> {
        Ok(self.list()?.into_iter().find(|u| u.id == id))
    }

    /// Insert or replace by id.
    fn upsert(&self, user: &UserProfile) -> Result<()>;

    /// Credit lifetime XP; fails when the user is absent.
    fn add_total_xp(&self, id: &str, amount: u64) -> Result<UserProfile>;
}

/// Forward a mapped view of a watch channel.
///
/// The forwarding task needs a tokio runtime; outside one the receiver holds
/// the value at call time and never changes.
fn project<T, U, F>(mut source: watch::Receiver<T>, f: F) -> watch::Receiver<U>
where
    T: Send + Sync + 'static,
    U: PartialEq + Send + Sync + 'static,
    F: Fn(&T) -> U + Send + 'static,
{
    let (tx, rx) = watch::channel(f(&source.borrow()));
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(async move {
            while source.changed().await.is_ok() {
                let next = f(&source.borrow_and_update());
                tx.send_if_modified(|cur| {
                    if *cur == next {
                        false
                    } else {
                        *cur = next;
                        true
                    }
                });
                if tx.is_closed() {
                    break;
                }
            }
        });
    }
    rx
}

/// One backend's worth of ports, chosen at composition time.
#[derive(Clone)]
pub struct Repositories {
    pub tasks: Arc<dyn TaskRepository>,
    pub subjects: Arc<dyn SubjectRepository>,
    pub rewards: Arc<dyn RewardRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub users: Arc<dyn UserRepository>,
    pub alarms: Arc<dyn AlarmService>,
}

impl Repositories {
    /// Volatile backend with a recording alarm service.
    pub fn in_memory() -> Self {
        use crate::alarm::RecordingAlarmService;
        use crate::storage::memory::{
            MemoryNotificationRepository, MemoryRewardRepository, MemorySubjectRepository,
            MemoryTaskRepository, MemoryUserRepository,
        };

        Self {
            tasks: Arc::new(MemoryTaskRepository::default()),
            subjects: Arc::new(MemorySubjectRepository::default()),
            rewards: Arc::new(MemoryRewardRepository::default()),
            notifications: Arc::new(MemoryNotificationRepository::default()),
            users: Arc::new(MemoryUserRepository::default()),
            alarms: Arc::new(RecordingAlarmService::default()),
        }
    }

    /// Every port served by one SQLite store, reward state under `scope`.
    pub fn sqlite(store: Arc<crate::storage::SqliteStore>, scope: &str) -> Self {
        use crate::alarm::SqliteAlarmQueue;
        use crate::storage::sqlite::SqliteRewardRepository;

        Self {
            tasks: store.clone(),
            subjects: store.clone(),
            rewards: Arc::new(SqliteRewardRepository::new(store.clone(), scope)),
            notifications: store.clone(),
            users: store.clone(),
            alarms: Arc::new(SqliteAlarmQueue::new(store)),
        }
    }
}
