//! Volatile backends.
//!
//! Each repository owns one `watch::Sender` holding the whole collection.
//! Writes go through `send_if_modified`, which runs the read-compute-replace
//! step under the channel's lock and only notifies observers on success.

use tokio::sync::watch;

use crate::error::{CoreError, Entity, Result};
use crate::model::{NotificationSetting, Subject, Task, UserProfile, MAX_TOTAL_XP};
use crate::repository::{
    NotificationRepository, RewardRepository, SubjectRepository, TaskRepository, UserRepository,
};
use crate::reward::RewardState;

/// Apply `f` to the collection; observers are notified only if it returns `Ok`.
fn mutate<T, R>(
    tx: &watch::Sender<Vec<T>>,
    f: impl FnOnce(&mut Vec<T>) -> Result<R>,
) -> Result<R> {
    let mut outcome = None;
    tx.send_if_modified(|items| {
        let result = f(items);
        let changed = result.is_ok();
        outcome = Some(result);
        changed
    });
    outcome.unwrap_or_else(|| unreachable!("send_if_modified always runs its closure"))
}

fn channel<T>(initial: T) -> watch::Sender<T> {
    watch::channel(initial).0
}

pub struct MemoryTaskRepository {
    tx: watch::Sender<Vec<Task>>,
}

impl Default for MemoryTaskRepository {
    fn default() -> Self {
        Self { tx: channel(Vec::new()) }
    }
}

impl TaskRepository for MemoryTaskRepository {
    fn observe(&self) -> watch::Receiver<Vec<Task>> {
        self.tx.subscribe()
    }

    fn add(&self, task: &Task) -> Result<()> {
        mutate(&self.tx, |tasks| {
            if tasks.iter().any(|t| t.id == task.id) {
                return Err(CoreError::conflict(
                    Entity::Task,
                    format!("id {} already exists", task.id),
                ));
            }
            tasks.push(task.clone());
            Ok(())
        })
    }

    fn update(&self, task: &Task) -> Result<()> {
        mutate(&self.tx, |tasks| {
            let slot = tasks
                .iter_mut()
                .find(|t| t.id == task.id)
                .ok_or_else(|| CoreError::not_found(Entity::Task, &task.id))?;
            *slot = task.clone();
            Ok(())
        })
    }

    fn complete(&self, id: &str) -> Result<()> {
        mutate(&self.tx, |tasks| {
            let slot = tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| CoreError::not_found(Entity::Task, id))?;
            slot.is_completed = true;
            Ok(())
        })
    }

    fn delete(&self, id: &str) -> Result<()> {
        mutate(&self.tx, |tasks| {
            let before = tasks.len();
            tasks.retain(|t| t.id != id);
            if tasks.len() == before {
                return Err(CoreError::not_found(Entity::Task, id));
            }
            Ok(())
        })
    }
}

pub struct MemorySubjectRepository {
    tx: watch::Sender<Vec<Subject>>,
}

impl Default for MemorySubjectRepository {
    fn default() -> Self {
        Self { tx: channel(Vec::new()) }
    }
}

impl SubjectRepository for MemorySubjectRepository {
    fn observe(&self) -> watch::Receiver<Vec<Subject>> {
        self.tx.subscribe()
    }

    fn add(&self, subject: &Subject) -> Result<()> {
        mutate(&self.tx, |subjects| {
            if subjects.iter().any(|s| s.id == subject.id) {
                return Err(CoreError::conflict(
                    Entity::Subject,
                    format!("id {} already exists", subject.id),
                ));
            }
            subjects.push(subject.clone());
            Ok(())
        })
    }

    fn edit(&self, subject: &Subject) -> Result<()> {
        mutate(&self.tx, |subjects| {
            let slot = subjects
                .iter_mut()
                .find(|s| s.id == subject.id)
                .ok_or_else(|| CoreError::not_found(Entity::Subject, &subject.id))?;
            *slot = subject.clone();
            Ok(())
        })
    }

    fn delete(&self, id: &str) -> Result<()> {
        mutate(&self.tx, |subjects| {
            let before = subjects.len();
            subjects.retain(|s| s.id != id);
            if subjects.len() == before {
                return Err(CoreError::not_found(Entity::Subject, id));
            }
            Ok(())
        })
    }
}

pub struct MemoryRewardRepository {
    tx: watch::Sender<RewardState>,
}

impl Default for MemoryRewardRepository {
    fn default() -> Self {
        Self {
            tx: channel(RewardState::default()),
        }
    }
}

impl RewardRepository for MemoryRewardRepository {
    fn observe(&self) -> watch::Receiver<RewardState> {
        self.tx.subscribe()
    }

    fn add_xp(&self, amount: u64) -> Result<RewardState> {
        let mut next = RewardState::default();
        self.tx.send_if_modified(|state| {
            next = state.award(amount);
            let changed = next != *state;
            *state = next;
            changed
        });
        Ok(next)
    }

    fn reset(&self) -> Result<()> {
        self.tx.send_replace(RewardState::default());
        Ok(())
    }
}

pub struct MemoryNotificationRepository {
    tx: watch::Sender<Vec<NotificationSetting>>,
}

impl Default for MemoryNotificationRepository {
    fn default() -> Self {
        Self { tx: channel(Vec::new()) }
    }
}

impl NotificationRepository for MemoryNotificationRepository {
    fn observe(&self) -> watch::Receiver<Vec<NotificationSetting>> {
        self.tx.subscribe()
    }

    fn save(&self, setting: &NotificationSetting) -> Result<()> {
        mutate(&self.tx, |settings| {
            match settings.iter_mut().find(|n| n.id == setting.id) {
                Some(slot) => *slot = setting.clone(),
                None => settings.push(setting.clone()),
            }
            Ok(())
        })
    }

    fn delete(&self, id: &str) -> Result<()> {
        mutate(&self.tx, |settings| {
            let before = settings.len();
            settings.retain(|n| n.id != id);
            if settings.len() == before {
                return Err(CoreError::not_found(Entity::Notification, id));
            }
            Ok(())
        })
    }
}

pub struct MemoryUserRepository {
    tx: watch::Sender<Vec<UserProfile>>,
}

impl Default for MemoryUserRepository {
    fn default() -> Self {
        Self { tx: channel(Vec::new()) }
    }
}

impl UserRepository for MemoryUserRepository {
    fn observe(&self) -> watch::Receiver<Vec<UserProfile>> {
        self.tx.subscribe()
    }

    fn upsert(&self, user: &UserProfile) -> Result<()> {
        mutate(&self.tx, |users| {
            match users.iter_mut().find(|u| u.id == user.id) {
                Some(slot) => *slot = user.clone(),
                None => users.push(user.clone()),
            }
            Ok(())
        })
    }

    fn add_total_xp(&self, id: &str, amount: u64) -> Result<UserProfile> {
        mutate(&self.tx, |users| {
            let slot = users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or_else(|| CoreError::not_found(Entity::User, id))?;
            slot.total_xp = slot.total_xp.saturating_add(amount).min(MAX_TOTAL_XP);
            Ok(slot.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(subject_id: &str) -> Task {
        let now = Utc::now();
        Task::new("Problem set".into(), subject_id.into(), now, now)
    }

    #[test]
    fn duplicate_task_id_conflicts() {
        let repo = MemoryTaskRepository::default();
        let t = task("s1");
        repo.add(&t).unwrap();
        let err = repo.add(&t).unwrap_err();
        assert!(matches!(err, CoreError::Conflict { entity: Entity::Task, .. }));
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn missing_ids_are_not_found() {
        let repo = MemoryTaskRepository::default();
        assert!(repo.complete("nope").unwrap_err().is_not_found());
        assert!(repo.delete("nope").unwrap_err().is_not_found());
        assert!(repo.update(&task("s1")).unwrap_err().is_not_found());
    }

    #[test]
    fn failed_mutation_does_not_notify() {
        let repo = MemoryTaskRepository::default();
        let mut rx = repo.observe();
        rx.borrow_and_update();
        let _ = repo.delete("nope");
        assert!(!rx.has_changed().unwrap());

        repo.add(&task("s1")).unwrap();
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn complete_flips_flag() {
        let repo = MemoryTaskRepository::default();
        let t = task("s1");
        repo.add(&t).unwrap();
        repo.complete(&t.id).unwrap();
        repo.complete(&t.id).unwrap();
        assert!(repo.get(&t.id).unwrap().unwrap().is_completed);
    }

    #[test]
    fn reward_add_and_reset() {
        let repo = MemoryRewardRepository::default();
        let state = repo.add_xp(250).unwrap();
        assert_eq!(state, RewardState { xp: 150, level: 2 });
        assert_eq!(repo.state().unwrap(), state);

        repo.reset().unwrap();
        assert_eq!(repo.state().unwrap(), RewardState::default());
    }

    #[test]
    fn notification_save_replaces_by_id() {
        let repo = MemoryNotificationRepository::default();
        let mut n = NotificationSetting::one_shot(None, 1_000);
        repo.save(&n).unwrap();
        n.enabled = false;
        repo.save(&n).unwrap();
        let all = repo.list().unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].enabled);
    }

    #[test]
    fn user_total_xp_accumulates() {
        let repo = MemoryUserRepository::default();
        repo.upsert(&UserProfile::new("u1", "Ana")).unwrap();
        repo.add_total_xp("u1", 40).unwrap();
        let u = repo.add_total_xp("u1", 60).unwrap();
        assert_eq!(u.total_xp, 100);
        assert!(repo.add_total_xp("ghost", 1).unwrap_err().is_not_found());
    }

    #[test]
    fn user_total_xp_saturates_at_ceiling() {
        let repo = MemoryUserRepository::default();
        repo.upsert(&UserProfile {
            total_xp: MAX_TOTAL_XP - 5,
            ..UserProfile::new("u1", "Ana")
        })
        .unwrap();
        assert_eq!(repo.add_total_xp("u1", 10).unwrap().total_xp, MAX_TOTAL_XP);
        assert_eq!(repo.add_total_xp("u1", u64::MAX).unwrap().total_xp, MAX_TOTAL_XP);
    }
}
