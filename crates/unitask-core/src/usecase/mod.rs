//! Application use-cases, one service per aggregate, plus [`UniTask`] which
//! wires them to a backend.

pub mod notification;
pub mod reward;
pub mod subject;
pub mod task;

pub use notification::NotificationService;
pub use reward::{LeaderboardEntry, RewardService};
pub use subject::SubjectService;
pub use task::{default_urgent_window, TaskFeed, TaskService, DEFAULT_URGENT_WINDOW_HOURS};

use std::sync::Arc;

use crate::alarm::AlarmScheduler;
use crate::clock::{Clock, SystemClock};
use crate::error::{CoreError, Entity, Result};
use crate::model::UserProfile;
use crate::repository::{Repositories, SubjectRepository, TaskRepository};
use crate::reward::RewardState;
use crate::storage::Config;

/// Outcome of [`UniTask::complete_task_with_reward`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Completion {
    pub task_id: String,
    /// XP granted by this call; zero if the task was already done.
    pub xp_awarded: u64,
    pub reward: RewardState,
}

/// The composed application: services over one set of repositories.
#[derive(Clone)]
pub struct UniTask {
    repos: Repositories,
    clock: Arc<dyn Clock>,
    xp_per_task: u64,
    subjects: SubjectService,
    tasks: TaskService,
    rewards: RewardService,
    notifications: NotificationService,
}

impl UniTask {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>, config: &Config) -> Self {
        let profile = UserProfile::new(
            config.profile.user_id.clone(),
            config.profile.display_name.clone(),
        );
        let scheduler = AlarmScheduler::new(repos.alarms.clone())
            .with_min_repeat_millis(config.min_repeat_millis());

        Self {
            subjects: SubjectService::new(repos.subjects.clone(), repos.tasks.clone()),
            tasks: TaskService::new(repos.tasks.clone(), repos.subjects.clone(), clock.clone()),
            rewards: RewardService::new(repos.rewards.clone(), repos.users.clone())
                .for_profile(profile),
            notifications: NotificationService::new(
                repos.notifications.clone(),
                repos.tasks.clone(),
                scheduler,
            ),
            xp_per_task: config.rewards.xp_per_task,
            repos,
            clock,
        }
    }

    /// Volatile composition on the system clock with default settings.
    pub fn in_memory() -> Self {
        Self::new(
            Repositories::in_memory(),
            Arc::new(SystemClock),
            &Config::default(),
        )
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn subjects(&self) -> &SubjectService {
        &self.subjects
    }

    pub fn tasks(&self) -> &TaskService {
        &self.tasks
    }

    pub fn rewards(&self) -> &RewardService {
        &self.rewards
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    /// Complete a task and grant the per-task XP, once.
    pub fn complete_task_with_reward(&self, id: &str) -> Result<Completion> {
        let before = self.tasks.get_task(id)?;
        self.tasks.complete_task(id)?;

        if before.is_completed {
            tracing::debug!(id, "task already completed, no xp");
            return Ok(Completion {
                task_id: before.id,
                xp_awarded: 0,
                reward: self.rewards.state()?,
            });
        }

        let reward = self.rewards.award_xp(self.xp_per_task)?;
        Ok(Completion {
            task_id: before.id,
            xp_awarded: self.xp_per_task,
            reward,
        })
    }

    /// Delete a task together with the reminders pointing at it.
    pub fn delete_task(&self, id: &str) -> Result<usize> {
        self.tasks.get_task(id)?;
        let reminders = self.notifications.cancel_for_task(id)?;
        self.tasks.delete_task(id)?;
        Ok(reminders)
    }

    /// Delete a subject. With `cascade`, its tasks go too, and so do the
    /// reminders linked to those tasks. Returns the number of tasks removed.
    pub fn delete_subject(&self, id: &str, cascade: bool) -> Result<usize> {
        if cascade {
            if SubjectRepository::get(&*self.repos.subjects, id)?.is_none() {
                return Err(CoreError::not_found(Entity::Subject, id));
            }
            let dependents = TaskRepository::list(&*self.repos.tasks)?
                .into_iter()
                .filter(|t| t.subject_id == id);
            for task in dependents {
                let reminders = self.notifications.cancel_for_task(&task.id)?;
                if reminders > 0 {
                    tracing::debug!(task = %task.id, reminders, "cancelled reminders before cascade");
                }
            }
        }
        self.subjects.delete_subject(id, cascade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::NotificationSetting;
    use crate::repository::UserRepository;
    use chrono::{Duration, TimeZone, Utc};

    fn app() -> UniTask {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
        ));
        let mut config = Config::default();
        config.rewards.xp_per_task = 60;
        UniTask::new(Repositories::in_memory(), clock, &config)
    }

    #[test]
    fn completing_awards_once() {
        let app = app();
        let s = app.subjects().add_subject("Maths", "112233", None).unwrap();
        let due = app.clock().now() + Duration::hours(2);
        let t = app.tasks().add_task("Exercises", &s.id, due).unwrap();

        let first = app.complete_task_with_reward(&t.id).unwrap();
        assert_eq!(first.xp_awarded, 60);
        assert_eq!(first.reward, RewardState { xp: 60, level: 1 });

        let second = app.complete_task_with_reward(&t.id).unwrap();
        assert_eq!(second.xp_awarded, 0);
        assert_eq!(second.reward, first.reward);

        let user = app.repositories().users.get("local").unwrap().unwrap();
        assert_eq!(user.total_xp, 60);
    }

    #[test]
    fn completing_missing_task_awards_nothing() {
        let app = app();
        assert!(app
            .complete_task_with_reward("ghost")
            .unwrap_err()
            .is_not_found());
        assert_eq!(app.rewards().state().unwrap(), RewardState::default());
    }

    #[test]
    fn deleting_task_drops_its_reminders() {
        let app = app();
        let s = app.subjects().add_subject("Art", "112233", None).unwrap();
        let due = app.clock().now() + Duration::hours(1);
        let t = app.tasks().add_task("Sketch", &s.id, due).unwrap();
        let n = NotificationSetting::one_shot(Some(t.id.clone()), 1_000);
        app.notifications().schedule(&n).unwrap();

        assert_eq!(app.delete_task(&t.id).unwrap(), 1);
        assert!(app.notifications().get(&n.id).unwrap().is_none());
        assert!(app.tasks().get_task(&t.id).unwrap_err().is_not_found());
    }

    #[test]
    fn cascading_subject_delete_drops_task_reminders() {
        let app = app();
        let history = app.subjects().add_subject("History", "112233", None).unwrap();
        let art = app.subjects().add_subject("Art", "445566", None).unwrap();
        let due = app.clock().now() + Duration::hours(1);
        let essay = app.tasks().add_task("Essay", &history.id, due).unwrap();
        let sketch = app.tasks().add_task("Sketch", &art.id, due).unwrap();
        let linked = NotificationSetting::one_shot(Some(essay.id.clone()), 1_000);
        let kept = NotificationSetting::one_shot(Some(sketch.id.clone()), 2_000);
        app.notifications().schedule(&linked).unwrap();
        app.notifications().schedule(&kept).unwrap();

        // refused without cascade: nothing is touched
        assert!(app.delete_subject(&history.id, false).is_err());
        assert!(app.notifications().get(&linked.id).unwrap().is_some());

        assert_eq!(app.delete_subject(&history.id, true).unwrap(), 1);
        assert!(app.notifications().get(&linked.id).unwrap().is_none());
        assert_eq!(app.notifications().get(&kept.id).unwrap(), Some(kept));
        assert!(app.delete_subject("ghost", true).unwrap_err().is_not_found());
    }
}
