use std::sync::Arc;
use tokio::sync::watch;

use crate::alarm::{AlarmRequest, AlarmScheduler, DeliveryHandle};
use crate::error::{CoreError, Entity, Result, ValidationError};
use crate::model::NotificationSetting;
use crate::repository::{NotificationRepository, TaskRepository};

const DEFAULT_LABEL: &str = "Reminder";

/// Reminder lifecycle: persist the setting and keep the platform alarm in
/// step with it.
#[derive(Clone)]
pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    tasks: Arc<dyn TaskRepository>,
    scheduler: AlarmScheduler,
}

impl NotificationService {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        tasks: Arc<dyn TaskRepository>,
        scheduler: AlarmScheduler,
    ) -> Self {
        Self {
            notifications,
            tasks,
            scheduler,
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<NotificationSetting>> {
        self.notifications.get(id)
    }

    pub fn observe_all(&self) -> watch::Receiver<Vec<NotificationSetting>> {
        self.notifications.observe()
    }

    fn handle_for(&self, setting: &NotificationSetting) -> Result<DeliveryHandle> {
        let label = match &setting.task_id {
            Some(task_id) => self
                .tasks
                .get(task_id)?
                .ok_or_else(|| CoreError::not_found(Entity::Task, task_id))?
                .title,
            None => DEFAULT_LABEL.to_string(),
        };
        Ok(DeliveryHandle::new(
            setting.id.clone(),
            setting.task_id.clone(),
            label,
        ))
    }

    /// Request delivery when enabled, then save the setting.
    ///
    /// Returns the request issued to the platform, or `None` for a disabled
    /// setting (whose earlier delivery, if any, is revoked). When the platform
    /// refuses, nothing is saved; when the save fails, the fresh delivery is
    /// revoked again.
    pub fn schedule(&self, setting: &NotificationSetting) -> Result<Option<AlarmRequest>> {
        if setting.id.trim().is_empty() {
            return Err(ValidationError::Blank { field: "id" }.into());
        }
        if setting.trigger_at_millis <= 0 {
            return Err(ValidationError::InvalidValue {
                field: "trigger_at_millis",
                message: "must be a positive epoch time".into(),
            }
            .into());
        }
        if matches!(setting.repeat_interval_millis, Some(i) if i <= 0) {
            return Err(ValidationError::InvalidValue {
                field: "repeat_interval_millis",
                message: "must be positive".into(),
            }
            .into());
        }
        let handle = self.handle_for(setting)?;

        if !setting.enabled {
            self.scheduler.cancel(&handle)?;
            self.notifications.save(setting)?;
            return Ok(None);
        }
        let request = self.scheduler.schedule(
            setting.trigger_at_millis,
            setting.repeat_interval_millis,
            setting.exact,
            &handle,
        )?;
        if let Err(err) = self.notifications.save(setting) {
            if let Err(cancel_err) = self.scheduler.cancel(&handle) {
                tracing::warn!(id = %setting.id, error = %cancel_err, "could not revoke unsaved reminder");
            }
            return Err(err);
        }
        Ok(Some(request))
    }

    /// Revoke delivery and remove the stored setting.
    pub fn cancel(&self, id: &str) -> Result<()> {
        let setting = self
            .notifications
            .get(id)?
            .ok_or_else(|| CoreError::not_found(Entity::Notification, id))?;
        let handle = DeliveryHandle::new(setting.id.clone(), setting.task_id.clone(), DEFAULT_LABEL);
        self.scheduler.cancel(&handle)?;
        self.notifications.delete(id)?;
        Ok(())
    }

    /// Cancel every reminder linked to `task_id`. Returns how many went.
    pub fn cancel_for_task(&self, task_id: &str) -> Result<usize> {
        let linked: Vec<String> = self
            .notifications
            .list()?
            .into_iter()
            .filter(|n| n.task_id.as_deref() == Some(task_id))
            .map(|n| n.id)
            .collect();
        for id in &linked {
            self.cancel(id)?;
        }
        Ok(linked.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{AlarmService, RecordingAlarmService, MIN_REPEAT_INTERVAL_MILLIS};
    use crate::error::AlarmError;
    use crate::model::Task;
    use crate::storage::memory::{MemoryNotificationRepository, MemoryTaskRepository};
    use chrono::Utc;

    struct Fixture {
        svc: NotificationService,
        alarms: Arc<RecordingAlarmService>,
        notifications: Arc<MemoryNotificationRepository>,
        task: Task,
    }

    fn fixture() -> Fixture {
        let alarms = Arc::new(RecordingAlarmService::default());
        let notifications = Arc::new(MemoryNotificationRepository::default());
        let tasks = Arc::new(MemoryTaskRepository::default());
        let now = Utc::now();
        let task = Task::new("Essay".into(), "s1".into(), now, now);
        tasks.add(&task).unwrap();
        let svc = NotificationService::new(
            notifications.clone(),
            tasks,
            AlarmScheduler::new(alarms.clone()),
        );
        Fixture {
            svc,
            alarms,
            notifications,
            task,
        }
    }

    #[test]
    fn schedule_persists_and_requests_exact() {
        let f = fixture();
        let n = NotificationSetting::one_shot(Some(f.task.id.clone()), 1_700_000_000_000);
        let req = f.svc.schedule(&n).unwrap();

        assert_eq!(
            req,
            Some(AlarmRequest::ExactWhileIdle {
                at_millis: 1_700_000_000_000
            })
        );
        assert_eq!(f.svc.get(&n.id).unwrap(), Some(n.clone()));
        assert_eq!(f.alarms.handle(&n.id).unwrap().label, "Essay");
    }

    #[test]
    fn repeating_reminder_is_clamped() {
        let f = fixture();
        let n = NotificationSetting::repeating(None, 1_000, 10);
        let req = f.svc.schedule(&n).unwrap().unwrap();
        assert_eq!(req.interval_millis(), Some(MIN_REPEAT_INTERVAL_MILLIS));
        // stored record keeps what the user asked for
        assert_eq!(f.svc.get(&n.id).unwrap().unwrap().repeat_interval_millis, Some(10));
    }

    #[test]
    fn disabling_revokes_delivery() {
        let f = fixture();
        let mut n = NotificationSetting::one_shot(None, 5_000);
        f.svc.schedule(&n).unwrap();
        assert!(f.alarms.pending(&n.id).is_some());

        n.enabled = false;
        assert_eq!(f.svc.schedule(&n).unwrap(), None);
        assert!(f.alarms.pending(&n.id).is_none());
        assert!(!f.svc.get(&n.id).unwrap().unwrap().enabled);
    }

    #[test]
    fn invalid_settings_are_rejected_before_saving() {
        let f = fixture();
        assert!(matches!(
            f.svc.schedule(&NotificationSetting::one_shot(None, 0)),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            f.svc.schedule(&NotificationSetting::repeating(None, 10, 0)),
            Err(CoreError::Validation(_))
        ));
        assert!(f
            .svc
            .schedule(&NotificationSetting::one_shot(Some("ghost".into()), 10))
            .unwrap_err()
            .is_not_found());
        assert!(f.notifications.list().unwrap().is_empty());
        assert!(f.alarms.is_empty());
    }

    /// Platform that refuses every request.
    struct BrokenAlarms;

    fn refused() -> std::result::Result<(), AlarmError> {
        Err(AlarmError::Platform("alarm manager unavailable".into()))
    }

    impl AlarmService for BrokenAlarms {
        fn can_schedule_exact(&self) -> bool {
            true
        }

        fn set_exact_and_allow_while_idle(
            &self,
            _: &DeliveryHandle,
            _: i64,
        ) -> std::result::Result<(), AlarmError> {
            refused()
        }

        fn set_and_allow_while_idle(
            &self,
            _: &DeliveryHandle,
            _: i64,
        ) -> std::result::Result<(), AlarmError> {
            refused()
        }

        fn set_inexact_repeating(
            &self,
            _: &DeliveryHandle,
            _: i64,
            _: i64,
        ) -> std::result::Result<(), AlarmError> {
            refused()
        }

        fn cancel(&self, _: &DeliveryHandle) -> std::result::Result<(), AlarmError> {
            Ok(())
        }
    }

    #[test]
    fn refused_delivery_leaves_repository_unchanged() {
        let f = fixture();
        let existing = NotificationSetting::one_shot(Some(f.task.id.clone()), 5_000);
        f.svc.schedule(&existing).unwrap();

        let svc = NotificationService::new(
            f.notifications.clone(),
            f.svc.tasks.clone(),
            AlarmScheduler::new(Arc::new(BrokenAlarms)),
        );
        assert!(matches!(
            svc.schedule(&NotificationSetting::one_shot(None, 9_000)),
            Err(CoreError::Alarm(AlarmError::Platform(_)))
        ));
        assert!(matches!(
            svc.schedule(&NotificationSetting::repeating(None, 1_000, 60_000)),
            Err(CoreError::Alarm(_))
        ));
        // an edit to a stored reminder keeps the old value
        let moved = NotificationSetting {
            trigger_at_millis: 8_000,
            ..existing.clone()
        };
        assert!(svc.schedule(&moved).is_err());

        assert_eq!(f.notifications.list().unwrap(), vec![existing]);
    }

    #[test]
    fn cancel_removes_record_and_alarm() {
        let f = fixture();
        let n = NotificationSetting::one_shot(Some(f.task.id.clone()), 5_000);
        f.svc.schedule(&n).unwrap();

        f.svc.cancel(&n.id).unwrap();
        assert!(f.svc.get(&n.id).unwrap().is_none());
        assert!(f.alarms.pending(&n.id).is_none());
        assert!(f.svc.cancel(&n.id).unwrap_err().is_not_found());
    }

    #[test]
    fn cancel_for_task_only_touches_linked() {
        let f = fixture();
        f.svc
            .schedule(&NotificationSetting::one_shot(Some(f.task.id.clone()), 5_000))
            .unwrap();
        f.svc
            .schedule(&NotificationSetting::one_shot(Some(f.task.id.clone()), 6_000))
            .unwrap();
        let free = NotificationSetting::one_shot(None, 7_000);
        f.svc.schedule(&free).unwrap();

        assert_eq!(f.svc.cancel_for_task(&f.task.id).unwrap(), 2);
        assert_eq!(f.notifications.list().unwrap(), vec![free]);
        assert_eq!(f.alarms.len(), 1);
    }
}
