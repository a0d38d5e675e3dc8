use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::watch;

use crate::clock::Clock;
use crate::error::{CoreError, Entity, Result, ValidationError};
use crate::model::task::validate_title;
use crate::model::Task;
use crate::repository::{SubjectRepository, TaskRepository};

/// Default look-ahead for [`TaskService::get_urgent_tasks`], in hours.
pub const DEFAULT_URGENT_WINDOW_HOURS: i64 = 48;

pub fn default_urgent_window() -> Duration {
    Duration::hours(DEFAULT_URGENT_WINDOW_HOURS)
}

#[derive(Clone)]
enum FeedFilter {
    All,
    DueWithin(Duration),
}

/// A filtered live view over the task collection.
///
/// The urgency window is re-evaluated against the clock on every read, so a
/// feed held open keeps sliding forward in time.
pub struct TaskFeed {
    rx: watch::Receiver<Vec<Task>>,
    filter: FeedFilter,
    include_completed: bool,
    clock: Arc<dyn Clock>,
}

impl TaskFeed {
    fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        let window = match self.filter {
            FeedFilter::All => None,
            FeedFilter::DueWithin(window) => {
                let now = self.clock.now();
                let until = now
                    .checked_add_signed(window)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                Some((now, until))
            }
        };
        let mut out: Vec<Task> = tasks
            .iter()
            .filter(|t| self.include_completed || !t.is_completed)
            .filter(|t| window.map_or(true, |(from, to)| t.is_due_between(from, to)))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.due_at.cmp(&b.due_at).then_with(|| a.created_at.cmp(&b.created_at)));
        out
    }

    /// Current filtered contents.
    pub fn snapshot(&self) -> Vec<Task> {
        self.apply(&self.rx.borrow())
    }

    /// Wait for the next write to the collection and return the new view.
    /// `None` once the backing repository is gone.
    pub async fn changed(&mut self) -> Option<Vec<Task>> {
        self.rx.changed().await.ok()?;
        let tasks = self.rx.borrow_and_update().clone();
        Some(self.apply(&tasks))
    }
}

/// Task lifecycle: add, update, complete, delete, and filtered views.
#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    subjects: Arc<dyn SubjectRepository>,
    clock: Arc<dyn Clock>,
}

impl TaskService {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        subjects: Arc<dyn SubjectRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tasks,
            subjects,
            clock,
        }
    }

    fn require_subject(&self, subject_id: &str) -> Result<()> {
        if subject_id.trim().is_empty() {
            return Err(ValidationError::Blank { field: "subject_id" }.into());
        }
        if self.subjects.get(subject_id)?.is_none() {
            return Err(CoreError::not_found(Entity::Subject, subject_id));
        }
        Ok(())
    }

    pub fn add_task(&self, title: &str, subject_id: &str, due_at: DateTime<Utc>) -> Result<Task> {
        let title = validate_title(title)?;
        let now = self.clock.now();
        if due_at < now {
            return Err(ValidationError::DueInPast { due: due_at, now }.into());
        }
        self.require_subject(subject_id)?;

        let task = Task::new(title, subject_id.to_string(), due_at, now);
        self.tasks.add(&task)?;
        tracing::info!(id = %task.id, subject = %task.subject_id, due = %task.due_at, "task added");
        Ok(task)
    }

    /// Mark a task done. Completing a completed task is a no-op.
    pub fn complete_task(&self, id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(ValidationError::Blank { field: "id" }.into());
        }
        self.tasks.complete(id)?;
        tracing::info!(id, "task completed");
        Ok(())
    }

    /// Replace title, subject and due time of an existing task.
    ///
    /// `created_at` is kept from the stored record and completion cannot be
    /// undone through this call.
    pub fn update_task(&self, task: &Task) -> Result<Task> {
        let title = validate_title(&task.title)?;
        self.require_subject(&task.subject_id)?;

        let stored = self
            .tasks
            .get(&task.id)?
            .ok_or_else(|| CoreError::not_found(Entity::Task, &task.id))?;

        let updated = Task {
            title,
            subject_id: task.subject_id.clone(),
            due_at: task.due_at,
            is_completed: stored.is_completed || task.is_completed,
            ..stored
        };
        self.tasks.update(&updated)?;
        tracing::info!(id = %updated.id, "task updated");
        Ok(updated)
    }

    pub fn delete_task(&self, id: &str) -> Result<()> {
        self.tasks.delete(id)?;
        tracing::info!(id, "task deleted");
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> Result<Task> {
        self.tasks
            .get(id)?
            .ok_or_else(|| CoreError::not_found(Entity::Task, id))
    }

    /// Live view of all tasks, completed ones only when asked for.
    pub fn get_all_tasks(&self, include_completed: bool) -> TaskFeed {
        TaskFeed {
            rx: self.tasks.observe(),
            filter: FeedFilter::All,
            include_completed,
            clock: self.clock.clone(),
        }
    }

    /// Live view of tasks due in `[now, now + window]`.
    pub fn get_urgent_tasks(&self, window: Duration, include_completed: bool) -> Result<TaskFeed> {
        if window <= Duration::zero() {
            return Err(ValidationError::NonPositiveWindow {
                minutes: window.num_minutes(),
            }
            .into());
        }
        Ok(TaskFeed {
            rx: self.tasks.observe(),
            filter: FeedFilter::DueWithin(window),
            include_completed,
            clock: self.clock.clone(),
        })
    }
}
