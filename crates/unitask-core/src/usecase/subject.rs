use std::sync::Arc;

use crate::error::{CoreError, Entity, Result};
use crate::model::subject::SubjectFields;
use crate::model::Subject;
use crate::repository::{SubjectRepository, TaskRepository};

/// Subject lifecycle: add, edit, delete with optional cascade.
#[derive(Clone)]
pub struct SubjectService {
    subjects: Arc<dyn SubjectRepository>,
    tasks: Arc<dyn TaskRepository>,
}

impl SubjectService {
    pub fn new(subjects: Arc<dyn SubjectRepository>, tasks: Arc<dyn TaskRepository>) -> Self {
        Self { subjects, tasks }
    }

    pub fn list(&self) -> Result<Vec<Subject>> {
        self.subjects.list()
    }

    pub fn add_subject(
        &self,
        name: &str,
        color_hex: &str,
        teacher: Option<&str>,
    ) -> Result<Subject> {
        let fields = SubjectFields::parse(name, color_hex, teacher)?;

        if let Some(existing) = self
            .subjects
            .list()?
            .into_iter()
            .find(|s| s.has_name(&fields.name))
        {
            return Err(CoreError::conflict(
                Entity::Subject,
                format!("a subject named '{}' already exists", existing.name),
            ));
        }

        let subject = Subject::new(fields.name, fields.color_hex, fields.teacher);
        self.subjects.add(&subject)?;
        tracing::info!(id = %subject.id, name = %subject.name, "subject added");
        Ok(subject)
    }

    pub fn edit_subject(
        &self,
        id: &str,
        name: &str,
        color_hex: &str,
        teacher: Option<&str>,
    ) -> Result<Subject> {
        let fields = SubjectFields::parse(name, color_hex, teacher)?;

        let all = self.subjects.list()?;
        let mut subject = all
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(Entity::Subject, id))?;

        if all.iter().any(|s| s.id != id && s.has_name(&fields.name)) {
            return Err(CoreError::conflict(
                Entity::Subject,
                format!("another subject is already named '{}'", fields.name),
            ));
        }

        subject.name = fields.name;
        subject.color_hex = fields.color_hex;
        subject.teacher = fields.teacher;
        self.subjects.edit(&subject)?;
        tracing::info!(id = %subject.id, "subject edited");
        Ok(subject)
    }

    /// Delete a subject. With `cascade` its tasks go first; without it the
    /// call fails untouched if any task still references the subject.
    ///
    /// Returns the number of tasks removed.
    pub fn delete_subject(&self, id: &str, cascade: bool) -> Result<usize> {
        if self.subjects.get(id)?.is_none() {
            return Err(CoreError::not_found(Entity::Subject, id));
        }

        let dependents: Vec<String> = self
            .tasks
            .list()?
            .into_iter()
            .filter(|t| t.subject_id == id)
            .map(|t| t.id)
            .collect();

        if !cascade && !dependents.is_empty() {
            tracing::warn!(id, tasks = dependents.len(), "subject delete refused");
            return Err(CoreError::Dependency {
                subject_id: id.to_string(),
                task_count: dependents.len(),
            });
        }

        let removed = match self.subjects.delete_with_tasks(id) {
            Some(result) => result?,
            None => {
                for task_id in &dependents {
                    self.tasks.delete(task_id)?;
                }
                self.subjects.delete(id)?;
                dependents.len()
            }
        };
        tracing::info!(id, tasks_removed = removed, "subject deleted");
        Ok(removed)
    }
}
