//! In-memory task registry.
//!
//! Records move `Pending -> Running -> Completed | Failed` (or straight from
//! `Pending` to `Failed`). Once terminal a record is never written again.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use mailpilot_core_types::TaskId;
use tracing::{debug, warn};

use crate::error::SchedulerError;
use crate::model::{TaskRecord, TaskReport, TaskRequest, TaskStatus};

#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<DashMap<TaskId, TaskRecord>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fresh `Pending` record under a new id.
    pub fn create(&self, request: &TaskRequest) -> TaskRecord {
        let task_id = TaskId::new();
        let record = TaskRecord::pending(task_id.clone(), request);
        self.tasks.insert(task_id, record.clone());
        record
    }

    pub fn get(&self, task_id: &TaskId) -> Result<TaskRecord, SchedulerError> {
        self.tasks
            .get(task_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SchedulerError::NotFound(task_id.to_string()))
    }

    /// All records, oldest first.
    pub fn list(&self) -> Vec<TaskRecord> {
        let mut records: Vec<TaskRecord> =
            self.tasks.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.task_id.as_str().cmp(b.task_id.as_str()))
        });
        records
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drops terminal records and returns how many were removed.
    pub fn clear(&self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, record| !record.status.is_terminal());
        let removed = before.saturating_sub(self.tasks.len());
        debug!(removed, "cleared finished tasks");
        removed
    }

    pub fn remove(&self, task_id: &TaskId) -> Option<TaskRecord> {
        self.tasks.remove(task_id).map(|(_, record)| record)
    }

    /// `Pending -> Running`. Returns false when the task is gone or has
    /// already left `Pending`.
    pub fn mark_running(&self, task_id: &TaskId) -> bool {
        let Some(mut record) = self.tasks.get_mut(task_id) else {
            return false;
        };
        if record.status != TaskStatus::Pending {
            return false;
        }
        record.status = TaskStatus::Running;
        record.started_at = Some(Utc::now());
        true
    }

    /// `Running -> Completed`, recording every provider's result.
    pub fn complete(&self, task_id: &TaskId, report: &TaskReport) -> bool {
        let Some(mut record) = self.tasks.get_mut(task_id) else {
            return false;
        };
        if record.status != TaskStatus::Running {
            warn!(task_id = %task_id, status = record.status.as_str(), "refusing to complete task");
            return false;
        }
        record.per_provider_results = report.results.clone();
        record.outcomes = report.final_states();
        record.status = TaskStatus::Completed;
        record.completed_at = Some(Utc::now());
        true
    }

    /// `Pending -> Failed`; a task a worker already picked up is left alone.
    pub fn fail_if_pending(&self, task_id: &TaskId, error: impl Into<String>) -> bool {
        let Some(mut record) = self.tasks.get_mut(task_id) else {
            return false;
        };
        if record.status != TaskStatus::Pending {
            return false;
        }
        record.status = TaskStatus::Failed;
        record.error = Some(error.into());
        record.completed_at = Some(Utc::now());
        true
    }

    /// Any live state -> `Failed`.
    pub fn fail(&self, task_id: &TaskId, error: impl Into<String>) -> bool {
        let Some(mut record) = self.tasks.get_mut(task_id) else {
            return false;
        };
        if record.status.is_terminal() {
            return false;
        }
        record.status = TaskStatus::Failed;
        record.error = Some(error.into());
        record.completed_at = Some(Utc::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailpilot_core_types::EmailIntent;

    fn request() -> TaskRequest {
        TaskRequest {
            intent: EmailIntent::new("a@example.com", "Hi", "Body", "send to a@example.com"),
            providers: vec!["Gmail".into()],
            headless: true,
        }
    }

    #[test]
    fn lifecycle_runs_forward_only() {
        let registry = TaskRegistry::new();
        let record = registry.create(&request());
        assert_eq!(record.status, TaskStatus::Pending);
        assert_eq!(record.providers, vec!["gmail"]);

        assert!(registry.mark_running(&record.task_id));
        assert!(!registry.mark_running(&record.task_id));

        let mut report = TaskReport::default();
        report.results.insert("gmail".into(), true);
        assert!(registry.complete(&record.task_id, &report));

        let done = registry.get(&record.task_id).unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.per_provider_results.get("gmail"), Some(&true));
        assert!(done.started_at.is_some());
        assert!(done.completed_at.is_some());

        assert!(!registry.fail(&record.task_id, "late failure"));
        assert_eq!(registry.get(&record.task_id).unwrap().error, None);
    }

    #[test]
    fn pending_tasks_cannot_complete_but_can_fail() {
        let registry = TaskRegistry::new();
        let record = registry.create(&request());
        assert!(!registry.complete(&record.task_id, &TaskReport::default()));
        assert!(registry.fail(&record.task_id, "task cancelled"));
        let failed = registry.get(&record.task_id).unwrap();
        assert_eq!(failed.status, TaskStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("task cancelled"));
    }

    #[test]
    fn fail_if_pending_leaves_running_tasks_to_their_worker() {
        let registry = TaskRegistry::new();
        let queued = registry.create(&request());
        let picked_up = registry.create(&request());
        assert!(registry.mark_running(&picked_up.task_id));

        assert!(!registry.fail_if_pending(&picked_up.task_id, "task cancelled"));
        let running = registry.get(&picked_up.task_id).unwrap();
        assert_eq!(running.status, TaskStatus::Running);
        assert!(running.error.is_none());
        assert_eq!(registry.clear(), 0);

        assert!(registry.fail_if_pending(&queued.task_id, "task cancelled"));
        let failed = registry.get(&queued.task_id).unwrap();
        assert_eq!(failed.status, TaskStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("task cancelled"));
        assert!(!registry.fail_if_pending(&queued.task_id, "again"));
        assert!(!registry.mark_running(&queued.task_id));
    }

    #[test]
    fn clear_keeps_live_tasks() {
        let registry = TaskRegistry::new();
        let finished = registry.create(&request());
        let running = registry.create(&request());
        let pending = registry.create(&request());
        registry.fail(&finished.task_id, "boom");
        registry.mark_running(&running.task_id);

        assert_eq!(registry.clear(), 1);
        assert_eq!(registry.clear(), 0);
        assert!(registry.get(&finished.task_id).is_err());
        assert_eq!(
            registry.get(&running.task_id).unwrap().status,
            TaskStatus::Running
        );
        assert!(registry.get(&pending.task_id).is_ok());
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let registry = TaskRegistry::new();
        let err = registry.get(&TaskId::from("missing")).unwrap_err();
        assert_eq!(err, SchedulerError::NotFound("missing".into()));
        assert!(!registry.mark_running(&TaskId::from("missing")));
    }
}
