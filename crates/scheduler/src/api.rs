use std::sync::Arc;

use action_locator::ProviderCatalog;
use async_trait::async_trait;
use dashmap::DashMap;
use mailpilot_core_types::TaskId;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::SchedulerError;
use crate::metrics;
use crate::model::{normalize_providers, SchedulerConfig, TaskRecord, TaskRequest};
use crate::orchestrator::TaskOrchestrator;
use crate::registry::TaskRegistry;
use crate::runtime::{CancellationMap, TaskEnvelope, WorkerPool, CANCELLED_MESSAGE};

#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    async fn submit(&self, request: TaskRequest) -> Result<TaskRecord, SchedulerError>;
    async fn status(&self, task_id: &TaskId) -> Result<TaskRecord, SchedulerError>;
    async fn list(&self) -> Vec<TaskRecord>;
    async fn clear(&self) -> usize;
    async fn cancel(&self, task_id: &TaskId) -> Result<bool, SchedulerError>;
}

pub struct SchedulerService {
    registry: TaskRegistry,
    orchestrator: Arc<TaskOrchestrator>,
    pool: WorkerPool,
    cancellations: CancellationMap,
}

impl SchedulerService {
    pub fn new(orchestrator: Arc<TaskOrchestrator>, config: SchedulerConfig) -> Self {
        Self {
            registry: TaskRegistry::new(),
            orchestrator,
            pool: WorkerPool::new(config),
            cancellations: Arc::new(DashMap::new()),
        }
    }

    /// Starts the worker pool. Tasks submitted earlier stay `Pending` until
    /// this is called.
    pub async fn start(&self) {
        self.pool
            .start(
                self.registry.clone(),
                Arc::clone(&self.orchestrator),
                Arc::clone(&self.cancellations),
            )
            .await;
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &Arc<ProviderCatalog> {
        self.orchestrator.catalog()
    }

    pub fn queued(&self) -> usize {
        self.pool.queued()
    }

    fn validate(&self, request: &TaskRequest) -> Result<(), SchedulerError> {
        if request.intent.recipient.trim().is_empty() {
            return Err(SchedulerError::InvalidRequest("recipient is required".into()));
        }
        let providers = normalize_providers(&request.providers);
        if providers.is_empty() {
            return Err(SchedulerError::InvalidRequest(
                "at least one provider is required".into(),
            ));
        }
        let catalog = self.catalog();
        let unknown: Vec<String> = providers
            .into_iter()
            .filter(|provider| !catalog.contains(provider))
            .collect();
        if !unknown.is_empty() {
            return Err(SchedulerError::UnknownProviders {
                unknown,
                supported: catalog.known_providers(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TaskDispatcher for SchedulerService {
    async fn submit(&self, request: TaskRequest) -> Result<TaskRecord, SchedulerError> {
        if let Err(err) = self.validate(&request) {
            metrics::record_rejected();
            return Err(err);
        }
        let record = self.registry.create(&request);
        let cancel = CancellationToken::new();
        self.cancellations
            .insert(record.task_id.clone(), cancel.clone());
        let envelope = TaskEnvelope {
            task_id: record.task_id.clone(),
            request,
            cancel,
        };
        if let Err(err) = self.pool.try_enqueue(envelope) {
            self.registry.remove(&record.task_id);
            self.cancellations.remove(&record.task_id);
            metrics::record_rejected();
            return Err(err);
        }
        metrics::record_submitted();
        info!(
            task_id = %record.task_id,
            providers = ?record.providers,
            queued = self.pool.queued(),
            "task submitted"
        );
        Ok(record)
    }

    async fn status(&self, task_id: &TaskId) -> Result<TaskRecord, SchedulerError> {
        self.registry.get(task_id)
    }

    async fn list(&self) -> Vec<TaskRecord> {
        self.registry.list()
    }

    async fn clear(&self) -> usize {
        self.registry.clear()
    }

    /// Returns false when the task already finished.
    async fn cancel(&self, task_id: &TaskId) -> Result<bool, SchedulerError> {
        let record = self.registry.get(task_id)?;
        if record.status.is_terminal() {
            return Ok(false);
        }
        if let Some(token) = self.cancellations.get(task_id) {
            token.cancel();
        }
        if self.registry.fail_if_pending(task_id, CANCELLED_MESSAGE) {
            metrics::record_failed(false);
        }
        metrics::record_cancelled();
        info!(task_id = %task_id, status = record.status.as_str(), "task cancellation requested");
        Ok(true)
    }
}

#[async_trait]
impl<D> TaskDispatcher for Arc<D>
where
    D: TaskDispatcher + ?Sized,
{
    async fn submit(&self, request: TaskRequest) -> Result<TaskRecord, SchedulerError> {
        (**self).submit(request).await
    }

    async fn status(&self, task_id: &TaskId) -> Result<TaskRecord, SchedulerError> {
        (**self).status(task_id).await
    }

    async fn list(&self) -> Vec<TaskRecord> {
        (**self).list().await
    }

    async fn clear(&self) -> usize {
        (**self).clear().await
    }

    async fn cancel(&self, task_id: &TaskId) -> Result<bool, SchedulerError> {
        (**self).cancel(task_id).await
    }
}
