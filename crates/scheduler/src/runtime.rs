//! Bounded task queue drained by a fixed set of workers.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use cdp_adapter::SessionOptions;
use dashmap::DashMap;
use futures::FutureExt;
use mailpilot_core_types::TaskId;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::SchedulerError;
use crate::metrics;
use crate::model::{SchedulerConfig, TaskRequest};
use crate::orchestrator::TaskOrchestrator;
use crate::registry::TaskRegistry;

pub(crate) const CANCELLED_MESSAGE: &str = "task cancelled";

pub type CancellationMap = Arc<DashMap<TaskId, CancellationToken>>;

#[derive(Debug)]
pub struct TaskEnvelope {
    pub task_id: TaskId,
    pub request: TaskRequest,
    pub cancel: CancellationToken,
}

pub struct WorkerPool {
    config: SchedulerConfig,
    sender: mpsc::Sender<TaskEnvelope>,
    receiver: Arc<Mutex<mpsc::Receiver<TaskEnvelope>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(config: SchedulerConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        Self {
            config,
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Queues without waiting; a full queue is reported as `ServerBusy`.
    pub fn try_enqueue(&self, envelope: TaskEnvelope) -> Result<(), SchedulerError> {
        self.sender.try_send(envelope).map_err(|err| match err {
            TrySendError::Full(_) => SchedulerError::ServerBusy,
            TrySendError::Closed(_) => SchedulerError::Internal("task queue closed".into()),
        })
    }

    /// Tasks waiting in the queue.
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub async fn is_started(&self) -> bool {
        !self.workers.lock().await.is_empty()
    }

    /// Spawns the workers once; later calls are no-ops.
    pub async fn start(
        &self,
        registry: TaskRegistry,
        orchestrator: Arc<TaskOrchestrator>,
        cancellations: CancellationMap,
    ) {
        let mut workers = self.workers.lock().await;
        if !workers.is_empty() {
            return;
        }
        let count = self.config.workers.max(1);
        for worker_id in 0..count {
            let receiver = Arc::clone(&self.receiver);
            let registry = registry.clone();
            let orchestrator = Arc::clone(&orchestrator);
            let cancellations = Arc::clone(&cancellations);
            workers.push(tokio::spawn(async move {
                loop {
                    let next = {
                        let mut guard = receiver.lock().await;
                        guard.recv().await
                    };
                    let Some(envelope) = next else {
                        break;
                    };
                    let task_id = envelope.task_id.clone();
                    let result = AssertUnwindSafe(process(
                        worker_id,
                        &registry,
                        &orchestrator,
                        envelope,
                    ))
                    .catch_unwind()
                    .await;
                    if result.is_err() {
                        error!(worker_id, task_id = %task_id, "worker panicked while running task");
                        if registry.fail(&task_id, "internal error: worker panicked") {
                            metrics::record_failed(true);
                        }
                    }
                    cancellations.remove(&task_id);
                }
                info!(worker_id, "worker stopped");
            }));
        }
        info!(workers = count, capacity = self.config.queue_capacity, "worker pool started");
    }
}

async fn process(
    worker_id: usize,
    registry: &TaskRegistry,
    orchestrator: &TaskOrchestrator,
    envelope: TaskEnvelope,
) {
    let TaskEnvelope {
        task_id,
        request,
        cancel,
    } = envelope;

    if cancel.is_cancelled() {
        if registry.fail_if_pending(&task_id, CANCELLED_MESSAGE) {
            metrics::record_failed(false);
        }
        info!(worker_id, task_id = %task_id, "skipping cancelled task");
        return;
    }
    if !registry.mark_running(&task_id) {
        warn!(worker_id, task_id = %task_id, "task no longer pending; skipping");
        return;
    }
    metrics::record_started();
    info!(
        worker_id,
        task_id = %task_id,
        recipient = %request.intent.recipient,
        providers = ?request.providers,
        "task started"
    );

    let options = SessionOptions {
        headless: request.headless,
    };
    match orchestrator
        .run(&request.intent, &request.providers, &options, &cancel)
        .await
    {
        Ok(report) => {
            if registry.complete(&task_id, &report) {
                metrics::record_completed();
            }
            info!(worker_id, task_id = %task_id, results = ?report.results, "task completed");
        }
        Err(err) => {
            let message = match err {
                SchedulerError::Cancelled => CANCELLED_MESSAGE.to_string(),
                other => other.to_string(),
            };
            if registry.fail(&task_id, message.as_str()) {
                metrics::record_failed(true);
            }
            warn!(worker_id, task_id = %task_id, error = %message, "task failed");
        }
    }
}
