use std::collections::BTreeMap;
use std::time::Duration;

use action_flow::{FlowTimings, ProviderOutcome, ProviderRunState};
use chrono::{DateTime, Utc};
use mailpilot_core_types::{EmailIntent, ProviderId, TaskId};
use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

/// Lifecycle record of one submitted task.
#[derive(Clone, Debug, Serialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub instruction: String,
    /// Requested providers after normalization.
    pub providers: Vec<String>,
    /// Provider -> sent; written once every provider run is terminal.
    pub per_provider_results: BTreeMap<String, bool>,
    pub outcomes: BTreeMap<String, ProviderRunState>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn pending(task_id: TaskId, request: &TaskRequest) -> Self {
        Self {
            task_id,
            status: TaskStatus::Pending,
            instruction: request.intent.raw_instruction.clone(),
            providers: normalize_providers(&request.providers),
            per_provider_results: BTreeMap::new(),
            outcomes: BTreeMap::new(),
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TaskRequest {
    pub intent: EmailIntent,
    pub providers: Vec<String>,
    pub headless: bool,
}

/// Aggregated result of one orchestrator run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TaskReport {
    pub results: BTreeMap<String, bool>,
    pub outcomes: BTreeMap<String, ProviderOutcome>,
}

impl TaskReport {
    pub fn final_states(&self) -> BTreeMap<String, ProviderRunState> {
        self.outcomes
            .iter()
            .map(|(provider, outcome)| (provider.clone(), outcome.final_state))
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub timings: FlowTimings,
    /// Pause between providers sharing one session.
    pub provider_settle: Duration,
    /// Runs per provider; 1 disables retries.
    pub max_provider_attempts: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            timings: FlowTimings::default(),
            provider_settle: Duration::from_secs(2),
            max_provider_attempts: 1,
        }
    }
}

/// Trimmed, lower-cased, de-duplicated; first occurrence wins.
pub fn normalize_providers(providers: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(providers.len());
    for provider in providers {
        let id = ProviderId::new(provider).as_str().to_string();
        if !id.is_empty() && !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}
