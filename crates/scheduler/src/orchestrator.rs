use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use action_flow::{ProviderOutcome, ProviderRun, ProviderRunState};
use action_locator::{ProviderCatalog, ProviderProfile};
use action_primitives::ScreenshotHook;
use cdp_adapter::{Driver, SessionFactory, SessionOptions};
use futures::FutureExt;
use mailpilot_core_types::{EmailIntent, ErrorKind};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::SchedulerError;
use crate::metrics;
use crate::model::{normalize_providers, OrchestratorConfig, TaskReport};

/// Runs one intent against a list of providers, sequentially, on a single
/// shared browser session.
pub struct TaskOrchestrator {
    catalog: Arc<ProviderCatalog>,
    sessions: Arc<dyn SessionFactory>,
    config: OrchestratorConfig,
    screenshot_hook: Option<Arc<dyn ScreenshotHook>>,
}

impl TaskOrchestrator {
    pub fn new(
        catalog: Arc<ProviderCatalog>,
        sessions: Arc<dyn SessionFactory>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            catalog,
            sessions,
            config,
            screenshot_hook: None,
        }
    }

    pub fn with_screenshot_hook(mut self, hook: Option<Arc<dyn ScreenshotHook>>) -> Self {
        self.screenshot_hook = hook;
        self
    }

    pub fn catalog(&self) -> &Arc<ProviderCatalog> {
        &self.catalog
    }

    /// Unknown providers map to `false` without a run. The session is only
    /// acquired when at least one provider is known, and is closed exactly
    /// once after the last provider finishes.
    pub async fn run(
        &self,
        intent: &EmailIntent,
        providers: &[String],
        options: &SessionOptions,
        cancel: &CancellationToken,
    ) -> Result<TaskReport, SchedulerError> {
        let mut report = TaskReport::default();
        let mut known = Vec::new();
        for provider in normalize_providers(providers) {
            match self.catalog.profile(&provider) {
                Ok(profile) => known.push(profile),
                Err(err) => {
                    warn!(provider = %provider, error = %err, "skipping unknown provider");
                    report.results.insert(provider, false);
                }
            }
        }
        if known.is_empty() {
            info!("no known providers requested; browser session not started");
            return Ok(report);
        }

        let session = self.sessions.acquire(options).await?;
        info!(providers = known.len(), headless = options.headless, "browser session acquired");

        for (index, profile) in known.into_iter().enumerate() {
            if index > 0 && !self.config.provider_settle.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.config.provider_settle) => {}
                }
            }
            let outcome = self
                .run_provider(profile, Arc::clone(&session), intent, cancel)
                .await;
            metrics::record_provider_result(&outcome.provider, outcome.final_state.name());
            report.results.insert(outcome.provider.clone(), outcome.succeeded());
            report.outcomes.insert(outcome.provider.clone(), outcome);
        }

        if let Err(err) = session.close().await {
            warn!(error = %err, "browser session did not close cleanly");
        } else {
            info!("browser session released");
        }

        if cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }
        Ok(report)
    }

    async fn run_provider(
        &self,
        profile: Arc<ProviderProfile>,
        session: Arc<dyn Driver>,
        intent: &EmailIntent,
        cancel: &CancellationToken,
    ) -> ProviderOutcome {
        let provider = profile.id.clone();
        let started = Instant::now();
        let mut run = ProviderRun::new(profile, session, self.config.timings.clone())
            .with_screenshot_hook(self.screenshot_hook.clone())
            .with_cancellation(cancel.clone());
        let max_attempts = self.config.max_provider_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = AssertUnwindSafe(run.run(intent)).catch_unwind().await;
            let outcome = match result {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(err)) => {
                    error!(provider = %provider, error = %err, "provider run could not start");
                    return failed_outcome(provider, err.kind(), started);
                }
                Err(panic) => {
                    error!(
                        provider = %provider,
                        panic = %panic_message(panic.as_ref()),
                        "provider run panicked"
                    );
                    return failed_outcome(provider, ErrorKind::DriverError, started);
                }
            };

            let retryable = matches!(
                outcome.final_state,
                ProviderRunState::Failed(kind) if kind != ErrorKind::Cancelled
            );
            if !retryable || attempt >= max_attempts || run.retry().is_err() {
                return outcome;
            }
            attempt += 1;
            warn!(
                provider = %provider,
                attempt,
                max_attempts,
                previous = %outcome.final_state,
                "retrying provider"
            );
        }
    }
}

fn failed_outcome(provider: String, kind: ErrorKind, started: Instant) -> ProviderOutcome {
    ProviderOutcome {
        provider,
        final_state: ProviderRunState::Failed(kind),
        steps: Vec::new(),
        transitions: Vec::new(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
