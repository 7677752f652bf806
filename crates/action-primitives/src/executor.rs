//! Step executor: walks a candidate chain until one candidate works

use std::sync::Arc;
use std::time::Duration;

use action_locator::LocatorCandidate;
use cdp_adapter::{Driver, DriverError, UiAction};
use mailpilot_core_types::{ErrorKind, LogicalTarget};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::hook::{ScreenshotHook, ScreenshotRequest};
use crate::metrics;
use crate::types::{CandidateAttempt, StepAction, StepOutcome};
use crate::waiting::{poll_until, PollOutcome};

const DEFAULT_URL_POLL: Duration = Duration::from_millis(250);
/// Minimum time a failure screenshot gets once the step budget is spent.
const SCREENSHOT_GRACE: Duration = Duration::from_millis(250);

/// Runs single UI steps against one driver session.
#[derive(Clone)]
pub struct StepExecutor {
    driver: Arc<dyn Driver>,
    label: String,
    screenshot_hook: Option<Arc<dyn ScreenshotHook>>,
    url_poll_interval: Duration,
}

impl StepExecutor {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            label: String::from("step"),
            screenshot_hook: None,
            url_poll_interval: DEFAULT_URL_POLL,
        }
    }

    /// Tag carried in logs and screenshot requests.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_screenshot_hook(mut self, hook: Option<Arc<dyn ScreenshotHook>>) -> Self {
        self.screenshot_hook = hook;
        self
    }

    pub fn with_url_poll_interval(mut self, interval: Duration) -> Self {
        self.url_poll_interval = interval;
        self
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Execute one step.
    ///
    /// 1. Try candidates in order, each bounded by `per_candidate_timeout`
    ///    and by whatever is left of `overall_timeout`.
    /// 2. The first candidate that locates and accepts the action wins; no
    ///    later candidate is touched.
    /// 3. Misses are recorded and the next candidate is tried.
    /// 4. On total failure a screenshot is requested from the hook.
    pub async fn execute_step(
        &self,
        target: LogicalTarget,
        candidates: &[LocatorCandidate],
        action: &StepAction,
        per_candidate_timeout: Duration,
        overall_timeout: Duration,
    ) -> StepOutcome {
        let started = Instant::now();
        let deadline = started + overall_timeout;
        let mut attempts = Vec::with_capacity(candidates.len());
        let mut timed_out = false;
        let mut driver_failures = 0usize;

        info!(
            label = %self.label,
            target = %target,
            action = action.name(),
            candidates = candidates.len(),
            "executing step"
        );

        for (index, candidate) in candidates.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                timed_out = true;
                break;
            }
            let budget = per_candidate_timeout.min(remaining);
            let attempt_started = Instant::now();
            let result = match tokio::time::timeout(
                remaining,
                self.try_candidate(candidate, action, budget),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => {
                    timed_out = true;
                    Err(DriverError::Timeout(format!(
                        "step deadline reached on {}",
                        candidate.selector
                    )))
                }
            };
            let elapsed_ms = attempt_started.elapsed().as_millis() as u64;
            metrics::record_attempt(result.is_ok());

            match result {
                Ok(()) => {
                    debug!(
                        label = %self.label,
                        target = %target,
                        index,
                        selector = %candidate.selector,
                        strategy = %candidate.strategy,
                        elapsed_ms,
                        "candidate matched"
                    );
                    attempts.push(CandidateAttempt {
                        index,
                        selector: candidate.selector.clone(),
                        strategy: candidate.strategy,
                        matched: true,
                        error: None,
                        elapsed_ms,
                    });
                    metrics::record_step(target.name(), "succeeded");
                    return StepOutcome::success(
                        target,
                        index,
                        started.elapsed().as_millis() as u64,
                        attempts,
                    );
                }
                Err(err) => {
                    warn!(
                        label = %self.label,
                        target = %target,
                        index,
                        selector = %candidate.selector,
                        strategy = %candidate.strategy,
                        elapsed_ms,
                        error = %err,
                        "candidate failed"
                    );
                    if !err.is_element_miss() {
                        driver_failures += 1;
                    }
                    attempts.push(CandidateAttempt {
                        index,
                        selector: candidate.selector.clone(),
                        strategy: candidate.strategy,
                        matched: false,
                        error: Some(err.to_string()),
                        elapsed_ms,
                    });
                    if timed_out {
                        break;
                    }
                }
            }
        }

        let error = if timed_out {
            ErrorKind::Timeout
        } else if !attempts.is_empty() && driver_failures == attempts.len() {
            ErrorKind::DriverError
        } else {
            ErrorKind::AllCandidatesExhausted
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        warn!(
            label = %self.label,
            target = %target,
            error = %error,
            attempts = attempts.len(),
            elapsed_ms,
            "step failed"
        );
        metrics::record_step(target.name(), "failed");
        let capture_budget = deadline
            .saturating_duration_since(Instant::now())
            .max(SCREENSHOT_GRACE);
        if tokio::time::timeout(capture_budget, self.request_screenshot(target, error))
            .await
            .is_err()
        {
            warn!(
                label = %self.label,
                target = %target,
                budget_ms = capture_budget.as_millis() as u64,
                "failure screenshot abandoned"
            );
        }
        StepOutcome::failure(target, error, elapsed_ms, attempts)
    }

    async fn try_candidate(
        &self,
        candidate: &LocatorCandidate,
        action: &StepAction,
        budget: Duration,
    ) -> Result<(), DriverError> {
        let ui_action = match action {
            StepAction::AwaitUrl => return self.await_url(&candidate.selector, budget).await,
            StepAction::Click => UiAction::Click,
            StepAction::TypeText(text) => UiAction::Type(text.clone()),
        };
        let handle = self
            .driver
            .locate(&candidate.selector, candidate.strategy, budget)
            .await?;
        self.driver.act(&handle, &ui_action).await
    }

    async fn await_url(&self, fragment: &str, budget: Duration) -> Result<(), DriverError> {
        let driver = &self.driver;
        let outcome = poll_until(self.url_poll_interval, budget, None, || async move {
            let url = driver.current_url().await?;
            Ok::<_, DriverError>(url.contains(fragment).then_some(()))
        })
        .await?;
        match outcome {
            PollOutcome::Ready(()) => Ok(()),
            PollOutcome::TimedOut | PollOutcome::Cancelled => {
                Err(DriverError::NotFound(format!("url fragment '{fragment}'")))
            }
        }
    }

    async fn request_screenshot(&self, target: LogicalTarget, error: ErrorKind) {
        let Some(hook) = &self.screenshot_hook else {
            return;
        };
        match self.driver.screenshot().await {
            Ok(png) => {
                hook.capture(ScreenshotRequest {
                    label: self.label.clone(),
                    target,
                    error,
                    png,
                })
                .await
            }
            Err(err) => warn!(
                label = %self.label,
                target = %target,
                error = %err,
                "screenshot failed"
            ),
        }
    }
}
