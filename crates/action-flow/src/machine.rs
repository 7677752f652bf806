//! Provider automation state machine

use std::sync::Arc;
use std::time::Duration;

use action_locator::ProviderProfile;
use action_primitives::{
    poll_until, PollOutcome, ScreenshotHook, StepAction, StepExecutor, StepOutcome,
};
use cdp_adapter::{Driver, DriverError};
use chrono::Utc;
use mailpilot_core_types::{EmailIntent, ErrorKind, LogicalTarget};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::errors::FlowError;
use crate::signatures;
use crate::types::{FlowTimings, ProviderOutcome, ProviderRunState, Transition};

/// One provider's compose-and-send run against a shared driver session.
///
/// The profile supplies everything provider-specific; the control flow is
/// the same for every provider:
///
/// ```text
/// NotStarted -> Navigating -> [AwaitingAuthentication] -> Composing
///            -> FillingFields -> Sending -> Succeeded | RequiresManualIntervention
/// ```
///
/// Any live state may end in `Failed(kind)`.
pub struct ProviderRun {
    profile: Arc<ProviderProfile>,
    executor: StepExecutor,
    timings: FlowTimings,
    cancel: CancellationToken,
    state: ProviderRunState,
    transitions: Vec<Transition>,
    steps: Vec<StepOutcome>,
}

impl ProviderRun {
    pub fn new(
        profile: Arc<ProviderProfile>,
        driver: Arc<dyn Driver>,
        timings: FlowTimings,
    ) -> Self {
        let executor = StepExecutor::new(driver).with_label(profile.id.clone());
        Self {
            profile,
            executor,
            timings,
            cancel: CancellationToken::new(),
            state: ProviderRunState::NotStarted,
            transitions: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn with_screenshot_hook(mut self, hook: Option<Arc<dyn ScreenshotHook>>) -> Self {
        self.executor = self.executor.with_screenshot_hook(hook);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> ProviderRunState {
        self.state
    }

    pub fn provider(&self) -> &str {
        &self.profile.id
    }

    /// Drives the machine from `NotStarted` to a terminal state.
    pub async fn run(&mut self, intent: &EmailIntent) -> Result<ProviderOutcome, FlowError> {
        if self.state != ProviderRunState::NotStarted {
            return Err(FlowError::NotRunnable(self.state));
        }
        let started = Instant::now();
        self.steps.clear();
        info!(provider = %self.profile.id, "provider run started");

        while !self.state.is_terminal() {
            let next = if self.cancel.is_cancelled() {
                ProviderRunState::Failed(ErrorKind::Cancelled)
            } else {
                match self.advance(intent).await {
                    Ok(next) => next,
                    Err(err) => {
                        warn!(
                            provider = %self.profile.id,
                            state = %self.state,
                            error = %err,
                            "provider run failed"
                        );
                        ProviderRunState::Failed(err.kind())
                    }
                }
            };
            if let Err(err) = self.transition(next) {
                error!(
                    provider = %self.profile.id,
                    error = %err,
                    "state machine rejected transition"
                );
                self.record(ProviderRunState::Failed(ErrorKind::DriverError));
            }
        }

        let outcome = ProviderOutcome {
            provider: self.profile.id.clone(),
            final_state: self.state,
            steps: self.steps.clone(),
            transitions: self.transitions.clone(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            provider = %self.profile.id,
            final_state = %outcome.final_state,
            elapsed_ms = outcome.elapsed_ms,
            "provider run finished"
        );
        Ok(outcome)
    }

    /// Resets an unsuccessful terminal run so it can be run again.
    pub fn retry(&mut self) -> Result<(), FlowError> {
        if !self.state.can_retry() {
            return Err(FlowError::InvalidTransition {
                from: self.state,
                to: ProviderRunState::NotStarted,
            });
        }
        info!(provider = %self.profile.id, from = %self.state, "provider run reset for retry");
        self.record(ProviderRunState::NotStarted);
        Ok(())
    }

    fn transition(&mut self, next: ProviderRunState) -> Result<(), FlowError> {
        if !self.state.can_transition_to(&next) {
            return Err(FlowError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        info!(
            provider = %self.profile.id,
            from = %self.state,
            to = %next,
            "provider state transition"
        );
        self.record(next);
        Ok(())
    }

    fn record(&mut self, next: ProviderRunState) {
        self.transitions.push(Transition {
            from: self.state,
            to: next,
            at: Utc::now(),
        });
        self.state = next;
    }

    async fn advance(&mut self, intent: &EmailIntent) -> Result<ProviderRunState, FlowError> {
        match self.state {
            ProviderRunState::NotStarted => Ok(ProviderRunState::Navigating),
            ProviderRunState::Navigating => self.navigate().await,
            ProviderRunState::AwaitingAuthentication => self.await_authentication().await,
            ProviderRunState::Composing => self.compose().await,
            ProviderRunState::FillingFields => self.fill_fields(intent).await,
            ProviderRunState::Sending => self.send().await,
            terminal => Ok(terminal),
        }
    }

    async fn navigate(&mut self) -> Result<ProviderRunState, FlowError> {
        let driver = Arc::clone(self.executor.driver());
        info!(provider = %self.profile.id, url = %self.profile.home_url, "navigating");
        driver.navigate(&self.profile.home_url).await?;
        self.pause(self.timings.post_navigate_settle).await?;

        let url = driver.current_url().await?;
        let content = driver.page_content().await?;
        if let Some(reason) = signatures::detect_block_reason(&self.profile, &content) {
            return Err(FlowError::AccessBlocked(reason));
        }
        if signatures::needs_login(&self.profile, &url, &content) {
            warn!(
                provider = %self.profile.id,
                url = %url,
                wait_secs = self.timings.auth_wait.as_secs(),
                "login required; waiting for manual sign-in"
            );
            return Ok(ProviderRunState::AwaitingAuthentication);
        }
        Ok(ProviderRunState::Composing)
    }

    async fn await_authentication(&mut self) -> Result<ProviderRunState, FlowError> {
        let driver = Arc::clone(self.executor.driver());
        let profile = Arc::clone(&self.profile);
        let outcome = poll_until(
            self.timings.auth_poll_interval,
            self.timings.auth_wait,
            Some(&self.cancel),
            || {
                let driver = Arc::clone(&driver);
                let profile = Arc::clone(&profile);
                async move {
                    let url = driver.current_url().await?;
                    let signed_in = signatures::is_authenticated(&profile, &url);
                    Ok::<_, DriverError>(signed_in.then_some(url))
                }
            },
        )
        .await?;

        match outcome {
            PollOutcome::Ready(url) => {
                info!(provider = %self.profile.id, url = %url, "manual sign-in detected");
                let content = driver.page_content().await?;
                if let Some(reason) = signatures::detect_block_reason(&self.profile, &content) {
                    return Err(FlowError::AccessBlocked(reason));
                }
                Ok(ProviderRunState::Composing)
            }
            PollOutcome::TimedOut => Err(FlowError::AuthenticationTimeout(
                self.timings.auth_wait.as_millis() as u64,
            )),
            PollOutcome::Cancelled => Err(FlowError::Cancelled),
        }
    }

    async fn compose(&mut self) -> Result<ProviderRunState, FlowError> {
        let outcome = self
            .step(LogicalTarget::ComposeButton, StepAction::Click)
            .await?;
        if !outcome.succeeded {
            return Err(FlowError::StepFailed {
                target: LogicalTarget::ComposeButton,
                kind: ErrorKind::ComposeUnavailable,
            });
        }

        if self.profile.has_target(LogicalTarget::NewComposeIndicatorUrlFragment) {
            let indicator = self
                .step(LogicalTarget::NewComposeIndicatorUrlFragment, StepAction::AwaitUrl)
                .await?;
            if !indicator.succeeded {
                warn!(
                    provider = %self.profile.id,
                    "compose window not confirmed by URL; continuing"
                );
            }
        }
        self.pause(self.timings.post_compose_delay).await?;
        Ok(ProviderRunState::FillingFields)
    }

    async fn fill_fields(&mut self, intent: &EmailIntent) -> Result<ProviderRunState, FlowError> {
        let recipient = self
            .step(
                LogicalTarget::RecipientField,
                StepAction::TypeText(intent.recipient.clone()),
            )
            .await?;
        if !recipient.succeeded {
            return Err(FlowError::StepFailed {
                target: LogicalTarget::RecipientField,
                kind: ErrorKind::RecipientFieldUnavailable,
            });
        }

        let optional_fields = [
            (LogicalTarget::SubjectField, &intent.subject),
            (LogicalTarget::BodyField, &intent.body),
        ];
        for (target, text) in optional_fields {
            self.pause(self.timings.inter_field_delay).await?;
            let outcome = self
                .step(target, StepAction::TypeText(text.clone()))
                .await?;
            if !outcome.succeeded {
                warn!(
                    provider = %self.profile.id,
                    target = %target,
                    "optional field not filled; continuing"
                );
            }
        }
        Ok(ProviderRunState::Sending)
    }

    async fn send(&mut self) -> Result<ProviderRunState, FlowError> {
        let outcome = self.step(LogicalTarget::SendButton, StepAction::Click).await?;
        if outcome.succeeded {
            info!(provider = %self.profile.id, "email sent");
            Ok(ProviderRunState::Succeeded)
        } else {
            warn!(
                provider = %self.profile.id,
                "send not confirmed; compose form is filled and needs a manual send"
            );
            Ok(ProviderRunState::RequiresManualIntervention)
        }
    }

    async fn step(
        &mut self,
        target: LogicalTarget,
        action: StepAction,
    ) -> Result<StepOutcome, FlowError> {
        if self.cancel.is_cancelled() {
            return Err(FlowError::Cancelled);
        }
        let candidates = self.profile.candidates(target)?;
        let outcome = self
            .executor
            .execute_step(
                target,
                candidates,
                &action,
                self.timings.per_candidate_timeout,
                self.timings.step_timeout,
            )
            .await;
        self.steps.push(outcome.clone());
        Ok(outcome)
    }

    async fn pause(&self, duration: Duration) -> Result<(), FlowError> {
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(FlowError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_locator::builtin;
    use cdp_adapter::ScriptedDriver;

    fn fast() -> FlowTimings {
        FlowTimings {
            per_candidate_timeout: Duration::from_millis(50),
            step_timeout: Duration::from_secs(1),
            auth_wait: Duration::from_secs(2),
            auth_poll_interval: Duration::from_millis(100),
            post_navigate_settle: Duration::ZERO,
            post_compose_delay: Duration::from_millis(10),
            inter_field_delay: Duration::from_millis(10),
        }
    }

    fn intent() -> EmailIntent {
        EmailIntent::new(
            "friend@example.com",
            "Lunch",
            "See you at noon",
            "send email to friend@example.com about Lunch. saying 'See you at noon'",
        )
    }

    fn selectors(profile: &ProviderProfile, target: LogicalTarget) -> Vec<String> {
        profile
            .candidates(target)
            .unwrap()
            .iter()
            .map(|candidate| candidate.selector.clone())
            .collect()
    }

    fn run_for(profile: ProviderProfile, driver: Arc<ScriptedDriver>) -> ProviderRun {
        ProviderRun::new(Arc::new(profile), driver, fast())
    }

    fn visited(outcome: &ProviderOutcome) -> Vec<ProviderRunState> {
        outcome.transitions.iter().map(|t| t.to).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn gmail_happy_path_fills_every_field_and_sends() {
        let driver = Arc::new(
            ScriptedDriver::permissive().with_url_after_click(
                "div[gh='cm']",
                "https://mail.google.com/mail/u/0/#inbox?compose=new",
            ),
        );
        let outcome = run_for(builtin::gmail(), driver.clone())
            .run(&intent())
            .await
            .unwrap();

        assert_eq!(outcome.final_state, ProviderRunState::Succeeded);
        assert!(outcome.succeeded());
        assert_eq!(
            visited(&outcome),
            vec![
                ProviderRunState::Navigating,
                ProviderRunState::Composing,
                ProviderRunState::FillingFields,
                ProviderRunState::Sending,
                ProviderRunState::Succeeded,
            ]
        );
        assert_eq!(driver.navigations(), vec!["https://mail.google.com"]);
        assert_eq!(
            driver.typed_into("input[peoplekit-id*='to']").as_deref(),
            Some("friend@example.com")
        );
        assert_eq!(driver.typed_into("input[name='subjectbox']").as_deref(), Some("Lunch"));
        assert!(driver.clicked("div[role='button'][data-tooltip='Send']"));
        assert!(outcome.steps.iter().all(|step| step.succeeded));
    }

    #[tokio::test(start_paused = true)]
    async fn send_failure_requires_manual_intervention() {
        let gmail = builtin::gmail();
        let driver = Arc::new(
            ScriptedDriver::permissive().hide_all(selectors(&gmail, LogicalTarget::SendButton)),
        );
        let outcome = run_for(gmail, driver.clone()).run(&intent()).await.unwrap();

        assert_eq!(outcome.final_state, ProviderRunState::RequiresManualIntervention);
        assert!(!outcome.succeeded());
        assert_eq!(driver.typed_into(".Am.Al.editable"), None);
        assert_eq!(
            driver
                .typed_into("div[role='textbox'][aria-label*='Message Body']")
                .as_deref(),
            Some("See you at noon")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn recipient_failure_is_fatal_and_skips_subject() {
        let gmail = builtin::gmail();
        let subject_selectors = selectors(&gmail, LogicalTarget::SubjectField);
        let driver = Arc::new(
            ScriptedDriver::permissive().hide_all(selectors(&gmail, LogicalTarget::RecipientField)),
        );
        let outcome = run_for(gmail, driver.clone()).run(&intent()).await.unwrap();

        assert_eq!(
            outcome.final_state,
            ProviderRunState::Failed(ErrorKind::RecipientFieldUnavailable)
        );
        let attempts = driver.locate_attempts();
        assert!(subject_selectors.iter().all(|s| !attempts.contains(s)));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_subject_and_body_do_not_block_sending() {
        let gmail = builtin::gmail();
        let driver = Arc::new(
            ScriptedDriver::permissive()
                .hide_all(selectors(&gmail, LogicalTarget::SubjectField))
                .hide_all(selectors(&gmail, LogicalTarget::BodyField)),
        );
        let outcome = run_for(gmail, driver).run(&intent()).await.unwrap();
        assert_eq!(outcome.final_state, ProviderRunState::Succeeded);
        let failed: Vec<_> = outcome
            .steps
            .iter()
            .filter(|step| !step.succeeded)
            .map(|step| step.target)
            .collect();
        assert!(failed.contains(&LogicalTarget::SubjectField));
        assert!(failed.contains(&LogicalTarget::BodyField));
    }

    #[tokio::test(start_paused = true)]
    async fn compose_failure_fails_the_run() {
        let outlook = builtin::outlook();
        let driver = Arc::new(
            ScriptedDriver::permissive()
                .hide_all(selectors(&outlook, LogicalTarget::ComposeButton)),
        );
        let outcome = run_for(outlook, driver).run(&intent()).await.unwrap();
        assert_eq!(
            outcome.final_state,
            ProviderRunState::Failed(ErrorKind::ComposeUnavailable)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_manual_sign_in_then_composes() {
        let driver = Arc::new(ScriptedDriver::permissive().with_url_sequence([
            "https://accounts.google.com/v3/signin/identifier",
            "https://accounts.google.com/v3/signin/challenge",
            "https://mail.google.com/mail/u/0/#inbox",
        ]));
        let outcome = run_for(builtin::gmail(), driver).run(&intent()).await.unwrap();

        assert_eq!(outcome.final_state, ProviderRunState::Succeeded);
        assert_eq!(
            &visited(&outcome)[..3],
            &[
                ProviderRunState::Navigating,
                ProviderRunState::AwaitingAuthentication,
                ProviderRunState::Composing,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sign_in_window_is_bounded() {
        let driver = Arc::new(
            ScriptedDriver::permissive().with_url_after_navigate("https://login.live.com/oauth20"),
        );
        let started = Instant::now();
        let outcome = run_for(builtin::outlook(), driver.clone()).run(&intent()).await.unwrap();

        assert_eq!(
            outcome.final_state,
            ProviderRunState::Failed(ErrorKind::AuthenticationTimeout)
        );
        assert!(started.elapsed() <= fast().auth_wait + Duration::from_millis(200));
        assert!(driver.actions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unresponsive_page_cannot_stretch_the_sign_in_window() {
        let driver = Arc::new(
            ScriptedDriver::permissive()
                .with_url_after_navigate("https://accounts.google.com/signin")
                .stalling_url_after(1),
        );
        let started = Instant::now();
        let outcome = run_for(builtin::gmail(), driver).run(&intent()).await.unwrap();

        assert_eq!(
            outcome.final_state,
            ProviderRunState::Failed(ErrorKind::AuthenticationTimeout)
        );
        assert!(started.elapsed() <= fast().auth_wait + Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_page_fails_without_touching_the_form() {
        let driver = Arc::new(
            ScriptedDriver::permissive()
                .with_page_content("<p>This browser or app may not be secure.</p>"),
        );
        let outcome = run_for(builtin::gmail(), driver.clone()).run(&intent()).await.unwrap();
        assert_eq!(outcome.final_state, ProviderRunState::Failed(ErrorKind::AccessBlocked));
        assert!(driver.locate_attempts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_errors_map_to_driver_error() {
        let driver = Arc::new(
            ScriptedDriver::permissive()
                .failing_navigation(DriverError::Io("net::ERR_NAME_NOT_RESOLVED".into())),
        );
        let outcome = run_for(builtin::gmail(), driver).run(&intent()).await.unwrap();
        assert_eq!(outcome.final_state, ProviderRunState::Failed(ErrorKind::DriverError));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_sign_in_wait() {
        let token = CancellationToken::new();
        let driver = Arc::new(
            ScriptedDriver::permissive()
                .with_url_after_navigate("https://accounts.google.com/signin"),
        );
        let mut run = ProviderRun::new(
            Arc::new(builtin::gmail()),
            driver,
            FlowTimings {
                auth_wait: Duration::from_secs(60),
                ..fast()
            },
        )
        .with_cancellation(token.clone());

        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });
        let started = Instant::now();
        let outcome = run.run(&intent()).await.unwrap();
        assert_eq!(outcome.final_state, ProviderRunState::Failed(ErrorKind::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn cancelled_before_start_never_navigates() {
        let token = CancellationToken::new();
        token.cancel();
        let driver = Arc::new(ScriptedDriver::permissive());
        let outcome = run_for(builtin::gmail(), driver.clone())
            .with_cancellation(token)
            .run(&intent())
            .await
            .unwrap();
        assert_eq!(outcome.final_state, ProviderRunState::Failed(ErrorKind::Cancelled));
        assert!(driver.navigations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_is_the_only_way_back_to_not_started() {
        let gmail = builtin::gmail();
        let driver = Arc::new(
            ScriptedDriver::permissive().hide_all(selectors(&gmail, LogicalTarget::SendButton)),
        );
        let mut run = run_for(gmail, driver);
        run.run(&intent()).await.unwrap();
        assert_eq!(run.state(), ProviderRunState::RequiresManualIntervention);
        assert!(matches!(
            run.run(&intent()).await,
            Err(FlowError::NotRunnable(ProviderRunState::RequiresManualIntervention))
        ));

        run.retry().unwrap();
        assert_eq!(run.state(), ProviderRunState::NotStarted);
        let second = run.run(&intent()).await.unwrap();
        assert_eq!(second.final_state, ProviderRunState::RequiresManualIntervention);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeded_runs_cannot_be_retried() {
        let mut run = run_for(builtin::outlook(), Arc::new(ScriptedDriver::permissive()));
        let outcome = run.run(&intent()).await.unwrap();
        assert!(outcome.succeeded());
        assert!(outcome
            .steps
            .iter()
            .all(|step| step.target != LogicalTarget::NewComposeIndicatorUrlFragment));
        assert!(run.retry().is_err());
    }
}
