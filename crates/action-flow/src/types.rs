//! State, timing and outcome types for provider runs

use std::fmt;
use std::time::Duration;

use action_primitives::StepOutcome;
use chrono::{DateTime, Utc};
use mailpilot_core_types::ErrorKind;
use serde::{Deserialize, Serialize};

/// Lifecycle of one provider run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum ProviderRunState {
    NotStarted,
    Navigating,
    AwaitingAuthentication,
    Composing,
    FillingFields,
    Sending,
    Succeeded,
    Failed(ErrorKind),
    RequiresManualIntervention,
}

impl ProviderRunState {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderRunState::NotStarted => "not_started",
            ProviderRunState::Navigating => "navigating",
            ProviderRunState::AwaitingAuthentication => "awaiting_authentication",
            ProviderRunState::Composing => "composing",
            ProviderRunState::FillingFields => "filling_fields",
            ProviderRunState::Sending => "sending",
            ProviderRunState::Succeeded => "succeeded",
            ProviderRunState::Failed(_) => "failed",
            ProviderRunState::RequiresManualIntervention => "requires_manual_intervention",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProviderRunState::Succeeded
                | ProviderRunState::Failed(_)
                | ProviderRunState::RequiresManualIntervention
        )
    }

    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            ProviderRunState::Failed(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Forward edges of the state graph. Any live state may fail; the
    /// retry edge back to `NotStarted` is handled by [`Self::can_retry`].
    pub fn can_transition_to(&self, next: &ProviderRunState) -> bool {
        use ProviderRunState::*;
        if matches!(next, Failed(_)) {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (NotStarted, Navigating)
                | (Navigating, AwaitingAuthentication)
                | (Navigating, Composing)
                | (AwaitingAuthentication, Composing)
                | (Composing, FillingFields)
                | (FillingFields, Sending)
                | (Sending, Succeeded)
                | (Sending, RequiresManualIntervention)
        )
    }

    pub fn can_retry(&self) -> bool {
        matches!(
            self,
            ProviderRunState::Failed(_) | ProviderRunState::RequiresManualIntervention
        )
    }
}

impl fmt::Display for ProviderRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderRunState::Failed(kind) => write!(f, "failed({})", kind),
            other => f.write_str(other.name()),
        }
    }
}

/// One recorded edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: ProviderRunState,
    pub to: ProviderRunState,
    pub at: DateTime<Utc>,
}

/// Waits and pauses used by a provider run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowTimings {
    /// Locate budget for a single candidate.
    pub per_candidate_timeout: Duration,
    /// Budget for a whole candidate chain.
    pub step_timeout: Duration,
    /// Manual login window.
    pub auth_wait: Duration,
    pub auth_poll_interval: Duration,
    /// Pause after navigation before the page is inspected.
    pub post_navigate_settle: Duration,
    /// Pause after the compose window opens.
    pub post_compose_delay: Duration,
    /// Pause between recipient, subject and body.
    pub inter_field_delay: Duration,
}

impl Default for FlowTimings {
    fn default() -> Self {
        Self {
            per_candidate_timeout: Duration::from_secs(5),
            step_timeout: Duration::from_secs(30),
            auth_wait: Duration::from_secs(60),
            auth_poll_interval: Duration::from_secs(2),
            post_navigate_settle: Duration::from_secs(5),
            post_compose_delay: Duration::from_secs(3),
            inter_field_delay: Duration::from_secs(1),
        }
    }
}

/// Terminal report for one provider run.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderOutcome {
    pub provider: String,
    pub final_state: ProviderRunState,
    pub steps: Vec<StepOutcome>,
    pub transitions: Vec<Transition>,
    pub elapsed_ms: u64,
}

impl ProviderOutcome {
    /// Only `Succeeded` counts as a delivered send.
    pub fn succeeded(&self) -> bool {
        self.final_state == ProviderRunState::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProviderRunState::*;

    #[test]
    fn happy_path_edges_are_allowed() {
        let path = [
            NotStarted,
            Navigating,
            AwaitingAuthentication,
            Composing,
            FillingFields,
            Sending,
            Succeeded,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(&pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(Navigating.can_transition_to(&Composing));
    }

    #[test]
    fn backward_and_terminal_edges_are_rejected() {
        assert!(!Composing.can_transition_to(&Navigating));
        assert!(!FillingFields.can_transition_to(&Composing));
        assert!(!Succeeded.can_transition_to(&Failed(ErrorKind::Timeout)));
        assert!(!Failed(ErrorKind::Timeout).can_transition_to(&NotStarted));
        assert!(!NotStarted.can_transition_to(&Sending));
    }

    #[test]
    fn retry_only_from_unsuccessful_terminals() {
        assert!(Failed(ErrorKind::ComposeUnavailable).can_retry());
        assert!(RequiresManualIntervention.can_retry());
        assert!(!Succeeded.can_retry());
        assert!(!Sending.can_retry());
    }

    #[test]
    fn failed_state_serializes_with_its_error() {
        let json = serde_json::to_value(Failed(ErrorKind::RecipientFieldUnavailable)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": "failed", "error": "recipient_field_unavailable"})
        );
        assert_eq!(
            serde_json::to_value(Succeeded).unwrap(),
            serde_json::json!({"state": "succeeded"})
        );
    }
}
