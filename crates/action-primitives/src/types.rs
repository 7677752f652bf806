//! Core data types for step execution

use mailpilot_core_types::{ErrorKind, LogicalTarget, SelectorStrategy};
use serde::Serialize;

/// What a step does once a candidate matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    Click,
    TypeText(String),
    /// Each candidate selector is a URL fragment; the step succeeds once the
    /// current URL contains it.
    AwaitUrl,
}

impl StepAction {
    pub fn name(&self) -> &'static str {
        match self {
            StepAction::Click => "click",
            StepAction::TypeText(_) => "type_text",
            StepAction::AwaitUrl => "await_url",
        }
    }
}

/// Diagnostic record of one candidate tried during a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateAttempt {
    pub index: usize,
    pub selector: String,
    pub strategy: SelectorStrategy,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub target: LogicalTarget,
    pub succeeded: bool,
    pub matched_candidate_index: Option<usize>,
    pub error: Option<ErrorKind>,
    pub elapsed_ms: u64,
    pub attempts: Vec<CandidateAttempt>,
}

impl StepOutcome {
    pub fn success(
        target: LogicalTarget,
        index: usize,
        elapsed_ms: u64,
        attempts: Vec<CandidateAttempt>,
    ) -> Self {
        Self {
            target,
            succeeded: true,
            matched_candidate_index: Some(index),
            error: None,
            elapsed_ms,
            attempts,
        }
    }

    pub fn failure(
        target: LogicalTarget,
        error: ErrorKind,
        elapsed_ms: u64,
        attempts: Vec<CandidateAttempt>,
    ) -> Self {
        Self {
            target,
            succeeded: false,
            matched_candidate_index: None,
            error: Some(error),
            elapsed_ms,
            attempts,
        }
    }

    /// Selector of the winning candidate.
    pub fn matched_selector(&self) -> Option<&str> {
        let index = self.matched_candidate_index?;
        self.attempts
            .iter()
            .find(|attempt| attempt.index == index)
            .map(|attempt| attempt.selector.as_str())
    }
}
