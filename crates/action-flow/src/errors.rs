//! Flow error types

use action_locator::LocatorError;
use cdp_adapter::DriverError;
use mailpilot_core_types::{ErrorKind, LogicalTarget};
use thiserror::Error;

use crate::types::ProviderRunState;

/// Errors raised inside state handlers. Every one of them ends the run in
/// `Failed(kind())`; none escape [`crate::ProviderRun::run`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// Driver call failed outside a step
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Profile lookup failed
    #[error("Locator error: {0}")]
    Locator(#[from] LocatorError),

    /// Page refused automated access
    #[error("Access blocked: {0}")]
    AccessBlocked(String),

    /// Manual login window elapsed
    #[error("Authentication not completed within {0}ms")]
    AuthenticationTimeout(u64),

    /// A fatal step failed
    #[error("Step {target} failed: {kind}")]
    StepFailed {
        target: LogicalTarget,
        kind: ErrorKind,
    },

    /// Run was cancelled
    #[error("Run cancelled")]
    Cancelled,

    /// Edge not present in the state graph
    #[error("Invalid transition {from} -> {to}")]
    InvalidTransition {
        from: ProviderRunState,
        to: ProviderRunState,
    },

    /// `run` called on a machine that is not in `NotStarted`
    #[error("Run cannot start from state {0}")]
    NotRunnable(ProviderRunState),
}

impl FlowError {
    /// Terminal error kind for this failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::Driver(_) => ErrorKind::DriverError,
            FlowError::Locator(err) => err.kind().unwrap_or(ErrorKind::DriverError),
            FlowError::AccessBlocked(_) => ErrorKind::AccessBlocked,
            FlowError::AuthenticationTimeout(_) => ErrorKind::AuthenticationTimeout,
            FlowError::StepFailed { kind, .. } => *kind,
            FlowError::Cancelled => ErrorKind::Cancelled,
            FlowError::InvalidTransition { .. } | FlowError::NotRunnable(_) => {
                ErrorKind::DriverError
            }
        }
    }
}
