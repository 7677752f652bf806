use cdp_adapter::DriverError;
use mailpilot_core_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("server busy: task queue is full")]
    ServerBusy,
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("unsupported providers: {}; supported: {}", unknown.join(", "), supported.join(", "))]
    UnknownProviders {
        unknown: Vec<String>,
        supported: Vec<String>,
    },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("browser session unavailable: {0}")]
    Session(#[from] DriverError),
    #[error("task cancelled")]
    Cancelled,
    #[error("internal error: {0}")]
    Internal(String),
}

impl SchedulerError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SchedulerError::NotFound(_) => Some(ErrorKind::NotFound),
            SchedulerError::UnknownProviders { .. } => Some(ErrorKind::UnknownProvider),
            SchedulerError::Session(_) => Some(ErrorKind::DriverError),
            SchedulerError::Cancelled => Some(ErrorKind::Cancelled),
            SchedulerError::ServerBusy
            | SchedulerError::InvalidRequest(_)
            | SchedulerError::Internal(_) => None,
        }
    }
}
