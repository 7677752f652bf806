use action_locator::LocatorError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use mailpilot_scheduler::SchedulerError;
use serde::Serialize;
use thiserror::Error;

use crate::intent::IntentError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Intent(#[from] IntentError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Locator(#[from] LocatorError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::Intent(_) | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Scheduler(err) => match err {
                SchedulerError::UnknownProviders { .. } | SchedulerError::InvalidRequest(_) => {
                    StatusCode::BAD_REQUEST
                }
                SchedulerError::NotFound(_) => StatusCode::NOT_FOUND,
                SchedulerError::ServerBusy => StatusCode::SERVICE_UNAVAILABLE,
                SchedulerError::Session(_)
                | SchedulerError::Cancelled
                | SchedulerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Locator(LocatorError::UnknownProvider(_)) => StatusCode::BAD_REQUEST,
            AppError::Locator(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Intent(IntentError::MissingRecipient(_)) => "missing_recipient",
            AppError::Intent(IntentError::EmptyInstruction) => "empty_instruction",
            AppError::Scheduler(SchedulerError::UnknownProviders { .. }) => "unknown_provider",
            AppError::Scheduler(SchedulerError::NotFound(_)) => "task_not_found",
            AppError::Scheduler(SchedulerError::ServerBusy) => "server_busy",
            AppError::Scheduler(SchedulerError::InvalidRequest(_))
            | AppError::InvalidRequest(_) => "invalid_request",
            AppError::Scheduler(_) => "scheduler_error",
            AppError::Locator(LocatorError::UnknownProvider(_)) => "unknown_provider",
            AppError::Locator(_) => "provider_profile_error",
            AppError::Config(_) => "configuration_error",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_client_and_server_errors() {
        let unknown = AppError::from(SchedulerError::UnknownProviders {
            unknown: vec!["bogus".into()],
            supported: vec!["gmail".into(), "outlook".into()],
        });
        assert_eq!(unknown.http_status(), StatusCode::BAD_REQUEST);
        assert!(unknown.to_string().contains("supported: gmail, outlook"));

        assert_eq!(
            AppError::from(SchedulerError::NotFound("x".into())).http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(SchedulerError::ServerBusy).http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(IntentError::MissingRecipient("hi".into())).http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal("boom".into()).http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
