//! Error types for locator resolution

use mailpilot_core_types::{ErrorKind, LogicalTarget};
use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// Provider has no profile in the catalog
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Provider is known but has no candidates for the target
    #[error("No candidates configured for {target} on provider '{provider}'")]
    UnknownTarget {
        provider: String,
        target: LogicalTarget,
    },

    /// Profile failed validation
    #[error("Invalid profile '{provider}': {reason}")]
    InvalidProfile { provider: String, reason: String },

    /// Profile file could not be read or parsed
    #[error("Failed to load provider profiles from {path}: {reason}")]
    Load { path: String, reason: String },
}

impl LocatorError {
    /// Shared error taxonomy entry, if this error has one
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            LocatorError::UnknownProvider(_) => Some(ErrorKind::UnknownProvider),
            LocatorError::UnknownTarget { .. } => Some(ErrorKind::UnknownTarget),
            LocatorError::InvalidProfile { .. } | LocatorError::Load { .. } => None,
        }
    }
}
