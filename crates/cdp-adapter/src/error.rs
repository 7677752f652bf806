use thiserror::Error;

/// Failures surfaced by a [`crate::Driver`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("element not found: {0}")]
    NotFound(String),
    #[error("stale element: {0}")]
    StaleElement(String),
    #[error("element not interactable: {0}")]
    NotInteractable(String),
    #[error("driver timed out: {0}")]
    Timeout(String),
    #[error("browser launch failed: {0}")]
    Launch(String),
    #[error("driver i/o failure: {0}")]
    Io(String),
}

impl DriverError {
    /// Element-level failures; the caller may move on to another candidate.
    pub fn is_element_miss(&self) -> bool {
        matches!(
            self,
            DriverError::NotFound(_)
                | DriverError::StaleElement(_)
                | DriverError::NotInteractable(_)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            DriverError::NotFound(_) => "not_found",
            DriverError::StaleElement(_) => "stale_element",
            DriverError::NotInteractable(_) => "not_interactable",
            DriverError::Timeout(_) => "timeout",
            DriverError::Launch(_) => "launch",
            DriverError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_misses_are_distinguished_from_io() {
        assert!(DriverError::NotFound("#a".into()).is_element_miss());
        assert!(DriverError::StaleElement("#a".into()).is_element_miss());
        assert!(!DriverError::Io("socket closed".into()).is_element_miss());
        assert!(!DriverError::Timeout("goto".into()).is_element_miss());
    }
}
