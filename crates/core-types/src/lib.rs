//! Shared primitives for the MailPilot crates.
//!
//! Everything here is plain data: the email intent handed to the engine, the
//! logical UI roles the engine understands, and the error taxonomy every
//! layer reports through.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use uuid::Uuid;

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(transparent))]
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Normalized (trimmed, lower-case) webmail provider name.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(transparent))]
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// What email to send, plus the instruction it was derived from.
///
/// Produced once by the instruction parser and only ever read afterwards.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EmailIntent {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub raw_instruction: String,
}

impl EmailIntent {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        raw_instruction: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            raw_instruction: raw_instruction.into(),
        }
    }
}

/// Abstract UI roles, stable across providers.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum LogicalTarget {
    ComposeButton,
    RecipientField,
    SubjectField,
    BodyField,
    SendButton,
    NewComposeIndicatorUrlFragment,
}

impl LogicalTarget {
    pub const ALL: [LogicalTarget; 6] = [
        LogicalTarget::ComposeButton,
        LogicalTarget::RecipientField,
        LogicalTarget::SubjectField,
        LogicalTarget::BodyField,
        LogicalTarget::SendButton,
        LogicalTarget::NewComposeIndicatorUrlFragment,
    ];

    /// Targets every provider profile has to configure.
    pub const REQUIRED: [LogicalTarget; 5] = [
        LogicalTarget::ComposeButton,
        LogicalTarget::RecipientField,
        LogicalTarget::SubjectField,
        LogicalTarget::BodyField,
        LogicalTarget::SendButton,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LogicalTarget::ComposeButton => "compose_button",
            LogicalTarget::RecipientField => "recipient_field",
            LogicalTarget::SubjectField => "subject_field",
            LogicalTarget::BodyField => "body_field",
            LogicalTarget::SendButton => "send_button",
            LogicalTarget::NewComposeIndicatorUrlFragment => "new_compose_indicator_url_fragment",
        }
    }
}

impl fmt::Display for LogicalTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown logical target: {0}")]
pub struct ParseTargetError(pub String);

impl FromStr for LogicalTarget {
    type Err = ParseTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogicalTarget::ALL
            .into_iter()
            .find(|target| target.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseTargetError(s.to_string()))
    }
}

/// How a candidate selector is matched against the page.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default)]
pub enum SelectorStrategy {
    #[default]
    Css,
    Xpath,
    /// Visible text containing the selector string.
    TextContains,
}

impl SelectorStrategy {
    pub fn name(self) -> &'static str {
        match self {
            SelectorStrategy::Css => "css",
            SelectorStrategy::Xpath => "xpath",
            SelectorStrategy::TextContains => "text_contains",
        }
    }
}

impl fmt::Display for SelectorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error taxonomy shared by every layer of the engine.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Error)]
pub enum ErrorKind {
    #[error("unknown provider")]
    UnknownProvider,
    #[error("unknown target")]
    UnknownTarget,
    #[error("all candidates exhausted")]
    AllCandidatesExhausted,
    #[error("step timed out")]
    Timeout,
    #[error("authentication was not completed in time")]
    AuthenticationTimeout,
    #[error("compose control unavailable")]
    ComposeUnavailable,
    #[error("recipient field unavailable")]
    RecipientFieldUnavailable,
    #[error("driver error")]
    DriverError,
    #[error("provider blocked automated access")]
    AccessBlocked,
    #[error("run cancelled")]
    Cancelled,
    #[error("not found")]
    NotFound,
}

impl ErrorKind {
    /// Configuration/programming errors surface immediately instead of being
    /// folded into a provider result.
    pub fn is_configuration(self) -> bool {
        matches!(self, ErrorKind::UnknownProvider | ErrorKind::UnknownTarget)
    }
}
