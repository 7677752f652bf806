//! Screenshot capture callback invoked when a step fails outright

use async_trait::async_trait;
use mailpilot_core_types::{ErrorKind, LogicalTarget};

/// Payload handed to a [`ScreenshotHook`].
#[derive(Debug, Clone)]
pub struct ScreenshotRequest {
    /// Who was running the step, usually the provider id.
    pub label: String,
    pub target: LogicalTarget,
    pub error: ErrorKind,
    pub png: Vec<u8>,
}

/// Storage for failure screenshots. The executor only requests captures;
/// where they end up is the hook's business.
#[async_trait]
pub trait ScreenshotHook: Send + Sync {
    async fn capture(&self, request: ScreenshotRequest);
}
