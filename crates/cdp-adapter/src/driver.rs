use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mailpilot_core_types::SelectorStrategy;

use crate::error::DriverError;

/// Opaque reference to an element located on the current page.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub id: u64,
    pub selector: String,
}

/// Interaction applied to a located element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiAction {
    Click,
    /// Clears the field, then types the text.
    Type(String),
}

impl UiAction {
    pub fn name(&self) -> &'static str {
        match self {
            UiAction::Click => "click",
            UiAction::Type(_) => "type",
        }
    }
}

/// The browser surface the automation engine drives.
///
/// Every call may fail with a [`DriverError`]; none of them panic on a
/// missing element.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    async fn page_content(&self) -> Result<String, DriverError>;

    /// Waits up to `timeout` for the selector to match an element.
    async fn locate(
        &self,
        selector: &str,
        strategy: SelectorStrategy,
        timeout: Duration,
    ) -> Result<ElementHandle, DriverError>;

    async fn act(&self, handle: &ElementHandle, action: &UiAction) -> Result<(), DriverError>;

    /// PNG bytes of the visible viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;

    async fn close(&self) -> Result<(), DriverError>;
}

/// Per-session launch options requested by the caller.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub headless: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { headless: true }
    }
}

/// Hands out driver sessions. The holder releases a session by calling
/// [`Driver::close`] once.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn acquire(&self, options: &SessionOptions) -> Result<Arc<dyn Driver>, DriverError>;
}
