//! Step execution for webmail automation
//!
//! This crate provides the unit of work the provider flow is built from:
//! - [`StepExecutor`]: tries candidate locators in priority order with
//!   bounded waits and reports a [`StepOutcome`]
//! - [`poll_until`]: bounded, cancellable polling
//! - [`ScreenshotHook`]: failure screenshot callback

pub mod executor;
pub mod hook;
pub mod metrics;
pub mod types;
pub mod waiting;

pub use executor::*;
pub use hook::*;
pub use types::*;
pub use waiting::*;
