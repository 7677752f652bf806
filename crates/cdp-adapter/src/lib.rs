//! Browser driver capability for MailPilot.
//!
//! - [`Driver`]: the surface the automation engine drives (navigate, locate,
//!   act, inspect, screenshot, close).
//! - [`ChromiumSessionFactory`]: launches Chromium over the DevTools protocol.
//! - [`scripted`]: deterministic in-process driver for tests and dry runs.

pub mod chromium;
pub mod config;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod scripted;

pub use chromium::{ChromiumDriver, ChromiumSessionFactory};
pub use config::DriverConfig;
pub use driver::{Driver, ElementHandle, SessionFactory, SessionOptions, UiAction};
pub use error::DriverError;
pub use mailpilot_core_types::SelectorStrategy;
pub use scripted::{ScriptedDriver, ScriptedSessionFactory};
