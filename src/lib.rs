//! MailPilot application crate
//!
//! Wires the automation crates into a runnable service: instruction parsing,
//! layered configuration, the HTTP API, the CLI and metrics exposition.

pub mod app_context;
pub mod cli;
pub mod config;
pub mod errors;
pub mod intent;
pub mod metrics;
pub mod screenshots;
pub mod server;

pub use app_context::AppContext;
pub use config::AppConfig;
pub use errors::{AppError, AppResult};
pub use intent::{InstructionParser, IntentError, KeywordInstructionParser};
