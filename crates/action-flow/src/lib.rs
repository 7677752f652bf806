//! Provider automation flow
//!
//! One state machine drives every webmail provider; providers differ only
//! in their [`action_locator::ProviderProfile`]. Failures are folded into a
//! terminal [`ProviderRunState`] and never escape a run.

pub mod errors;
pub mod machine;
pub mod signatures;
pub mod types;

pub use errors::FlowError;
pub use machine::ProviderRun;
pub use types::{FlowTimings, ProviderOutcome, ProviderRunState, Transition};
