//! Task scheduling for MailPilot.
//!
//! A [`SchedulerService`] accepts send requests, records them in a
//! [`TaskRegistry`] and hands them to a bounded [`WorkerPool`]. Each worker
//! runs the [`TaskOrchestrator`], which drives every requested provider over
//! one shared browser session.

pub mod api;
pub mod error;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod registry;
pub mod runtime;

pub use api::{SchedulerService, TaskDispatcher};
pub use error::SchedulerError;
pub use model::{
    normalize_providers, OrchestratorConfig, SchedulerConfig, TaskRecord, TaskReport, TaskRequest,
    TaskStatus,
};
pub use orchestrator::TaskOrchestrator;
pub use registry::TaskRegistry;
pub use runtime::{TaskEnvelope, WorkerPool};
