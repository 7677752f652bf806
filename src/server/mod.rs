//! HTTP surface: task submission, status, provider listing, live updates.

mod router;
mod state;

pub use router::build_router;
pub use state::ServeState;
