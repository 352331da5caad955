//! Running many copy jobs at once.
//!
//! Each [`CopyJob`] gets its own source, destination and cache, resolved by
//! the [`BackendFactory`](crate::backend::BackendFactory), and runs in its own
//! task. A failed job is recorded in the [`RunSummary`] and never stops the
//! others.

mod job;
mod runner;

pub use job::{CopyJob, JobOutcome, RunSummary};
pub use runner::{JobOrchestrator, OrchestratorConfig, OrchestratorError};
