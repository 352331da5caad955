//! TileCopy - cache-aside tile copying
//!
//! Copies map tiles addressed by `zoom/x/y` from an origin backend into a
//! destination backend while warming a persistent local cache. Every origin
//! read goes through two layers:
//!
//! - a [`limiter::RateLimiter`] that bounds concurrent and per-interval
//!   origin calls, and
//! - a [`fallback::CacheFallbackSource`] that answers from the cache when it
//!   can and collapses concurrent requests for the same tile into one fetch.
//!
//! # High-Level API
//!
//! ```ignore
//! use tilecopy::coord::ReadOptions;
//! use tilecopy::orchestrator::{CopyJob, JobOrchestrator, OrchestratorConfig};
//!
//! let options = ReadOptions::new(7, 7, "-121.4024,43.9992,-121.2483,44.125".parse()?)?;
//! let jobs = vec![CopyJob::new(
//!     "bend",
//!     "https://tiles.example.com/{z}/{x}/{y}.png",
//!     "file:///data/bend?filetype=png",
//!     options,
//! )];
//!
//! let orchestrator = JobOrchestrator::new(OrchestratorConfig::default())?;
//! let summary = orchestrator.run_all(jobs).await?;
//! summary.log();
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod coord;
pub mod fallback;
pub mod limiter;
pub mod logging;
pub mod orchestrator;
pub mod panic;
pub mod pipeline;

/// Version of the TileCopy library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
