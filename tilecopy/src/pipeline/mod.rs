//! Tile copy pipeline.
//!
//! Reads an extent from a source through the rate limiter and the cache
//! fallback, then forks every tile into a best-effort cache write and an
//! authoritative destination write.

mod cache_writer;
mod config;
mod copy;
mod error;

pub use cache_writer::{CacheWriteReport, CacheWriter, MAX_REPORTED_FAILURES};
pub use config::{PipelineConfig, DEFAULT_CACHE_QUEUE_CAPACITY, DEFAULT_PROGRESS_INTERVAL};
pub use copy::{CopyPipeline, CopyReport};
pub use error::CopyError;
