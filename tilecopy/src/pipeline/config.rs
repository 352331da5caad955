//! Copy pipeline settings.

use crate::backend::DEFAULT_READ_CONCURRENCY;

/// Default capacity of the queue feeding the cache writer.
pub const DEFAULT_CACHE_QUEUE_CAPACITY: usize = 1024;

/// Default number of tiles between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1000;

/// Settings for [`CopyPipeline`](super::CopyPipeline).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Tile fetches kept in flight ahead of the destination writer
    pub read_concurrency: usize,
    /// Tiles buffered for the cache writer before cache copies are skipped
    pub cache_queue_capacity: usize,
    /// Log progress every this many tiles (0 disables)
    pub progress_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            read_concurrency: DEFAULT_READ_CONCURRENCY,
            cache_queue_capacity: DEFAULT_CACHE_QUEUE_CAPACITY,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}
