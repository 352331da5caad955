//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    /// Persistent tile cache
    pub cache: CacheSettings,
    /// Origin rate limiting
    pub limiter: LimiterSettings,
    /// Copy pipeline tuning
    pub pipeline: PipelineSettings,
    /// HTTP driver settings
    pub http: HttpSettings,
    pub logging: LoggingSettings,
    pub orchestrator: OrchestratorSettings,
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Cache directory path
    pub directory: PathBuf,
    /// When false, jobs run without a cache
    pub enabled: bool,
}

/// Rate limiter configuration, applied per origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterSettings {
    /// Maximum origin fetches in flight at once
    pub max_concurrent: usize,
    /// Minimum milliseconds between two origin fetches
    pub min_interval_ms: u64,
}

/// Copy pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Tile fetches kept in flight ahead of the destination
    pub read_concurrency: usize,
    /// Tiles buffered for the cache writer before cache copies are skipped
    pub cache_queue_capacity: usize,
    /// Tiles between progress log lines (0 disables)
    pub progress_interval: u64,
}

/// HTTP driver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retry attempts after a transient failure
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff between retries.
    /// Actual delay = base_delay * 2^attempt
    pub retry_base_delay_ms: u64,
    pub user_agent: String,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file path, cleared at the start of each session
    pub file: PathBuf,
    /// Default level filter when RUST_LOG is not set
    pub level: String,
}

/// Job orchestration configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Exit with a failure status when any job fails
    pub fail_on_job_error: bool,
}
