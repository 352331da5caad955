//! Default values and constants for all configuration settings.

use std::path::PathBuf;

use super::settings::*;
use crate::backend::http::DEFAULT_USER_AGENT;
use crate::limiter::{DEFAULT_MAX_CONCURRENT, DEFAULT_MIN_INTERVAL};
use crate::pipeline::{DEFAULT_CACHE_QUEUE_CAPACITY, DEFAULT_PROGRESS_INTERVAL};

/// Default tile fetches in flight ahead of the destination.
pub const DEFAULT_READ_CONCURRENCY: usize = crate::backend::DEFAULT_READ_CONCURRENCY;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default HTTP retry attempts.
pub const DEFAULT_HTTP_MAX_RETRIES: u32 = 3;

/// Default HTTP backoff base in milliseconds.
pub const DEFAULT_HTTP_RETRY_BASE_DELAY_MS: u64 = 250;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Name of the config directory under the home directory.
pub const CONFIG_DIR_NAME: &str = ".tilecopy";

/// Default cache directory (~/.cache/tilecopy on Linux).
pub fn default_cache_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("tilecopy")
}

/// Default log file (~/.tilecopy/tilecopy.log).
pub fn default_log_file() -> PathBuf {
    config_directory().join("tilecopy.log")
}

/// Get the path to the config directory (~/.tilecopy).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Get the path to the config file (~/.tilecopy/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
            enabled: true,
        }
    }
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            min_interval_ms: DEFAULT_MIN_INTERVAL.as_millis() as u64,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            read_concurrency: DEFAULT_READ_CONCURRENCY,
            cache_queue_capacity: DEFAULT_CACHE_QUEUE_CAPACITY,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            max_retries: DEFAULT_HTTP_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_HTTP_RETRY_BASE_DELAY_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}
