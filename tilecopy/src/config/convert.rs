//! Conversion from file settings to the runtime configs of each component.

use std::path::PathBuf;
use std::time::Duration;

use super::settings::*;
use crate::backend::HttpConfig;
use crate::limiter::RateLimitConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::pipeline::PipelineConfig;

impl LimiterSettings {
    pub fn to_rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_concurrent: self.max_concurrent,
            min_interval: Duration::from_millis(self.min_interval_ms),
        }
    }
}

impl PipelineSettings {
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            read_concurrency: self.read_concurrency,
            cache_queue_capacity: self.cache_queue_capacity,
            progress_interval: self.progress_interval,
        }
    }
}

impl HttpSettings {
    pub fn to_http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
            user_agent: self.user_agent.clone(),
        }
    }
}

impl CacheSettings {
    /// The cache directory, or `None` when caching is disabled.
    pub fn effective_directory(&self) -> Option<PathBuf> {
        self.enabled.then(|| self.directory.clone())
    }
}

impl ConfigFile {
    /// Builds the orchestrator settings for a run.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            pipeline: self.pipeline.to_pipeline_config(),
            limiter: self.limiter.to_rate_limit_config(),
            http: self.http.to_http_config(),
            cache_dir: self.cache.effective_directory(),
        }
    }
}
