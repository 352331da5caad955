//! One limiter per origin.

use super::rate::{RateLimitConfig, RateLimiter};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Hands out the shared [`RateLimiter`] for each origin identity.
///
/// Every pipeline reading from the same origin gets the same limiter, so the
/// ceiling holds across concurrent jobs rather than per job.
#[derive(Debug)]
pub struct LimiterRegistry {
    config: RateLimitConfig,
    limiters: DashMap<String, Arc<RateLimiter>>,
}

impl LimiterRegistry {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            limiters: DashMap::new(),
        }
    }

    /// The limiter for `identity`, created on first request.
    pub fn limiter_for(&self, identity: &str) -> Arc<RateLimiter> {
        if let Some(existing) = self.limiters.get(identity) {
            return Arc::clone(existing.value());
        }

        self.limiters
            .entry(identity.to_string())
            .or_insert_with(|| {
                debug!(
                    origin = identity,
                    max_concurrent = self.config.max_concurrent,
                    min_interval_ms = self.config.min_interval.as_millis() as u64,
                    "Creating rate limiter"
                );
                Arc::new(RateLimiter::new(identity, self.config))
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    /// Logs the counters of every limiter.
    pub fn log_stats(&self) {
        for entry in self.limiters.iter() {
            entry.value().log_stats();
        }
    }
}

impl Default for LimiterRegistry {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
