//! Origin rate limiting.

mod rate;
mod registry;
mod source;

pub use rate::{
    LimiterStats, RateLimitConfig, RateLimiter, RatePermit, DEFAULT_MAX_CONCURRENT,
    DEFAULT_MIN_INTERVAL,
};
pub use registry::LimiterRegistry;
pub use source::RateLimitedSource;
