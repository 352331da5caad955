//! Rate-limited tile source decorator.

use super::rate::RateLimiter;
use crate::backend::{BackendError, TileBackend, TileData, TileSource};
use crate::coord::TileKey;
use std::sync::Arc;
use tracing::trace;

/// Wraps a source so every `get_tile` goes through a [`RateLimiter`].
///
/// Wrapping is idempotent: if the inner source already reports
/// [`is_rate_limited`](TileSource::is_rate_limited), calls pass straight
/// through and are not admitted a second time.
pub struct RateLimitedSource<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
}

impl<S: TileSource> RateLimitedSource<S> {
    pub fn new(inner: S, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

impl<S: TileSource> TileBackend for RateLimitedSource<S> {
    fn identity(&self) -> &str {
        self.inner.identity()
    }
}

impl<S: TileSource> TileSource for RateLimitedSource<S> {
    async fn get_tile(&self, key: TileKey) -> Result<TileData, BackendError> {
        if self.inner.is_rate_limited() {
            self.inner.get_tile(key).await
        } else {
            self.limiter
                .run(async {
                    trace!(tile = %key, origin = self.inner.identity(), "Origin fetch admitted");
                    self.inner.get_tile(key).await
                })
                .await
        }
    }

    fn is_rate_limited(&self) -> bool {
        true
    }
}
