//! The copy pipeline.
//!
//! ```text
//!                          ┌──► cache writer (queued, best effort)
//! source ─► rate limit ─► cache fallback ─► read stream ─┤
//!                          └──► destination (awaited, authoritative)
//! ```
//!
//! The destination write of each tile is awaited before the next tile is
//! pulled, so a slow destination paces the origin.

use super::cache_writer::{CacheWriteReport, CacheWriter};
use super::config::PipelineConfig;
use super::error::CopyError;
use crate::backend::{read_stream, BackendError, Tile, TileBackend, TileSink, TileSource};
use crate::coord::ReadOptions;
use crate::fallback::{CacheFallbackSource, LockTable};
use crate::limiter::{LimiterRegistry, RateLimitedSource};
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Summary of a finished copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    /// Tiles pulled from the source
    pub tiles_read: u64,
    /// Tiles stored in the destination
    pub tiles_written: u64,
    pub cache: CacheWriteReport,
    pub elapsed: Duration,
}

/// Copies the tiles of an extent from a source to a sink through the cache.
///
/// Pipelines built from the same [`LockTable`] and [`LimiterRegistry`]
/// coordinate with each other: two jobs reading one origin share its rate
/// limit and never fetch the same tile twice at once.
pub struct CopyPipeline {
    config: PipelineConfig,
    locks: Arc<LockTable>,
    limiters: Arc<LimiterRegistry>,
    cancellation: CancellationToken,
}

impl CopyPipeline {
    pub fn new(
        config: PipelineConfig,
        locks: Arc<LockTable>,
        limiters: Arc<LimiterRegistry>,
    ) -> Self {
        Self {
            config,
            locks,
            limiters,
            cancellation: CancellationToken::new(),
        }
    }

    /// Stops the copy early when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the copy.
    ///
    /// `cache` must already be scoped to `source` (see
    /// [`CacheBackend::open`](crate::cache::CacheBackend::open)).
    ///
    /// # Errors
    ///
    /// - [`CopyError::Source`] if fetching a tile fails
    /// - [`CopyError::Destination`] if writing a tile or finishing the sink
    ///   fails
    /// - [`CopyError::Cancelled`] if the cancellation token fires
    ///
    /// Cache failures are never errors; they are in [`CopyReport::cache`].
    /// Whatever the outcome, the cache writer is drained before returning.
    pub async fn run<S, K, C>(
        &self,
        source: S,
        sink: K,
        cache: Arc<C>,
        options: &ReadOptions,
    ) -> Result<CopyReport, CopyError>
    where
        S: TileSource,
        K: TileSink,
        C: TileSource + TileSink,
    {
        let started = Instant::now();

        let limiter = self.limiters.limiter_for(source.identity());
        let limited = RateLimitedSource::new(source, limiter);
        let fallback = Arc::new(CacheFallbackSource::new(
            limited,
            Arc::clone(&cache),
            Arc::clone(&self.locks),
        ));

        let total = options.tile_count();
        info!(
            source = fallback.identity(),
            destination = sink.identity(),
            minzoom = options.minzoom,
            maxzoom = options.maxzoom,
            bounds = %options.bounds,
            tiles = total,
            "Starting copy"
        );

        let mut tiles = read_stream(Arc::clone(&fallback), options, self.config.read_concurrency);
        let mut cache_writer = CacheWriter::spawn(cache, self.config.cache_queue_capacity);
        let mut progress = Progress::new(total, self.config.progress_interval);

        let mut outcome = self
            .pump(&mut tiles, &sink, &mut cache_writer, &mut progress)
            .await;
        // Stop any read-ahead before waiting on the cache
        drop(tiles);

        if outcome.is_ok() {
            outcome = sink
                .finish()
                .await
                .map_err(|source| CopyError::Destination { key: None, source });
        }

        let cache_report = cache_writer.close().await;
        fallback.log_stats();

        if cache_report.failed > 0 || cache_report.finish_error.is_some() {
            info!(
                failed = cache_report.failed,
                finish_error = cache_report.finish_error.is_some(),
                "Cache writes had failures; destination is unaffected"
            );
        }

        outcome?;

        let report = CopyReport {
            tiles_read: progress.read,
            tiles_written: progress.written,
            cache: cache_report,
            elapsed: started.elapsed(),
        };
        info!(
            tiles_written = report.tiles_written,
            cache_written = report.cache.written,
            cache_skipped = report.cache.skipped,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Copy complete"
        );
        Ok(report)
    }

    async fn pump<K: TileSink>(
        &self,
        tiles: &mut BoxStream<'static, Result<Tile, BackendError>>,
        sink: &K,
        cache_writer: &mut CacheWriter,
        progress: &mut Progress,
    ) -> Result<(), CopyError> {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => {
                    info!(written = progress.written, "Copy cancelled");
                    return Err(CopyError::Cancelled);
                }
                next = tiles.next() => next,
            };

            let tile = match next {
                Some(Ok(tile)) => tile,
                Some(Err(e)) => {
                    debug!(error = %e, "Source stream failed");
                    return Err(CopyError::Source(e));
                }
                None => return Ok(()),
            };
            progress.read += 1;

            let key = tile.key;
            cache_writer.submit(tile.clone());

            sink.put_tile(tile)
                .await
                .map_err(|source| CopyError::Destination {
                    key: Some(key),
                    source,
                })?;
            progress.tile_written();
        }
    }
}

struct Progress {
    total: u64,
    interval: u64,
    read: u64,
    written: u64,
}

impl Progress {
    fn new(total: u64, interval: u64) -> Self {
        Self {
            total,
            interval,
            read: 0,
            written: 0,
        }
    }

    fn tile_written(&mut self) {
        self.written += 1;
        if let Some(percent) = self.report_due() {
            info!(
                written = self.written,
                total = self.total,
                percent = format!("{:.1}", percent),
                "Copy progress"
            );
        }
    }

    /// Percent complete when a progress line is due, `None` otherwise.
    fn report_due(&self) -> Option<f64> {
        if self.interval == 0 || self.written % self.interval != 0 {
            return None;
        }
        if self.total == 0 {
            return Some(100.0);
        }
        Some(self.written as f64 * 100.0 / self.total as f64)
    }
}
