//! Background cache writer.
//!
//! Tiles read by a copy job are handed to a detached task that writes them
//! into the cache. The hand-off never waits: if the queue is full the cache
//! copy of that tile is skipped, so a slow cache can never stall the
//! destination. Write failures are logged and counted but never fail the job.

use crate::backend::{BackendError, Tile, TileSink};
use crate::coord::TileKey;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Individual failures kept in a report; further ones are only counted.
pub const MAX_REPORTED_FAILURES: usize = 64;

/// Outcome of a job's cache writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheWriteReport {
    /// Tiles stored in the cache
    pub written: u64,
    /// Tiles whose cache write failed
    pub failed: u64,
    /// Tiles not offered to the cache because its queue was full
    pub skipped: u64,
    /// The first failures, in order
    pub failures: Vec<(TileKey, BackendError)>,
    /// Error from finishing the cache, or from the writer task itself
    pub finish_error: Option<BackendError>,
}

impl CacheWriteReport {
    /// True if every offered tile was written and the cache finished cleanly.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.skipped == 0 && self.finish_error.is_none()
    }

    fn record_failure(&mut self, key: TileKey, error: BackendError) {
        self.failed += 1;
        if self.failures.len() < MAX_REPORTED_FAILURES {
            self.failures.push((key, error));
        }
    }
}

/// Handle to a running cache writer task.
pub struct CacheWriter {
    tx: mpsc::Sender<Tile>,
    handle: JoinHandle<CacheWriteReport>,
    skipped: u64,
}

impl CacheWriter {
    /// Spawns the writer task on the current runtime.
    pub fn spawn<C: TileSink>(cache: Arc<C>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(drain(cache, rx));

        Self {
            tx,
            handle,
            skipped: 0,
        }
    }

    /// Queues a tile for the cache without waiting.
    ///
    /// Returns false if the tile was skipped.
    pub fn submit(&mut self, tile: Tile) -> bool {
        match self.tx.try_send(tile) {
            Ok(()) => true,
            Err(TrySendError::Full(tile)) => {
                self.skipped += 1;
                debug!(tile = %tile.key, "Cache queue full, skipping cache write");
                false
            }
            Err(TrySendError::Closed(tile)) => {
                self.skipped += 1;
                warn!(tile = %tile.key, "Cache writer stopped, skipping cache write");
                false
            }
        }
    }

    /// Lets the writer drain its queue, then returns its report.
    pub async fn close(self) -> CacheWriteReport {
        let Self {
            tx,
            handle,
            skipped,
        } = self;
        drop(tx);

        let mut report = match handle.await {
            Ok(report) => report,
            Err(e) => CacheWriteReport {
                finish_error: Some(BackendError::Other(format!("cache writer task failed: {}", e))),
                ..CacheWriteReport::default()
            },
        };
        report.skipped += skipped;
        report
    }
}

async fn drain<C: TileSink>(cache: Arc<C>, mut rx: mpsc::Receiver<Tile>) -> CacheWriteReport {
    let mut report = CacheWriteReport::default();

    while let Some(tile) = rx.recv().await {
        let key = tile.key;
        match cache.put_tile(tile).await {
            Ok(()) => report.written += 1,
            Err(e) => {
                warn!(tile = %key, cache = cache.identity(), error = %e, "Cache write failed");
                report.record_failure(key, e);
            }
        }
    }

    if let Err(e) = cache.finish().await {
        warn!(cache = cache.identity(), error = %e, "Cache finish failed");
        report.finish_error = Some(e);
    }

    report
}
