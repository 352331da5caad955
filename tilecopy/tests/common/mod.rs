//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tilecopy::backend::{BackendError, Tile, TileBackend, TileData, TileSink, TileSource};
use tilecopy::coord::{Bounds, ReadOptions, TileKey};
use tokio::time::Instant;

/// Bounding box around Bend, Oregon.
pub const BEND_BOUNDS: [f64; 4] = [-121.4024, 43.9992, -121.2483, 44.125];

pub fn bend_options(minzoom: u8, maxzoom: u8) -> ReadOptions {
    let [min_lon, min_lat, max_lon, max_lat] = BEND_BOUNDS;
    ReadOptions::new(
        minzoom,
        maxzoom,
        Bounds::new(min_lon, min_lat, max_lon, max_lat).unwrap(),
    )
    .unwrap()
}

/// Zoom 7 extent covering columns 9..=11 and rows 19..=21, slightly inset
/// from the tile edges.
pub fn nine_tile_options() -> ReadOptions {
    let bounds = Bounds::new(
        -154.6875 + 0.01,
        75.49715731893083 + 0.01,
        -146.25 - 0.01,
        77.46602847687328 - 0.01,
    )
    .unwrap();
    ReadOptions::new(7, 7, bounds).unwrap()
}

pub fn key(zoom: u8, x: u32, y: u32) -> TileKey {
    TileKey::new(zoom, x, y).unwrap()
}

/// Origin that answers every key with the same payload.
///
/// Counts calls, records admission instants, tracks concurrency, can be
/// slowed down and can fail selected keys.
pub struct MockOrigin {
    identity: String,
    payload: &'static str,
    delay: Duration,
    failing: HashSet<TileKey>,
    calls: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    started: Mutex<Vec<(TileKey, Instant)>>,
}

impl MockOrigin {
    pub fn new(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            payload: "X",
            delay: Duration::ZERO,
            failing: HashSet::new(),
            calls: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_on(mut self, key: TileKey) -> Self {
        self.failing.insert(key);
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Keys in the order their fetch started.
    pub fn requested_keys(&self) -> Vec<TileKey> {
        self.started.lock().unwrap().iter().map(|(k, _)| *k).collect()
    }

    /// Instants at which fetches started.
    pub fn start_times(&self) -> Vec<Instant> {
        self.started.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn error_for(key: TileKey) -> BackendError {
        BackendError::Http(format!("HTTP 503 for {}", key))
    }
}

impl TileBackend for MockOrigin {
    fn identity(&self) -> &str {
        &self.identity
    }
}

impl TileSource for MockOrigin {
    async fn get_tile(&self, key: TileKey) -> Result<TileData, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.lock().unwrap().push((key, Instant::now()));
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.contains(&key) {
            Err(Self::error_for(key))
        } else {
            Ok(TileData::new(self.payload).with_header("content-type", "image/png"))
        }
    }
}

/// Sink that accepts tiles until it reaches a given key.
pub struct FailingSink {
    fail_at: TileKey,
    written: Mutex<Vec<TileKey>>,
}

impl FailingSink {
    pub fn new(fail_at: TileKey) -> Self {
        Self {
            fail_at,
            written: Mutex::new(Vec::new()),
        }
    }

    pub fn written(&self) -> Vec<TileKey> {
        self.written.lock().unwrap().clone()
    }
}

impl TileBackend for FailingSink {
    fn identity(&self) -> &str {
        "failing://sink"
    }
}

impl TileSink for FailingSink {
    async fn put_tile(&self, tile: Tile) -> Result<(), BackendError> {
        if tile.key == self.fail_at {
            return Err(BackendError::Other("disk full".into()));
        }
        self.written.lock().unwrap().push(tile.key);
        Ok(())
    }
}

/// Cache that misses every read and rejects every write.
pub struct BrokenCache;

impl TileBackend for BrokenCache {
    fn identity(&self) -> &str {
        "broken://cache"
    }
}

impl TileSource for BrokenCache {
    async fn get_tile(&self, key: TileKey) -> Result<TileData, BackendError> {
        Err(BackendError::NotFound(key))
    }
}

impl TileSink for BrokenCache {
    async fn put_tile(&self, _tile: Tile) -> Result<(), BackendError> {
        Err(BackendError::Other("read-only filesystem".into()))
    }

    async fn finish(&self) -> Result<(), BackendError> {
        Err(BackendError::Other("flush failed".into()))
    }
}
