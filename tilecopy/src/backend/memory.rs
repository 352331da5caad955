//! In-process tile store

use super::types::{BackendError, Tile, TileBackend, TileData, TileSink, TileSource};
use crate::coord::TileKey;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A named tile store held in memory.
///
/// Acts as both source and sink. Stores opened by name through the same
/// [`BackendFactory`](super::BackendFactory) share their contents, which makes
/// `memory://` URIs usable for tests and for chaining jobs in one process.
#[derive(Debug)]
pub struct MemoryTileStore {
    identity: String,
    tiles: DashMap<TileKey, TileData>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryTileStore {
    /// Creates an empty store called `name`.
    pub fn new(name: &str) -> Self {
        Self {
            identity: format!("memory://{}", name),
            tiles: DashMap::new(),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Inserts a tile directly, bypassing write accounting.
    pub fn insert(&self, key: TileKey, data: TileData) {
        self.tiles.insert(key, data);
    }

    pub fn get(&self, key: &TileKey) -> Option<TileData> {
        self.tiles.get(key).map(|entry| entry.value().clone())
    }

    /// All stored keys in tile order.
    pub fn keys(&self) -> Vec<TileKey> {
        let mut keys: Vec<_> = self.tiles.iter().map(|entry| *entry.key()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Number of `get_tile` calls served.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of `put_tile` calls accepted.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl TileBackend for MemoryTileStore {
    fn identity(&self) -> &str {
        &self.identity
    }
}

impl TileSource for MemoryTileStore {
    async fn get_tile(&self, key: TileKey) -> Result<TileData, BackendError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.get(&key).ok_or(BackendError::NotFound(key))
    }
}

impl TileSink for MemoryTileStore {
    async fn put_tile(&self, tile: Tile) -> Result<(), BackendError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.tiles.insert(tile.key, tile.data);
        Ok(())
    }
}
