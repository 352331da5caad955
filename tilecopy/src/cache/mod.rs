//! Persistent tile cache.
//!
//! The cache is an ordinary tile backend that is both readable and writable.
//! Each source gets its own namespace inside the shared cache directory.
//! Entries are never invalidated; the cache only warms.

mod disk;
mod maintenance;
mod noop;
mod path;

pub use disk::{CacheStats, DiskTileCache};
pub use maintenance::{clear_disk_cache, disk_cache_stats, ClearResult, DiskCacheStats};
pub use noop::NoOpTileCache;
pub use path::{cache_namespace, headers_path, namespace_directory, tile_path};

use crate::backend::{BackendError, Tile, TileBackend, TileData, TileSink, TileSource};
use crate::coord::TileKey;
use std::path::Path;

/// The cache a copy job uses: on disk, or disabled.
#[derive(Debug)]
pub enum CacheBackend {
    Disk(DiskTileCache),
    Disabled(NoOpTileCache),
}

impl CacheBackend {
    /// Opens the cache for `source_identity`, or a no-op cache when
    /// `cache_dir` is `None`.
    pub fn open(cache_dir: Option<&Path>, source_identity: &str) -> Result<Self, BackendError> {
        match cache_dir {
            Some(dir) => Ok(Self::Disk(DiskTileCache::open(dir, source_identity)?)),
            None => Ok(Self::Disabled(NoOpTileCache::new(source_identity))),
        }
    }

    /// Disk counters, if the cache is on disk.
    pub fn stats(&self) -> Option<CacheStats> {
        match self {
            Self::Disk(cache) => Some(cache.stats()),
            Self::Disabled(_) => None,
        }
    }
}

impl TileBackend for CacheBackend {
    fn identity(&self) -> &str {
        match self {
            Self::Disk(c) => c.identity(),
            Self::Disabled(c) => c.identity(),
        }
    }
}

impl TileSource for CacheBackend {
    async fn get_tile(&self, key: TileKey) -> Result<TileData, BackendError> {
        match self {
            Self::Disk(c) => c.get_tile(key).await,
            Self::Disabled(c) => c.get_tile(key).await,
        }
    }
}

impl TileSink for CacheBackend {
    async fn put_tile(&self, tile: Tile) -> Result<(), BackendError> {
        match self {
            Self::Disk(c) => c.put_tile(tile).await,
            Self::Disabled(c) => c.put_tile(tile).await,
        }
    }
}
