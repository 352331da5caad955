//! Cache that stores nothing.

use crate::backend::{BackendError, Tile, TileBackend, TileData, TileSink, TileSource};
use crate::coord::TileKey;

/// A tile cache that always misses and discards writes.
///
/// Used when caching is disabled, so the copy path stays the same shape.
///
/// # Example
///
/// ```
/// use tilecopy::backend::{Tile, TileData, TileSink, TileSource};
/// use tilecopy::cache::NoOpTileCache;
/// use tilecopy::coord::TileKey;
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let cache = NoOpTileCache::new("memory://source");
/// let key = TileKey { zoom: 0, x: 0, y: 0 };
///
/// cache.put_tile(Tile::new(key, TileData::new("X"))).await.unwrap();
/// assert!(cache.get_tile(key).await.unwrap_err().is_not_found());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct NoOpTileCache {
    identity: String,
}

impl NoOpTileCache {
    /// Creates a no-op cache for the source with the given identity.
    pub fn new(source_identity: &str) -> Self {
        Self {
            identity: format!("noop-cache://{}", source_identity),
        }
    }
}

impl TileBackend for NoOpTileCache {
    fn identity(&self) -> &str {
        &self.identity
    }
}

impl TileSource for NoOpTileCache {
    async fn get_tile(&self, key: TileKey) -> Result<TileData, BackendError> {
        Err(BackendError::NotFound(key))
    }
}

impl TileSink for NoOpTileCache {
    async fn put_tile(&self, _tile: Tile) -> Result<(), BackendError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_cache_always_misses() {
        let cache = NoOpTileCache::new("memory://source");
        let key = TileKey { zoom: 3, x: 1, y: 1 };

        cache
            .put_tile(Tile::new(key, TileData::new("X")))
            .await
            .unwrap();

        assert_eq!(cache.get_tile(key).await, Err(BackendError::NotFound(key)));
        assert_eq!(cache.identity(), "noop-cache://memory://source");
    }
}
