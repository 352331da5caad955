//! Whole-directory cache inspection and cleanup.
//!
//! These walk the cache directory synchronously; call them from
//! `spawn_blocking` inside async code.

use super::path::{SOURCE_MARKER, TILE_EXTENSION};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Summary of a cache directory's contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCacheStats {
    /// Source namespaces present
    pub namespaces: usize,
    /// Cached tile payloads
    pub tiles: usize,
    /// Total bytes of every file under the cache directory
    pub bytes: u64,
}

/// Result of clearing a cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearResult {
    pub files_deleted: usize,
    pub bytes_freed: u64,
}

/// Counts namespaces, tiles and bytes under `cache_dir`.
///
/// A missing directory is an empty cache.
pub fn disk_cache_stats(cache_dir: &Path) -> io::Result<DiskCacheStats> {
    let mut stats = DiskCacheStats::default();
    if !cache_dir.exists() {
        return Ok(stats);
    }

    for entry in fs::read_dir(cache_dir)? {
        let path = entry?.path();
        if path.is_dir() && path.join(SOURCE_MARKER).exists() {
            stats.namespaces += 1;
        }
    }

    walk(cache_dir, &mut |path, size| {
        stats.bytes += size;
        if path.extension().is_some_and(|ext| ext == TILE_EXTENSION) {
            stats.tiles += 1;
        }
        Ok(())
    })?;

    Ok(stats)
}

/// Deletes everything under `cache_dir`, keeping the directory itself.
pub fn clear_disk_cache(cache_dir: &Path) -> io::Result<ClearResult> {
    let mut result = ClearResult::default();
    if !cache_dir.exists() {
        return Ok(result);
    }

    walk(cache_dir, &mut |_, size| {
        result.files_deleted += 1;
        result.bytes_freed += size;
        Ok(())
    })?;

    for entry in fs::read_dir(cache_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }

    debug!(
        path = %cache_dir.display(),
        files = result.files_deleted,
        bytes = result.bytes_freed,
        "Cleared disk cache"
    );
    Ok(result)
}

fn walk(dir: &Path, visit: &mut dyn FnMut(&Path, u64) -> io::Result<()>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;

        if metadata.is_dir() {
            walk(&path, visit)?;
        } else {
            visit(&path, metadata.len())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Tile, TileData, TileSink};
    use crate::cache::DiskTileCache;
    use crate::coord::TileKey;
    use tempfile::TempDir;

    async fn populate(dir: &Path) {
        for (source, n) in [("memory://a", 3u32), ("memory://b", 2)] {
            let cache = DiskTileCache::open(dir, source).unwrap();
            for x in 0..n {
                cache
                    .put_tile(Tile::new(TileKey { zoom: 2, x, y: 0 }, TileData::new("XY")))
                    .await
                    .unwrap();
            }
        }
    }

    #[test]
    fn test_stats_of_missing_directory() {
        let dir = TempDir::new().unwrap();
        let stats = disk_cache_stats(&dir.path().join("nope")).unwrap();
        assert_eq!(stats, DiskCacheStats::default());
    }

    #[tokio::test]
    async fn test_stats_counts_tiles_and_namespaces() {
        let dir = TempDir::new().unwrap();
        populate(dir.path()).await;

        let stats = disk_cache_stats(dir.path()).unwrap();
        assert_eq!(stats.namespaces, 2);
        assert_eq!(stats.tiles, 5);
        assert!(stats.bytes >= 10);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let dir = TempDir::new().unwrap();
        populate(dir.path()).await;

        let result = clear_disk_cache(dir.path()).unwrap();
        // 5 payloads, 5 header sidecars, 2 source markers
        assert_eq!(result.files_deleted, 12);
        assert!(dir.path().exists());
        assert_eq!(disk_cache_stats(dir.path()).unwrap(), DiskCacheStats::default());
    }
}
