//! Persistent disk tile cache.

use super::path::{
    cache_namespace, headers_path, namespace_directory, tile_path, SOURCE_MARKER,
};
use crate::backend::{
    write_atomic, BackendError, Headers, Tile, TileBackend, TileData, TileSink, TileSource,
};
use crate::coord::TileKey;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Point-in-time counters of a [`DiskTileCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub read_errors: u64,
    pub writes: u64,
    pub write_errors: u64,
}

impl CacheStats {
    /// Fraction of reads served from disk, 0.0 when nothing was read.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    read_errors: AtomicU64,
    writes: AtomicU64,
    write_errors: AtomicU64,
}

/// Disk cache for the tiles of one source.
///
/// Tiles live under `<cache_dir>/<namespace>/`, where the namespace is
/// derived from the source identity. Each tile is a payload file plus a
/// header sidecar; both are written through a uniquely named temporary file
/// and a rename, so readers never see partial data and concurrent writers of
/// the same key, even through separate caches, each land a whole file.
#[derive(Debug)]
pub struct DiskTileCache {
    namespace_dir: PathBuf,
    identity: String,
    counters: Counters,
}

impl DiskTileCache {
    /// Opens (creating if needed) the cache namespace for `source_identity`.
    pub fn open(cache_dir: &Path, source_identity: &str) -> Result<Self, BackendError> {
        let namespace = cache_namespace(source_identity);
        let namespace_dir = namespace_directory(cache_dir, &namespace);

        fs::create_dir_all(&namespace_dir).map_err(|e| BackendError::io(&namespace_dir, e))?;

        let marker = namespace_dir.join(SOURCE_MARKER);
        if !marker.exists() {
            fs::write(&marker, format!("{}\n", source_identity))
                .map_err(|e| BackendError::io(&marker, e))?;
        }

        debug!(
            source = source_identity,
            namespace = %namespace,
            path = %namespace_dir.display(),
            "Opened disk tile cache"
        );

        Ok(Self {
            identity: format!("cache://{}", namespace_dir.display()),
            namespace_dir,
            counters: Counters::default(),
        })
    }

    /// Directory holding this cache's tiles.
    pub fn directory(&self) -> &Path {
        &self.namespace_dir
    }

    /// Returns true if a payload for `key` is on disk.
    pub fn contains(&self, key: &TileKey) -> bool {
        tile_path(&self.namespace_dir, key).exists()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            read_errors: self.counters.read_errors.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            write_errors: self.counters.write_errors.load(Ordering::Relaxed),
        }
    }

    async fn read_headers(&self, key: &TileKey) -> Headers {
        let path = headers_path(&self.namespace_dir, key);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => decode_headers(&text),
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!(tile = %key, error = %e, "Unreadable cached headers, ignoring");
                }
                Headers::new()
            }
        }
    }

    async fn write(&self, tile: &Tile) -> Result<(), BackendError> {
        let headers = headers_path(&self.namespace_dir, &tile.key);
        let payload = tile_path(&self.namespace_dir, &tile.key);

        // Headers first: a payload on disk implies its headers are there too
        write_atomic(&headers, encode_headers(tile.data.headers()).as_bytes()).await?;
        write_atomic(&payload, tile.data.data()).await
    }
}

/// Serializes headers as `name: value` lines.
fn encode_headers(headers: &Headers) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}\n", name, value))
        .collect()
}

fn decode_headers(text: &str) -> Headers {
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect()
}

impl TileBackend for DiskTileCache {
    fn identity(&self) -> &str {
        &self.identity
    }
}

impl TileSource for DiskTileCache {
    async fn get_tile(&self, key: TileKey) -> Result<TileData, BackendError> {
        let path = tile_path(&self.namespace_dir, &key);

        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                return Err(BackendError::NotFound(key));
            }
            Err(e) => {
                self.counters.read_errors.fetch_add(1, Ordering::Relaxed);
                return Err(BackendError::io(&path, e));
            }
        };

        let headers = self.read_headers(&key).await;
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        trace!(tile = %key, bytes = data.len(), "Disk cache hit");

        Ok(TileData::with_headers(data, headers))
    }
}

impl TileSink for DiskTileCache {
    async fn put_tile(&self, tile: Tile) -> Result<(), BackendError> {
        match self.write(&tile).await {
            Ok(()) => {
                self.counters.writes.fetch_add(1, Ordering::Relaxed);
                trace!(tile = %tile.key, bytes = tile.data.len(), "Disk cache write");
                Ok(())
            }
            Err(e) => {
                self.counters.write_errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }
}
