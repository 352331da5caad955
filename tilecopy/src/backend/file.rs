//! Directory-tree tile store (`file://` backends)

use super::types::{BackendError, Tile, TileBackend, TileData, TileSink, TileSource};
use crate::coord::TileKey;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// File extension used when a `file://` URI does not name one.
pub const DEFAULT_FILETYPE: &str = "png";

/// Tiles stored as `<root>/<z>/<x>/<y>.<filetype>`.
///
/// Only payloads are persisted. On read, `content-type` is derived from the
/// file extension.
#[derive(Debug)]
pub struct FileTileStore {
    root: PathBuf,
    filetype: String,
    identity: String,
}

impl FileTileStore {
    /// Opens a store rooted at `root`. The directory is created lazily on
    /// first write.
    pub fn new(root: impl Into<PathBuf>, filetype: &str) -> Self {
        let root = root.into();
        let filetype = filetype.trim_start_matches('.').to_ascii_lowercase();
        let identity = format!("file://{}?filetype={}", root.display(), filetype);

        Self {
            root,
            filetype,
            identity,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn filetype(&self) -> &str {
        &self.filetype
    }

    /// Path of the file holding `key`.
    pub fn tile_path(&self, key: &TileKey) -> PathBuf {
        self.root
            .join(key.zoom.to_string())
            .join(key.x.to_string())
            .join(format!("{}.{}", key.y, self.filetype))
    }
}

/// MIME type for a tile file extension.
pub fn content_type_for(filetype: &str) -> &'static str {
    match filetype {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "pbf" | "mvt" => "application/x-protobuf",
        "json" | "geojson" => "application/json",
        _ => "application/octet-stream",
    }
}

/// Suffix counter shared by every store and cache in the process, so
/// writers of the same path never share a temporary file.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique temporary sibling of `path`.
fn temp_path(path: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".tmp.{}.{}", std::process::id(), n));
    PathBuf::from(name)
}

/// Writes `data` to `path` through a temporary sibling and a rename, so
/// readers never observe a partially written file.
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), BackendError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BackendError::io(parent, e))?;
    }

    let temp = temp_path(path);
    if let Err(e) = tokio::fs::write(&temp, data).await {
        return Err(BackendError::io(&temp, e));
    }

    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(BackendError::io(path, e));
    }

    Ok(())
}

impl TileBackend for FileTileStore {
    fn identity(&self) -> &str {
        &self.identity
    }
}

impl TileSource for FileTileStore {
    async fn get_tile(&self, key: TileKey) -> Result<TileData, BackendError> {
        let path = self.tile_path(&key);

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                trace!(tile = %key, path = %path.display(), bytes = bytes.len(), "Tile file read");
                Ok(TileData::new(bytes)
                    .with_header("content-type", content_type_for(&self.filetype)))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BackendError::NotFound(key)),
            Err(e) => Err(BackendError::io(&path, e)),
        }
    }
}

impl TileSink for FileTileStore {
    async fn put_tile(&self, tile: Tile) -> Result<(), BackendError> {
        let path = self.tile_path(&tile.key);

        write_atomic(&path, tile.data.data()).await?;

        trace!(tile = %tile.key, path = %path.display(), "Tile file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tile_path_layout() {
        let store = FileTileStore::new("/tiles", "JPG");
        let key = TileKey { zoom: 7, x: 20, y: 46 };

        assert_eq!(store.tile_path(&key), PathBuf::from("/tiles/7/20/46.jpg"));
        assert_eq!(store.identity(), "file:///tiles?filetype=jpg");
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = FileTileStore::new(dir.path(), DEFAULT_FILETYPE);
        let key = TileKey { zoom: 2, x: 1, y: 3 };

        store
            .put_tile(Tile::new(key, TileData::new("X")))
            .await
            .unwrap();

        assert!(dir.path().join("2/1/3.png").exists());

        let data = store.get_tile(key).await.unwrap();
        assert_eq!(data.data().as_ref(), b"X");
        assert_eq!(data.content_type(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FileTileStore::new(dir.path(), "png");
        let key = TileKey { zoom: 0, x: 0, y: 0 };

        assert_eq!(store.get_tile(key).await, Err(BackendError::NotFound(key)));
    }

    #[tokio::test]
    async fn test_rewrite_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = FileTileStore::new(dir.path(), "png");
        let key = TileKey { zoom: 1, x: 0, y: 0 };

        for body in ["a", "b"] {
            store
                .put_tile(Tile::new(key, TileData::new(body)))
                .await
                .unwrap();
        }

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("1/0"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("0.png")]);
        assert_eq!(store.get_tile(key).await.unwrap().data().as_ref(), b"b");
    }

    #[test]
    fn test_temp_paths_are_unique_siblings() {
        let path = Path::new("/tiles/7/20/46.png");
        let a = temp_path(path);
        let b = temp_path(path);

        assert_ne!(a, b);
        assert_eq!(a.parent(), path.parent());
        assert!(a.to_string_lossy().starts_with("/tiles/7/20/46.png.tmp."));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("png"), "image/png");
        assert_eq!(content_type_for("jpeg"), "image/jpeg");
        assert_eq!(content_type_for("bin"), "application/octet-stream");
    }
}
