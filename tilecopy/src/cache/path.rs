//! Cache path construction.

use crate::coord::TileKey;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Extension of cached payload files.
pub const TILE_EXTENSION: &str = "tile";

/// Extension of the header sidecar stored next to each payload.
pub const HEADERS_EXTENSION: &str = "headers";

/// File in each namespace directory recording the source identity it holds.
pub const SOURCE_MARKER: &str = "source.txt";

/// Derives the cache namespace for a source identity.
///
/// The first 16 hex characters of the SHA-256 of the identity, so distinct
/// sources never share tiles and the directory name is filesystem-safe.
///
/// # Example
///
/// ```
/// use tilecopy::cache::cache_namespace;
///
/// let ns = cache_namespace("https://tiles.example.com/{z}/{x}/{y}.png");
/// assert_eq!(ns.len(), 16);
/// assert_ne!(ns, cache_namespace("memory://other"));
/// ```
pub fn cache_namespace(identity: &str) -> String {
    let digest = Sha256::digest(identity.as_bytes());
    digest
        .iter()
        .take(8)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Directory holding every tile of one namespace.
pub fn namespace_directory(cache_dir: &Path, namespace: &str) -> PathBuf {
    cache_dir.join(namespace)
}

/// Path of the payload file for `key`:
///
/// ```text
/// <cache_dir>/<namespace>/<zoom>/<x>/<y>.tile
/// ```
pub fn tile_path(namespace_dir: &Path, key: &TileKey) -> PathBuf {
    tile_file(namespace_dir, key, TILE_EXTENSION)
}

/// Path of the header sidecar for `key`.
pub fn headers_path(namespace_dir: &Path, key: &TileKey) -> PathBuf {
    tile_file(namespace_dir, key, HEADERS_EXTENSION)
}

fn tile_file(namespace_dir: &Path, key: &TileKey, extension: &str) -> PathBuf {
    namespace_dir
        .join(key.zoom.to_string())
        .join(key.x.to_string())
        .join(format!("{}.{}", key.y, extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_is_stable_hex() {
        let ns = cache_namespace("memory://source");
        assert_eq!(ns, cache_namespace("memory://source"));
        assert_eq!(ns.len(), 16);
        assert!(ns.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_namespace_of_empty_identity() {
        // SHA-256("") = e3b0c442 98fc1c14 ...
        assert_eq!(cache_namespace(""), "e3b0c44298fc1c14");
    }

    #[test]
    fn test_tile_paths() {
        let ns_dir = namespace_directory(Path::new("/cache"), "abcd");
        let key = TileKey { zoom: 7, x: 20, y: 46 };

        assert_eq!(tile_path(&ns_dir, &key), PathBuf::from("/cache/abcd/7/20/46.tile"));
        assert_eq!(
            headers_path(&ns_dir, &key),
            PathBuf::from("/cache/abcd/7/20/46.headers")
        );
    }
}
