//! Error types for copy jobs.

use crate::backend::BackendError;
use crate::coord::TileKey;
use thiserror::Error;

/// Why a copy job failed.
///
/// Cache write failures never appear here; they are reported through
/// [`CacheWriteReport`](super::CacheWriteReport) instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CopyError {
    /// Backends could not be opened
    #[error("setup failed: {0}")]
    Setup(#[source] BackendError),

    /// The source stream failed, either from the origin or from the cache
    /// fallback path
    #[error("source failed: {0}")]
    Source(#[source] BackendError),

    /// Writing a tile to the destination, or finishing it, failed
    #[error("destination failed{}: {source}", at_tile(.key))]
    Destination {
        /// Tile being written, `None` when finishing the sink failed
        key: Option<TileKey>,
        source: BackendError,
    },

    /// The job was cancelled before it finished
    #[error("copy cancelled")]
    Cancelled,
}

fn at_tile(key: &Option<TileKey>) -> String {
    key.map(|k| format!(" at {}", k)).unwrap_or_default()
}

impl CopyError {
    /// The underlying backend error, if there is one.
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            Self::Setup(e) | Self::Source(e) => Some(e),
            Self::Destination { source, .. } => Some(source),
            Self::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_display() {
        let err = CopyError::Destination {
            key: Some(TileKey { zoom: 1, x: 0, y: 1 }),
            source: BackendError::Other("disk full".into()),
        };
        assert_eq!(err.to_string(), "destination failed at 1/0/1: disk full");

        let finish = CopyError::Destination {
            key: None,
            source: BackendError::Other("flush".into()),
        };
        assert_eq!(finish.to_string(), "destination failed: flush");
    }

    #[test]
    fn test_backend_error_accessor() {
        let inner = BackendError::Http("HTTP 500".into());
        assert_eq!(CopyError::Source(inner.clone()).backend_error(), Some(&inner));
        assert_eq!(CopyError::Cancelled.backend_error(), None);
    }
}
