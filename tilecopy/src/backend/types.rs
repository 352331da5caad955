//! Tile payloads, backend capability traits and backend errors

use crate::coord::TileKey;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Ordered response header map (`name -> value`).
///
/// Names are stored lowercase so lookups are case-insensitive.
pub type Headers = BTreeMap<String, String>;

/// Immutable tile payload plus the headers the origin returned with it.
///
/// Cloning is cheap: the body is a shared [`Bytes`] buffer and the header
/// map is reference counted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TileData {
    data: Bytes,
    headers: Arc<Headers>,
}

impl TileData {
    /// Creates tile data with no headers.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            headers: Arc::new(Headers::new()),
        }
    }

    /// Creates tile data with the given headers.
    pub fn with_headers(data: impl Into<Bytes>, headers: Headers) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        Self {
            data: data.into(),
            headers: Arc::new(headers),
        }
    }

    /// Returns a copy with one more header set.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.headers).insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// The payload bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// All headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Looks up a single header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The `content-type` header, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A tile key with its payload; the item that flows through read streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub key: TileKey,
    pub data: TileData,
}

impl Tile {
    pub fn new(key: TileKey, data: TileData) -> Self {
        Self { key, data }
    }
}

/// Errors raised by tile backends.
///
/// Cloneable so that a single origin failure can be handed to every request
/// coalesced onto the same fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend has no tile at this key
    #[error("Tile {0} not found")]
    NotFound(TileKey),

    /// HTTP transport or status failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Filesystem failure
    #[error("I/O error at {path}: {message}")]
    Io { path: String, message: String },

    /// A backend URI could not be interpreted
    #[error("Invalid backend URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// No driver is registered for the URI scheme
    #[error("Unsupported backend scheme '{0}'")]
    UnsupportedScheme(String),

    /// Write attempted against a read-only backend
    #[error("Backend {0} is read-only")]
    ReadOnly(String),

    /// The request that owned an in-flight fetch went away before settling it
    #[error("Fetch for {0} was abandoned before it completed")]
    Abandoned(String),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Builds an [`BackendError::Io`] from a path and an I/O error.
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    /// Returns true if the error means "no such tile" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Behaviour shared by every backend.
pub trait TileBackend: Send + Sync + 'static {
    /// Stable identity of the backend, e.g. the URI it was opened from.
    ///
    /// Used to scope lock keys and cache namespaces, so two backends with
    /// the same identity must serve the same tiles.
    fn identity(&self) -> &str;
}

/// A backend tiles can be read from.
pub trait TileSource: TileBackend {
    /// Fetches one tile.
    fn get_tile(
        &self,
        key: TileKey,
    ) -> impl Future<Output = Result<TileData, BackendError>> + Send;

    /// True if calls to [`get_tile`](Self::get_tile) are already admitted
    /// through a rate limiter.
    fn is_rate_limited(&self) -> bool {
        false
    }
}

/// A backend tiles can be written to.
pub trait TileSink: TileBackend {
    /// Stores one tile, replacing any existing tile at the same key.
    fn put_tile(&self, tile: Tile) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Flushes and finalizes the sink after the last tile.
    fn finish(&self) -> impl Future<Output = Result<(), BackendError>> + Send {
        async { Ok(()) }
    }
}

impl<T: TileBackend + ?Sized> TileBackend for Arc<T> {
    fn identity(&self) -> &str {
        (**self).identity()
    }
}

impl<T: TileSource> TileSource for Arc<T> {
    fn get_tile(
        &self,
        key: TileKey,
    ) -> impl Future<Output = Result<TileData, BackendError>> + Send {
        (**self).get_tile(key)
    }

    fn is_rate_limited(&self) -> bool {
        (**self).is_rate_limited()
    }
}

impl<T: TileSink> TileSink for Arc<T> {
    fn put_tile(&self, tile: Tile) -> impl Future<Output = Result<(), BackendError>> + Send {
        (**self).put_tile(tile)
    }

    fn finish(&self) -> impl Future<Output = Result<(), BackendError>> + Send {
        (**self).finish()
    }
}
