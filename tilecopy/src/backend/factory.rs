//! Backend factory for centralized URI resolution.
//!
//! Turns backend URIs into opened drivers. Drivers are wrapped in the
//! [`SourceBackend`] and [`SinkBackend`] enums so callers can hold any of
//! them behind one concrete type.

use super::file::{FileTileStore, DEFAULT_FILETYPE};
use super::http::{AsyncReqwestClient, HttpConfig};
use super::http_source::HttpTileSource;
use super::memory::MemoryTileStore;
use super::types::{BackendError, Tile, TileBackend, TileData, TileSink, TileSource};
use crate::coord::TileKey;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// A backend URI split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUri {
    /// Lowercased scheme
    pub scheme: String,
    /// Everything between `://` and `?`
    pub location: String,
    /// Query parameters in order of appearance
    pub query: Vec<(String, String)>,
}

impl ParsedUri {
    /// First value of query parameter `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Splits `scheme://location?query`.
///
/// Placeholders such as `{z}` are left untouched, so this deliberately does
/// not percent-decode or normalize anything.
pub fn parse_uri(uri: &str) -> Result<ParsedUri, BackendError> {
    let invalid = |reason: &str| BackendError::InvalidUri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };

    let (scheme, rest) = uri
        .trim()
        .split_once("://")
        .ok_or_else(|| invalid("expected scheme://location"))?;

    if scheme.is_empty()
        || !scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        return Err(invalid("malformed scheme"));
    }

    let (location, query) = match rest.split_once('?') {
        Some((location, query)) => (location, query),
        None => (rest, ""),
    };

    if location.is_empty() {
        return Err(invalid("empty location"));
    }

    let query = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect();

    Ok(ParsedUri {
        scheme: scheme.to_ascii_lowercase(),
        location: location.to_string(),
        query,
    })
}

/// Any backend that can be read from.
pub enum SourceBackend {
    Http(HttpTileSource<AsyncReqwestClient>),
    File(FileTileStore),
    Memory(Arc<MemoryTileStore>),
}

impl TileBackend for SourceBackend {
    fn identity(&self) -> &str {
        match self {
            Self::Http(s) => s.identity(),
            Self::File(s) => s.identity(),
            Self::Memory(s) => s.identity(),
        }
    }
}

impl TileSource for SourceBackend {
    async fn get_tile(&self, key: TileKey) -> Result<TileData, BackendError> {
        match self {
            Self::Http(s) => s.get_tile(key).await,
            Self::File(s) => s.get_tile(key).await,
            Self::Memory(s) => s.get_tile(key).await,
        }
    }
}

/// Any backend that can be written to.
pub enum SinkBackend {
    File(FileTileStore),
    Memory(Arc<MemoryTileStore>),
}

impl TileBackend for SinkBackend {
    fn identity(&self) -> &str {
        match self {
            Self::File(s) => s.identity(),
            Self::Memory(s) => s.identity(),
        }
    }
}

impl TileSink for SinkBackend {
    async fn put_tile(&self, tile: Tile) -> Result<(), BackendError> {
        match self {
            Self::File(s) => s.put_tile(tile).await,
            Self::Memory(s) => s.put_tile(tile).await,
        }
    }

    async fn finish(&self) -> Result<(), BackendError> {
        match self {
            Self::File(s) => s.finish().await,
            Self::Memory(s) => s.finish().await,
        }
    }
}

/// Resolves backend URIs to opened drivers.
///
/// | scheme          | source | sink |
/// |-----------------|--------|------|
/// | `http`, `https` | yes    | no   |
/// | `file`          | yes    | yes  |
/// | `memory`        | yes    | yes  |
///
/// One HTTP client (and its connection pool) is shared by every HTTP source
/// the factory opens. `memory://name` stores are shared by name.
pub struct BackendFactory {
    http_client: AsyncReqwestClient,
    http_config: HttpConfig,
    memory: DashMap<String, Arc<MemoryTileStore>>,
}

impl BackendFactory {
    /// Creates a factory with the given HTTP driver settings.
    pub fn new(http_config: HttpConfig) -> Result<Self, BackendError> {
        let http_client = AsyncReqwestClient::new(&http_config)?;
        Ok(Self {
            http_client,
            http_config,
            memory: DashMap::new(),
        })
    }

    /// The named in-process store, created on first use.
    pub fn memory_store(&self, name: &str) -> Arc<MemoryTileStore> {
        self.memory
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryTileStore::new(name)))
            .clone()
    }

    /// Opens a backend for reading.
    pub fn open_source(&self, uri: &str) -> Result<SourceBackend, BackendError> {
        let parsed = parse_uri(uri)?;
        debug!(uri = uri, scheme = %parsed.scheme, "Opening source backend");

        match parsed.scheme.as_str() {
            "http" | "https" => {
                let source =
                    HttpTileSource::new(self.http_client.clone(), uri.trim(), &self.http_config)?;
                Ok(SourceBackend::Http(source))
            }
            "file" => Ok(SourceBackend::File(file_store(&parsed))),
            "memory" => Ok(SourceBackend::Memory(self.memory_store(&parsed.location))),
            other => Err(BackendError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Opens a backend for writing.
    pub fn open_sink(&self, uri: &str) -> Result<SinkBackend, BackendError> {
        let parsed = parse_uri(uri)?;
        debug!(uri = uri, scheme = %parsed.scheme, "Opening sink backend");

        match parsed.scheme.as_str() {
            "http" | "https" => Err(BackendError::ReadOnly(uri.to_string())),
            "file" => Ok(SinkBackend::File(file_store(&parsed))),
            "memory" => Ok(SinkBackend::Memory(self.memory_store(&parsed.location))),
            other => Err(BackendError::UnsupportedScheme(other.to_string())),
        }
    }
}

fn file_store(parsed: &ParsedUri) -> FileTileStore {
    let filetype = parsed.param("filetype").unwrap_or(DEFAULT_FILETYPE);
    FileTileStore::new(PathBuf::from(&parsed.location), filetype)
}
