//! Tile backend capabilities and reference drivers.
//!
//! A backend is anything that can serve tiles by key ([`TileSource`]) or
//! accept them ([`TileSink`]). The copy machinery only talks to these traits;
//! concrete drivers are resolved from URIs by the [`BackendFactory`].

mod factory;
mod file;
pub mod http;
mod http_source;
mod memory;
mod stream;
mod types;

pub use factory::{parse_uri, BackendFactory, ParsedUri, SinkBackend, SourceBackend};
pub use file::{content_type_for, FileTileStore, DEFAULT_FILETYPE};
pub use http::{AsyncHttpClient, AsyncReqwestClient, HttpConfig, HttpResponse};
pub use http_source::HttpTileSource;
pub use memory::MemoryTileStore;
pub use stream::{read_stream, DEFAULT_READ_CONCURRENCY};
pub use types::{BackendError, Headers, Tile, TileBackend, TileData, TileSink, TileSource};

pub(crate) use file::write_atomic;
