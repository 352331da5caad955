//! Lazy tile read streams over any [`TileSource`].

use super::types::{BackendError, Tile, TileSource};
use crate::coord::ReadOptions;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

/// Default number of tile fetches kept in flight ahead of the consumer.
pub const DEFAULT_READ_CONCURRENCY: usize = 16;

/// Opens a finite stream of every tile in the extent described by `options`.
///
/// Keys are fetched through `source` with up to `concurrency` requests in
/// flight, and tiles come out in extent order (zoom, then x, then y)
/// regardless of completion order. The first error is yielded and ends the
/// stream; requests still in flight behind it are dropped.
pub fn read_stream<S: TileSource>(
    source: Arc<S>,
    options: &ReadOptions,
    concurrency: usize,
) -> BoxStream<'static, Result<Tile, BackendError>> {
    let keys = options.keys();

    stream::iter(keys)
        .map(move |key| {
            let source = Arc::clone(&source);
            async move {
                let data = source.get_tile(key).await?;
                Ok(Tile::new(key, data))
            }
        })
        .buffered(concurrency.max(1))
        .scan(false, |failed, item: Result<Tile, BackendError>| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        })
        .boxed()
}
