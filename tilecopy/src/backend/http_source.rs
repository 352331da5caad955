//! Templated HTTP tile server source (`http://` and `https://` backends)

use super::http::{AsyncHttpClient, HttpConfig, HttpResponse};
use super::types::{BackendError, Headers, TileBackend, TileData, TileSource};
use crate::coord::TileKey;
use std::time::Duration;
use tracing::{debug, warn};

/// Response headers kept alongside the payload.
const FORWARDED_HEADERS: &[&str] = &[
    "content-type",
    "content-encoding",
    "etag",
    "last-modified",
    "cache-control",
    "expires",
];

/// Tile source backed by a URL template such as
/// `https://tiles.example.com/{z}/{x}/{y}.png`.
///
/// `404` and `204` responses mean the tile does not exist. Transport errors,
/// `429` and `5xx` responses are retried with exponential backoff up to
/// `max_retries` times; any other status fails immediately.
pub struct HttpTileSource<C: AsyncHttpClient> {
    client: C,
    template: String,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl<C: AsyncHttpClient> HttpTileSource<C> {
    /// Creates a source from a URL template.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidUri` if the template lacks any of the
    /// `{z}`, `{x}` or `{y}` placeholders.
    pub fn new(client: C, template: &str, config: &HttpConfig) -> Result<Self, BackendError> {
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !template.contains(placeholder) {
                return Err(BackendError::InvalidUri {
                    uri: template.to_string(),
                    reason: format!("missing {} placeholder", placeholder),
                });
            }
        }

        Ok(Self {
            client,
            template: template.to_string(),
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
        })
    }

    /// Expands the URL template for `key`.
    pub fn tile_url(&self, key: &TileKey) -> String {
        self.template
            .replace("{z}", &key.zoom.to_string())
            .replace("{x}", &key.x.to_string())
            .replace("{y}", &key.y.to_string())
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Outcome of a single attempt, before retry policy is applied.
enum Attempt {
    Done(Result<TileData, BackendError>),
    Retry(BackendError),
}

fn classify(key: TileKey, url: &str, result: Result<HttpResponse, BackendError>) -> Attempt {
    let response = match result {
        Ok(response) => response,
        Err(e) => return Attempt::Retry(e),
    };

    match response.status {
        404 | 204 => Attempt::Done(Err(BackendError::NotFound(key))),
        status if (200..300).contains(&status) => {
            let headers: Headers = response
                .headers
                .into_iter()
                .filter(|(name, _)| FORWARDED_HEADERS.contains(&name.as_str()))
                .collect();
            Attempt::Done(Ok(TileData::with_headers(response.body, headers)))
        }
        status @ (429 | 500..=599) => {
            Attempt::Retry(BackendError::Http(format!("HTTP {} from {}", status, url)))
        }
        status => Attempt::Done(Err(BackendError::Http(format!(
            "HTTP {} from {}",
            status, url
        )))),
    }
}

impl<C: AsyncHttpClient> TileBackend for HttpTileSource<C> {
    fn identity(&self) -> &str {
        &self.template
    }
}

impl<C: AsyncHttpClient> TileSource for HttpTileSource<C> {
    async fn get_tile(&self, key: TileKey) -> Result<TileData, BackendError> {
        let url = self.tile_url(&key);
        let mut attempt = 0;

        loop {
            let error = match classify(key, &url, self.client.get(&url).await) {
                Attempt::Done(result) => return result,
                Attempt::Retry(error) => error,
            };

            if attempt >= self.max_retries {
                warn!(tile = %key, url = %url, attempts = attempt + 1, error = %error, "Giving up on tile");
                return Err(error);
            }

            let delay = self.backoff(attempt);
            debug!(
                tile = %key,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying tile request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::http::tests::{response, MockAsyncHttpClient};

    const TEMPLATE: &str = "https://tiles.example.com/{z}/{x}/{y}.png";

    fn config(max_retries: u32) -> HttpConfig {
        HttpConfig {
            max_retries,
            retry_base_delay: Duration::from_millis(100),
            ..HttpConfig::default()
        }
    }

    fn key() -> TileKey {
        TileKey { zoom: 7, x: 20, y: 46 }
    }

    #[test]
    fn test_template_requires_placeholders() {
        let mock = MockAsyncHttpClient::always(Ok(response(200, b"")));
        let result = HttpTileSource::new(mock, "https://example.com/{z}/{x}.png", &config(0));
        assert!(matches!(result, Err(BackendError::InvalidUri { .. })));
    }

    #[test]
    fn test_tile_url() {
        let mock = MockAsyncHttpClient::always(Ok(response(200, b"")));
        let source = HttpTileSource::new(mock, TEMPLATE, &config(0)).unwrap();
        assert_eq!(
            source.tile_url(&key()),
            "https://tiles.example.com/7/20/46.png"
        );
        assert_eq!(source.identity(), TEMPLATE);
    }

    #[tokio::test]
    async fn test_success_keeps_selected_headers() {
        let mut ok = response(200, b"X");
        ok.headers.insert("content-type".into(), "image/png".into());
        ok.headers.insert("set-cookie".into(), "secret".into());

        let source =
            HttpTileSource::new(MockAsyncHttpClient::always(Ok(ok)), TEMPLATE, &config(0))
                .unwrap();
        let data = source.get_tile(key()).await.unwrap();

        assert_eq!(data.data().as_ref(), b"X");
        assert_eq!(data.content_type(), Some("image/png"));
        assert_eq!(data.header("set-cookie"), None);
    }

    #[tokio::test]
    async fn test_404_is_not_found_without_retry() {
        let source = HttpTileSource::new(
            MockAsyncHttpClient::always(Ok(response(404, b""))),
            TEMPLATE,
            &config(3),
        )
        .unwrap();

        assert_eq!(
            source.get_tile(key()).await,
            Err(BackendError::NotFound(key()))
        );
        assert_eq!(source.client.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_errors_with_backoff() {
        let mock = MockAsyncHttpClient::sequence(
            vec![
                Ok(response(503, b"")),
                Err(BackendError::Http("connection reset".into())),
            ],
            Ok(response(200, b"X")),
        );
        let source = HttpTileSource::new(mock, TEMPLATE, &config(3)).unwrap();

        let start = tokio::time::Instant::now();
        let data = source.get_tile(key()).await.unwrap();

        assert_eq!(data.data().as_ref(), b"X");
        assert_eq!(source.client.call_count(), 3);
        // 100ms + 200ms of backoff
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let source = HttpTileSource::new(
            MockAsyncHttpClient::always(Ok(response(500, b""))),
            TEMPLATE,
            &config(2),
        )
        .unwrap();

        let result = source.get_tile(key()).await;
        assert!(matches!(result, Err(BackendError::Http(_))));
        assert_eq!(source.client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_client_error_fails_immediately() {
        let source = HttpTileSource::new(
            MockAsyncHttpClient::always(Ok(response(403, b""))),
            TEMPLATE,
            &config(3),
        )
        .unwrap();

        let result = source.get_tile(key()).await;
        assert_eq!(
            result,
            Err(BackendError::Http(
                "HTTP 403 from https://tiles.example.com/7/20/46.png".into()
            ))
        );
        assert_eq!(source.client.call_count(), 1);
    }
}
