//! HTTP client abstraction for testability

use super::types::{BackendError, Headers};
use bytes::Bytes;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Default User-Agent string for tile requests.
pub const DEFAULT_USER_AGENT: &str = concat!("tilecopy/", env!("CARGO_PKG_VERSION"));

/// Settings for the HTTP tile driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Whole-request timeout
    pub timeout: Duration,
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub retry_base_delay: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(250),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Response headers with lowercase names
    pub headers: Headers,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for asynchronous HTTP client operations.
///
/// Implementations return `Ok` for any response that arrived, including
/// error statuses, and `Err` only for transport failures (connect, timeout,
/// body read).
pub trait AsyncHttpClient: Send + Sync + 'static {
    /// Performs an async HTTP GET request.
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, BackendError>> + Send;
}

/// Async HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a client from the driver settings.
    ///
    /// Keeps a large idle pool and TCP keepalive so consecutive tile requests
    /// reuse warm connections.
    pub fn new(config: &HttpConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(64)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| BackendError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, BackendError> {
        trace!(url = url, "HTTP GET request starting");

        let response = match self.client.get(url).send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(BackendError::Http(format!("Request failed: {}", e)));
            }
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        match response.bytes().await {
            Ok(body) => {
                trace!(url = url, bytes = body.len(), "HTTP response body read");
                Ok(HttpResponse {
                    status,
                    headers,
                    body,
                })
            }
            Err(e) => {
                warn!(url = url, error = %e, "Failed to read response body");
                Err(BackendError::Http(format!(
                    "Failed to read response: {}",
                    e
                )))
            }
        }
    }
}
