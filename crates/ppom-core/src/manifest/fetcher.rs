use async_trait::async_trait;
use reqwest::{header, Client, ClientBuilder, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Transport-level failure; HTTP error statuses are reported through
/// [`FetchResponse::status`] instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("client error: {0}")]
    Client(String),
}

/// Response of a [`Fetcher`] request.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status: u16,
    /// Revalidation token from the `ETag` header, if any.
    pub etag: Option<String>,
    /// Empty for `HEAD` requests.
    pub body: Vec<u8>,
}

impl FetchResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound HTTP transport with a fixed timeout.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issues a `HEAD` request with the given extra headers.
    async fn head(&self, url: &str, headers: &[(&str, &str)]) -> Result<FetchResponse, FetchError>;

    /// Issues a `GET` request and buffers the body.
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// Configuration for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// Total request timeout. Timed-out requests are not retried.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            user_agent: concat!("ppom-core/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// reqwest-backed [`Fetcher`].
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the default 10 second timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(HttpFetcherConfig::default())
    }

    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn with_config(config: HttpFetcherConfig) -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .use_rustls_tls()
            .user_agent(config.user_agent)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                FetchError::Client(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self { client })
    }

    /// Maps a reqwest error to a message that does not leak the URL.
    fn sanitize_network_error(error: &reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout
        } else if error.is_connect() {
            FetchError::ConnectionFailed("connection refused or unreachable".to_string())
        } else if error.is_body() {
            FetchError::ConnectionFailed("response body error".to_string())
        } else if error.is_redirect() {
            FetchError::ConnectionFailed("too many redirects".to_string())
        } else if error.is_request() {
            FetchError::ConnectionFailed("request failed".to_string())
        } else {
            FetchError::ConnectionFailed("network error".to_string())
        }
    }

    fn etag(headers: &header::HeaderMap) -> Option<String> {
        headers.get(header::ETAG).and_then(|value| value.to_str().ok()).map(str::to_string)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn head(&self, url: &str, headers: &[(&str, &str)]) -> Result<FetchResponse, FetchError> {
        let mut request = self.client.head(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| Self::sanitize_network_error(&e))?;
        let status = response.status();
        tracing::trace!(status = status.as_u16(), "head request completed");

        Ok(FetchResponse {
            status: status.as_u16(),
            etag: Self::etag(response.headers()),
            body: Vec::new(),
        })
    }

    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let response =
            self.client.get(url).send().await.map_err(|e| Self::sanitize_network_error(&e))?;
        let status: StatusCode = response.status();
        let etag = Self::etag(response.headers());

        if !status.is_success() {
            tracing::trace!(status = status.as_u16(), "get request failed");
            return Ok(FetchResponse { status: status.as_u16(), etag, body: Vec::new() });
        }

        let body = response.bytes().await.map_err(|e| Self::sanitize_network_error(&e))?;
        Ok(FetchResponse { status: status.as_u16(), etag, body: body.to_vec() })
    }
}
