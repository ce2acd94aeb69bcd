use crate::feed::parser::{parse_feed, FeedItem};
use crate::util::{validate_url, HostPolicy, UrlValidationError};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Most-recent items taken from a single feed per run.
pub const DEFAULT_MAX_ITEMS: usize = 10;
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while retrieving one feed.
///
/// Every variant is scoped to a single URL; the pipeline logs it and moves
/// on to the next feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The configured URL was rejected before any request was made
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Feed XML could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Retrieves a feed URL and turns it into pipeline items.
///
/// Implementations make exactly one attempt per call. Timeouts and retries,
/// if any, belong to the transport underneath.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>, FetchError>;
}

/// Tunables for [`HttpFeedFetcher`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub max_items: usize,
    pub timeout: Duration,
    pub host_policy: HostPolicy,
    pub max_body_bytes: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            timeout: DEFAULT_TIMEOUT,
            host_policy: HostPolicy::PublicOnly,
            max_body_bytes: MAX_FEED_SIZE,
        }
    }
}

/// [`FeedFetcher`] backed by `reqwest` and `feed-rs`.
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: reqwest::Client,
    options: FetchOptions,
}

impl HttpFeedFetcher {
    pub fn new(client: reqwest::Client, options: FetchOptions) -> Self {
        Self { client, options }
    }

    async fn download(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url.as_str()).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, self.options.max_body_bytes).await
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    /// Fetches `url` once and returns up to `max_items` items in feed order.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] - blank, non-HTTP, or disallowed host
    /// - [`FetchError::Timeout`] / [`FetchError::Network`] - transport failure
    /// - [`FetchError::HttpStatus`] - any non-2xx response (no retry)
    /// - [`FetchError::ResponseTooLarge`] / [`FetchError::IncompleteResponse`]
    /// - [`FetchError::Parse`] - body is not RSS or Atom
    async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>, FetchError> {
        let url = validate_url(url, self.options.host_policy)?;

        // One deadline covers both the response headers and the body
        let bytes = tokio::time::timeout(self.options.timeout, self.download(&url))
            .await
            .map_err(|_| FetchError::Timeout)??;

        let items = parse_feed(&bytes, self.options.max_items)
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        tracing::debug!(feed = %url, items = items.len(), "Fetched feed");
        Ok(items)
    }
}

/// Reads a response body up to `limit` bytes.
///
/// Shared with the media download path of the REST repository.
pub(crate) async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
