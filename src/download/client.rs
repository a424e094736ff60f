//! HTTP client wrapper shared by every transfer.
//!
//! [`HttpClient`] owns a pooled `reqwest::Client`. Cloning it is cheap and all
//! clones share the same connection pool, so a single instance can serve any
//! number of concurrent transfers for the lifetime of the process.

use std::time::Duration;

use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Response};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, TRANSFER_TIMEOUT_SECS};
use super::error::DownloadError;

/// HTTP client for streaming media downloads.
///
/// The client enforces one long overall timeout instead of per-read timeouts,
/// so multi-gigabyte files are not cut off while they are still flowing.
///
/// # Example
///
/// ```no_run
/// use reelfetch::download::HttpClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let size = client.head_content_length("https://example.com/movie.mp4").await?;
/// println!("declared size: {size:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with the default timeouts (30 s connect, 2 h overall).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::try_with_timeouts(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(TRANSFER_TIMEOUT_SECS),
        )
        .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a client with explicit connect and overall timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidOptions`] if reqwest cannot build the
    /// client (for example when the TLS backend fails to initialize).
    pub fn try_with_timeouts(
        connect_timeout: Duration,
        overall_timeout: Duration,
    ) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(overall_timeout)
            .user_agent(default_user_agent())
            .build()
            .map_err(|e| DownloadError::invalid_options(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Sends a GET request and returns the response with its body unread.
    ///
    /// Only the status line and headers have been received when this returns;
    /// the body is consumed later as a stream.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::InvalidUrl`] if `url` is not an absolute http(s) URL
    /// - [`DownloadError::Network`] / [`DownloadError::Timeout`] on transport failure
    /// - [`DownloadError::HttpStatus`] for any non-success status
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str) -> Result<Response, DownloadError> {
        let parsed = parse_http_url(url)?;
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;
        ensure_success(url, response)
    }

    /// Issues a HEAD request and returns the declared `Content-Length`.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`get`](Self::get).
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn head_content_length(&self, url: &str) -> Result<Option<u64>, DownloadError> {
        let parsed = parse_http_url(url)?;
        let response = self
            .client
            .head(parsed)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;
        let response = ensure_success(url, response)?;
        Ok(declared_content_length(&response))
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Reads `Content-Length` from the headers.
///
/// The header is read directly: `Response::content_length` reports the body
/// size hint, which is 0 for HEAD responses.
pub(crate) fn declared_content_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

fn parse_http_url(url: &str) -> Result<Url, DownloadError> {
    let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DownloadError::invalid_url(url));
    }
    Ok(parsed)
}

fn ensure_success(url: &str, response: Response) -> Result<Response, DownloadError> {
    let status = response.status();
    if !status.is_success() {
        debug!(status = status.as_u16(), "server returned error status");
        return Err(DownloadError::http_status(url, status.as_u16()));
    }
    Ok(response)
}

fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("reelfetch/{version}")
}
