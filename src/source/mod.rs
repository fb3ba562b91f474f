//! Log source access over HTTP
//!
//! [`LogSource`] is the HTTP capability the import pipeline consumes: a
//! metadata probe, an inclusive byte-range fetch and a whole-body fetch.
//! [`HttpLogSource`] implements it with reqwest; tests substitute recording
//! fakes or a wiremock server.
//!
//! [`RangeProbe`] and [`ChunkFetcher`] sit on top of the capability and
//! produce what the coordinator works with: a probe verdict and lines.
//!
//! Bodies stay raw bytes until a line is complete. A window boundary may cut
//! a multi-byte character, so decoding happens per line after reassembly.

use crate::config::{ImportConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::with_retry;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, HeaderMap, RANGE};
use url::Url;

mod fetch;
mod probe;

pub use fetch::ChunkFetcher;
pub use probe::RangeProbe;

/// What a metadata request revealed about a source
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProbeResult {
    /// Server advertised byte-range support
    pub supports_ranges: bool,
    /// Body length in bytes; 0 when ranges are unsupported
    pub total_length: u64,
}

/// HTTP capability used by the import pipeline
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Issue a metadata-only request and report range support and length
    async fn probe(&self, url: &Url) -> Result<ProbeResult>;

    /// Retrieve bytes `from..=to` undecoded
    async fn fetch_range(&self, url: &Url, from: u64, to: u64) -> Result<Vec<u8>>;

    /// Retrieve the entire body undecoded
    async fn fetch_all(&self, url: &Url) -> Result<Vec<u8>>;
}

/// Split raw bytes on `\n`, keeping the trailing element
///
/// Bytes that end mid-line yield their fragment as the last element; bytes
/// ending in a newline yield an empty last element.
pub fn split_lines(bytes: &[u8]) -> Vec<Vec<u8>> {
    bytes.split(|b| *b == b'\n').map(<[u8]>::to_vec).collect()
}

/// Decode one complete line, replacing invalid UTF-8 with U+FFFD
pub fn decode_line(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

/// reqwest-backed [`LogSource`]
///
/// Every request goes through [`with_retry`] with the configured policy.
#[derive(Clone, Debug)]
pub struct HttpLogSource {
    client: reqwest::Client,
    retry: RetryConfig,
}

impl HttpLogSource {
    /// Build a client from the import configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &ImportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Other(format!("failed to create HTTP client: {e}")))?;

        Ok(Self::with_client(client, config.retry.clone()))
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    async fn head_once(&self, url: &Url) -> Result<ProbeResult> {
        let response = self.client.head(url.clone()).send().await?;
        ensure_success(url, response.status())?;
        Ok(probe_from_headers(response.headers()))
    }

    async fn range_once(&self, url: &Url, from: u64, to: u64) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url.clone())
            .header(RANGE, format!("bytes={from}-{to}"))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::PARTIAL_CONTENT {
            ensure_success(url, status)?;
            // 2xx but not 206: the server sent something other than our range
            return Err(Error::RangeNotSatisfied {
                url: url.to_string(),
                from,
                to,
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn get_once(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.client.get(url.clone()).send().await?;
        ensure_success(url, response.status())?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl LogSource for HttpLogSource {
    async fn probe(&self, url: &Url) -> Result<ProbeResult> {
        with_retry(&self.retry, || self.head_once(url)).await
    }

    async fn fetch_range(&self, url: &Url, from: u64, to: u64) -> Result<Vec<u8>> {
        with_retry(&self.retry, || self.range_once(url, from, to)).await
    }

    async fn fetch_all(&self, url: &Url) -> Result<Vec<u8>> {
        with_retry(&self.retry, || self.get_once(url)).await
    }
}

fn ensure_success(url: &Url, status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Range support is any `Accept-Ranges` value other than `none`
fn probe_from_headers(headers: &HeaderMap) -> ProbeResult {
    let supports_ranges = headers
        .get(ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| !v.trim().eq_ignore_ascii_case("none"));

    if !supports_ranges {
        return ProbeResult::default();
    }

    let total_length = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);

    ProbeResult {
        supports_ranges,
        total_length,
    }
}
