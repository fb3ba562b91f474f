use super::{LogSource, decode_line, split_lines};
use crate::error::Result;
use std::sync::Arc;
use url::Url;

/// Retrieves a byte range or a whole body as lines
///
/// Range fetches return raw line segments: the last one may be a fragment
/// cut by the window boundary, possibly mid-character, and callers own the
/// reassembly and decoding. A whole body is decoded line by line.
#[derive(Clone)]
pub struct ChunkFetcher {
    source: Arc<dyn LogSource>,
}

impl ChunkFetcher {
    /// Create a fetcher over an HTTP capability
    pub fn new(source: Arc<dyn LogSource>) -> Self {
        Self { source }
    }

    /// Fetch bytes `from..=to` of `url` split into undecoded line segments
    pub async fn fetch_range(&self, url: &Url, from: u64, to: u64) -> Result<Vec<Vec<u8>>> {
        let bytes = self.source.fetch_range(url, from, to).await?;
        tracing::trace!(%url, from, to, bytes = bytes.len(), "fetched range");
        Ok(split_lines(&bytes))
    }

    /// Fetch the whole body of `url` split into decoded lines
    pub async fn fetch_all(&self, url: &Url) -> Result<Vec<String>> {
        let bytes = self.source.fetch_all(url).await?;
        tracing::debug!(%url, bytes = bytes.len(), "fetched full body");
        Ok(split_lines(&bytes).iter().map(|line| decode_line(line)).collect())
    }
}
