use super::{LogSource, ProbeResult};
use crate::error::Result;
use std::sync::Arc;
use url::Url;

/// Decides whether a source can be streamed in byte-range windows
#[derive(Clone)]
pub struct RangeProbe {
    source: Arc<dyn LogSource>,
}

impl RangeProbe {
    /// Create a probe over an HTTP capability
    pub fn new(source: Arc<dyn LogSource>) -> Self {
        Self { source }
    }

    /// Report range support and total length for `url`
    ///
    /// A source that advertises ranges but no usable length is reported as
    /// not range-capable, since there is nothing to divide into windows.
    pub async fn probe(&self, url: &Url) -> Result<ProbeResult> {
        let result = self.source.probe(url).await?;

        if result.supports_ranges && result.total_length == 0 {
            tracing::debug!(%url, "source advertises ranges without a length, using full fetch");
            return Ok(ProbeResult::default());
        }

        tracing::debug!(
            %url,
            supports_ranges = result.supports_ranges,
            total_length = result.total_length,
            "probed log source"
        );
        Ok(result)
    }
}
