//! URL validation and import dispatch.

use crate::error::{Error, Result};
use crate::types::ImportSummary;
use std::sync::atomic::Ordering;
use url::Url;

use super::LogImporter;

impl LogImporter {
    /// Check that `raw` is an absolute http(s) URL with a host
    ///
    /// # Errors
    /// Returns [`Error::InvalidUrl`] for anything else. No run is created for a
    /// rejected URL.
    pub fn validate_url(raw: &str) -> Result<Url> {
        let trimmed = raw.trim();
        let url = Url::parse(trimmed).map_err(|_| Error::InvalidUrl(trimmed.to_string()))?;

        match url.scheme() {
            "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(url),
            _ => Err(Error::InvalidUrl(trimmed.to_string())),
        }
    }

    /// Import the log at `url` in the caller's task
    ///
    /// # Errors
    /// Returns [`Error::InvalidUrl`] before any run exists, [`Error::ShuttingDown`]
    /// once shutdown has begun, or the transport/store error that ended the run.
    pub async fn import(&self, url: &str) -> Result<ImportSummary> {
        let url = Self::validate_url(url)?;
        self.ensure_accepting()?;
        self.coordinator().execute(&url).await
    }

    /// Validate `url` and run its import as a tracked background task
    ///
    /// Returns as soon as the task is spawned. Failures are logged and surface
    /// to subscribers as [`ImportFailed`](crate::types::Event::ImportFailed) events.
    pub fn spawn_import(&self, url: &str) -> Result<Url> {
        let url = Self::validate_url(url)?;
        self.ensure_accepting()?;

        let coordinator = self.coordinator();
        let task_url = url.clone();
        self.tasks.tracker.spawn(async move {
            if let Err(e) = coordinator.execute(&task_url).await {
                tracing::debug!(url = %task_url, error = %e, "Background import ended with error");
            }
        });

        tracing::info!(%url, active = self.active_imports(), "Import dispatched");
        Ok(url)
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self.tasks.accepting_new.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::ShuttingDown)
        }
    }
}
