//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::time::Duration;

use super::LogImporter;

/// How long shutdown waits for in-flight imports
pub(crate) const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl LogImporter {
    /// Gracefully shut down the importer
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new imports
    /// 2. Waits for in-flight imports to complete with a timeout (30 seconds)
    /// 3. Emits [`Event::Shutdown`]
    ///
    /// Imports are never cancelled mid-run. One still running after the timeout
    /// keeps its run `Started` at whatever percent it last reached.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_with_timeout(SHUTDOWN_TIMEOUT).await
    }

    pub(crate) async fn shutdown_with_timeout(&self, timeout: Duration) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.tasks
            .accepting_new
            .store(false, std::sync::atomic::Ordering::SeqCst);
        tracing::info!("Stopped accepting new imports");

        self.tasks.tracker.close();
        let active = self.active_imports();
        if active > 0 {
            tracing::info!(active, "Waiting for in-flight imports");
        }

        match tokio::time::timeout(timeout, self.tasks.tracker.wait()).await {
            Ok(()) => tracing::info!("All in-flight imports completed"),
            Err(_) => tracing::warn!(
                still_running = self.active_imports(),
                "Timeout waiting for imports to complete, proceeding with shutdown"
            ),
        }

        match self.db.has_unfinished_runs().await {
            Ok(true) => tracing::warn!("Some import runs remain unfinished"),
            Ok(false) => {}
            Err(e) => tracing::error!(error = %e, "Failed to inspect import runs during shutdown"),
        }

        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }
}
