//! # access-log-import
//!
//! Range-aware importer for Apache combined access logs served over HTTP.
//!
//! ## How an import runs
//!
//! 1. The source URL is probed with a `HEAD` request. A server advertising
//!    `Accept-Ranges` with a known length is read in 100 byte windows, anything
//!    else in one full `GET`.
//! 2. Lines cut by a window boundary are carried into the next window and
//!    reassembled before validation.
//! 3. Every line is validated field by field. Rejected lines are logged and
//!    skipped; valid records are persisted window by window.
//! 4. Progress is tracked as an import run whose percent climbs from 1 to 100.
//!
//! ## Quick Start
//!
//! ```no_run
//! use access_log_import::{Config, LogImporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let importer = LogImporter::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = importer.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = importer
//!         .import("http://www.almhuette-raith.at/apache-log/access.log")
//!         .await?;
//!     println!("{} records imported", summary.accepted);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Import pipeline: window planning and the coordinator state machine
pub mod import;
/// Importer service: trigger surface, background dispatch, shutdown
pub mod importer;
/// Retry logic with exponential backoff
pub mod retry;
/// Record and progress sink capabilities
pub mod sink;
/// Log sources: range probing and fetching
pub mod source;
/// Core types and events
pub mod types;
/// Access-log line validation
pub mod validate;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, ImportConfig, RetryConfig};
pub use db::Database;
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, Result, ToHttpStatus};
pub use import::{ChunkPlan, ChunkWindow, ImportCoordinator};
pub use importer::LogImporter;
pub use sink::{LogSink, ProgressSink};
pub use source::{ChunkFetcher, HttpLogSource, LogSource, ProbeResult, RangeProbe};
pub use types::{
    Event, FetchStrategy, ImportRun, ImportSummary, PaginatedLogs, Pagination, RunId, RunStatus,
    StoredLog,
};
pub use validate::{HttpMethod, LogRecord, Rejection, validate_line};

/// Helper function to run the importer with graceful signal handling.
///
/// Waits for a termination signal and then calls the importer's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use access_log_import::{Config, LogImporter, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let importer = Arc::new(LogImporter::new(Config::default()).await?);
///     let _api = importer.spawn_api_server();
///
///     // Run with automatic signal handling
///     run_with_shutdown(&importer).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(importer: &LogImporter) -> Result<()> {
    wait_for_signal().await;
    importer.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
