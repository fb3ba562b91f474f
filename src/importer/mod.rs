//! Importer service split into focused submodules.
//!
//! The `LogImporter` struct and its methods are organized by domain:
//! - [`trigger`] - URL validation and import dispatch (foreground and background)
//! - [`lifecycle`] - Shutdown coordination

mod lifecycle;
mod trigger;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::import::ImportCoordinator;
use crate::source::{HttpLogSource, LogSource};
use crate::types::Event;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio_util::task::TaskTracker;

/// Capacity of the event broadcast channel
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Background import bookkeeping
#[derive(Clone)]
pub(crate) struct ImportTasks {
    /// Tracks spawned imports so shutdown can wait for them
    pub(crate) tracker: TaskTracker,
    /// Flag to indicate whether new imports are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl ImportTasks {
    pub(crate) fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
            accepting_new: Arc::new(AtomicBool::new(true)),
        }
    }
}

/// Main importer instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct LogImporter {
    /// Database instance for persistence (wrapped in Arc for sharing across tasks)
    /// Public for integration tests to query runs and records
    pub db: Arc<Database>,
    /// Where log bodies come from
    pub(crate) source: Arc<dyn LogSource>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Background import bookkeeping
    pub(crate) tasks: ImportTasks,
}

impl LogImporter {
    /// Create a new LogImporter instance
    ///
    /// This initializes all core components:
    /// - Validates the configuration
    /// - Opens/creates the SQLite database and runs migrations
    /// - Builds the HTTP log source from the import configuration
    /// - Sets up the event broadcast channel
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Database::new(&config.persistence.database_path)
            .await?
            .with_batch_insert_size(config.import.batch_insert_size);

        let source: Arc<dyn LogSource> = Arc::new(HttpLogSource::new(&config.import)?);

        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::info!(
            database = %config.persistence.database_path.display(),
            retry_attempts = config.import.retry.max_attempts,
            "Log importer initialized"
        );

        Ok(Self {
            db: Arc::new(db),
            source,
            event_tx,
            config: Arc::new(config),
            tasks: ImportTasks::new(),
        })
    }

    /// Replace the log source
    ///
    /// Used to point the importer at a non-HTTP source or a preconfigured client.
    pub fn with_source(mut self, source: Arc<dyn LogSource>) -> Self {
        self.source = source;
        self
    }

    /// Subscribe to import events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// If a subscriber falls behind by more than 1000 events it will receive a
    /// `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use access_log_import::{Config, LogImporter};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let importer = LogImporter::new(Config::default()).await?;
    ///
    ///     let mut events = importer.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "import event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Number of background imports still running
    pub fn active_imports(&self) -> usize {
        self.tasks.tracker.len()
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Coordinator wired to this importer's source, database and event channel
    pub(crate) fn coordinator(&self) -> ImportCoordinator {
        ImportCoordinator::new(self.source.clone(), self.db.clone(), self.db.clone())
            .with_events(self.event_tx.clone())
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server runs concurrently with imports and listens on the configured
    /// bind address (default: 127.0.0.1:8080).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let importer = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(importer, config).await })
    }
}
