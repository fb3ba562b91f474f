//! Shared test helpers for creating LogImporter instances in tests.

use crate::config::Config;
use crate::db::Database;
use crate::importer::{EVENT_CHANNEL_CAPACITY, ImportTasks, LogImporter};
use crate::source::{HttpLogSource, LogSource};
use std::sync::Arc;
use tempfile::tempdir;

/// Helper to create a test LogImporter backed by a throwaway database.
/// Returns the importer and the tempdir (which must be kept alive).
pub(crate) async fn create_test_importer() -> (LogImporter, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.persistence.database_path = temp_dir.path().join("test.db");

    let db = Database::new(&config.persistence.database_path)
        .await
        .unwrap();
    let source: Arc<dyn LogSource> = Arc::new(HttpLogSource::new(&config.import).unwrap());
    let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);

    let importer = LogImporter {
        db: Arc::new(db),
        source,
        event_tx,
        config: Arc::new(config),
        tasks: ImportTasks::new(),
    };

    (importer, temp_dir)
}

/// Same as [`create_test_importer`] with an in-memory source swapped in
pub(crate) async fn create_test_importer_with(
    source: Arc<dyn LogSource>,
) -> (LogImporter, tempfile::TempDir) {
    let (importer, temp_dir) = create_test_importer().await;
    (importer.with_source(source), temp_dir)
}
