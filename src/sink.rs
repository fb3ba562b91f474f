//! Capabilities the import pipeline writes to
//!
//! The SQLite [`Database`](crate::db::Database) implements both traits; the
//! coordinator only ever sees them as trait objects.

use crate::error::Result;
use crate::types::{ImportRun, RunId};
use crate::validate::LogRecord;
use async_trait::async_trait;

/// Destination for validated records
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Persist `records` in the given order
    ///
    /// Must accept an empty slice.
    async fn create_records(&self, records: &[LogRecord]) -> Result<()>;
}

/// Destination for run progress
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Create a run at percent 1, status started
    async fn create_run(&self) -> Result<ImportRun>;

    /// Set the percent of a run
    async fn update_run(&self, id: RunId, percent: u8) -> Result<ImportRun>;

    /// Mark a run finished at percent 100
    async fn finish_run(&self, id: RunId) -> Result<ImportRun>;

    /// All runs, oldest first
    async fn list_runs(&self) -> Result<Vec<ImportRun>>;
}
