//! Import run progress tracking.

use crate::error::DatabaseError;
use crate::sink::ProgressSink;
use crate::types::{ImportRun, RunId, RunStatus};
use crate::{Error, Result};
use async_trait::async_trait;

use super::{Database, RunRow};

impl Database {
    /// Insert a run at percent 1, status started
    pub async fn insert_run(&self) -> Result<ImportRun> {
        let now = chrono::Utc::now().timestamp();

        let row = sqlx::query_as::<_, RunRow>(
            r#"
            INSERT INTO import_runs (percent, status, created_at, updated_at)
            VALUES (1, ?, ?, ?)
            RETURNING id, percent, status, created_at, updated_at
            "#,
        )
        .bind(RunStatus::Started.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to create import run: {}",
                e
            )))
        })?;

        Ok(row.into())
    }

    /// Get a run by ID
    pub async fn get_run(&self, id: RunId) -> Result<Option<ImportRun>> {
        let row = sqlx::query_as::<_, RunRow>(
            r#"
            SELECT id, percent, status, created_at, updated_at
            FROM import_runs
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(row.map(ImportRun::from))
    }

    /// All runs, oldest first
    pub async fn list_import_runs(&self) -> Result<Vec<ImportRun>> {
        let rows = sqlx::query_as::<_, RunRow>(
            r#"
            SELECT id, percent, status, created_at, updated_at
            FROM import_runs
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows.into_iter().map(ImportRun::from).collect())
    }

    /// Whether any run is still started
    pub async fn has_unfinished_runs(&self) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM import_runs WHERE status = ?")
            .bind(RunStatus::Started.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(count > 0)
    }

    /// Set percent and status of one run
    ///
    /// Percent is clamped into `[1, 100]`.
    async fn set_run_progress(
        &self,
        id: RunId,
        percent: u8,
        status: RunStatus,
    ) -> Result<ImportRun> {
        let now = chrono::Utc::now().timestamp();

        let row = sqlx::query_as::<_, RunRow>(
            r#"
            UPDATE import_runs
            SET percent = ?, status = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, percent, status, created_at, updated_at
            "#,
        )
        .bind(i64::from(percent.clamp(1, 100)))
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update import run {}: {}",
                id, e
            )))
        })?;

        row.map(ImportRun::from)
            .ok_or_else(|| Error::Database(DatabaseError::NotFound(format!("import run {}", id))))
    }
}

#[async_trait]
impl ProgressSink for Database {
    async fn create_run(&self) -> Result<ImportRun> {
        self.insert_run().await
    }

    async fn update_run(&self, id: RunId, percent: u8) -> Result<ImportRun> {
        self.set_run_progress(id, percent, RunStatus::Started).await
    }

    async fn finish_run(&self, id: RunId) -> Result<ImportRun> {
        self.set_run_progress(id, 100, RunStatus::Finished).await
    }

    async fn list_runs(&self) -> Result<Vec<ImportRun>> {
        self.list_import_runs().await
    }
}
