//! Database layer for access-log-import
//!
//! Handles SQLite persistence for imported access-log records and import runs.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`logs`] - Record insertion ([`LogSink`](crate::sink::LogSink)), search, aggregates, pagination
//! - [`runs`] - Import run progress ([`ProgressSink`](crate::sink::ProgressSink))

use crate::types::{ImportRun, RunId, RunStatus, StoredLog};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

mod logs;
mod migrations;
mod runs;

/// Default rows per INSERT statement
pub const DEFAULT_BATCH_INSERT_SIZE: usize = 100;

/// Each access-log row binds 6 variables; SQLite allows 999 per statement
pub const MAX_BATCH_INSERT_SIZE: usize = 166;

/// Access-log record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct LogRow {
    /// Unique database ID
    pub id: i64,
    /// Client IP address
    pub ip_address: String,
    /// RFC 3339 timestamp with the original offset
    pub date: String,
    /// HTTP method
    pub method: String,
    /// Request URI
    pub uri: String,
    /// Response status code
    pub status_code: i64,
    /// Response size in bytes
    pub size: i64,
}

impl LogRow {
    fn into_stored(self) -> crate::Result<StoredLog> {
        let date = DateTime::parse_from_rfc3339(&self.date).map_err(|e| {
            crate::Error::Database(crate::error::DatabaseError::QueryFailed(format!(
                "Invalid date '{}' in access_logs row {}: {}",
                self.date, self.id, e
            )))
        })?;

        Ok(StoredLog {
            id: self.id,
            ip_address: self.ip_address,
            date,
            method: self.method,
            uri: self.uri,
            status_code: u16::try_from(self.status_code).unwrap_or_default(),
            size: u64::try_from(self.size).unwrap_or_default(),
        })
    }
}

/// Import run record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct RunRow {
    /// Unique database ID
    pub id: i64,
    /// Progress percent (1-100)
    pub percent: i64,
    /// "started" or "finished"
    pub status: String,
    /// Unix timestamp when the run was created
    pub created_at: i64,
    /// Unix timestamp of the last update
    pub updated_at: i64,
}

impl From<RunRow> for ImportRun {
    fn from(row: RunRow) -> Self {
        ImportRun {
            id: RunId(row.id),
            percent: row.percent.clamp(1, 100) as u8,
            status: RunStatus::from_db(&row.status),
            created_at: Utc
                .timestamp_opt(row.created_at, 0)
                .single()
                .unwrap_or_else(Utc::now),
            updated_at: Utc
                .timestamp_opt(row.updated_at, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }
}

/// Database handle for access-log-import
pub struct Database {
    pool: SqlitePool,
    batch_insert_size: usize,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
