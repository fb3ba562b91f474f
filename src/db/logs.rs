//! Access-log record storage and the read side: search, aggregates, pagination.

use crate::error::DatabaseError;
use crate::sink::LogSink;
use crate::types::{IpCount, LogStatistics, MethodCount, PaginatedLogs, Pagination, StoredLog};
use crate::validate::LogRecord;
use crate::{Error, Result};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};

use super::{Database, LogRow};

/// Default number of addresses in [`LogStatistics::top_ip_addresses`]
pub const DEFAULT_TOP_IP_ADDRESSES: i64 = 10;

/// Wrap a search term for `LIKE ... ESCAPE '\'`; `None` for an empty term
fn like_pattern(query: Option<&str>) -> Option<String> {
    let term = query.map(str::trim).filter(|q| !q.is_empty())?;
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}

/// Append the search filter (if any) as a WHERE clause
///
/// ASCII matching is case-insensitive, as SQLite's LIKE is.
fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, query: Option<&str>) {
    let Some(pattern) = like_pattern(query) else {
        return;
    };
    builder.push(" WHERE (ip_address LIKE ");
    builder.push_bind(pattern.clone());
    builder.push(" ESCAPE '\\' OR method LIKE ");
    builder.push_bind(pattern.clone());
    builder.push(" ESCAPE '\\' OR uri LIKE ");
    builder.push_bind(pattern);
    builder.push(" ESCAPE '\\')");
}

impl Database {
    /// Insert records in order, at most `batch_insert_size` rows per statement
    ///
    /// All statements for one call share a transaction.
    pub async fn insert_logs(&self, records: &[LogRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin insert transaction: {}",
                e
            )))
        })?;

        for chunk in records.chunks(self.batch_insert_size) {
            let mut query_builder = QueryBuilder::<Sqlite>::new(
                "INSERT INTO access_logs (ip_address, date, method, uri, status_code, size) ",
            );

            query_builder.push_values(chunk, |mut b, record| {
                b.push_bind(record.ip_address.to_string())
                    .push_bind(record.timestamp.to_rfc3339())
                    .push_bind(record.method.as_str())
                    .push_bind(record.uri.clone())
                    .push_bind(i64::from(record.status_code))
                    .push_bind(i64::try_from(record.size).unwrap_or(i64::MAX));
            });

            query_builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to insert access logs batch: {}",
                        e
                    )))
                })?;
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit access logs batch: {}",
                e
            )))
        })?;

        tracing::trace!(rows = records.len(), "inserted access logs");
        Ok(())
    }

    /// Number of rows matching `query`
    pub async fn count_logs(&self, query: Option<&str>) -> Result<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM access_logs");
        push_filter(&mut builder, query);

        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Sqlx)
    }

    /// Distinct client addresses among rows matching `query`
    pub async fn count_unique_ip_addresses(&self, query: Option<&str>) -> Result<i64> {
        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(DISTINCT ip_address) FROM access_logs");
        push_filter(&mut builder, query);

        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Sqlx)
    }

    /// Most frequent client addresses, highest count first
    pub async fn top_ip_addresses(&self, limit: i64, query: Option<&str>) -> Result<Vec<IpCount>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT ip_address, COUNT(*) AS request_count FROM access_logs",
        );
        push_filter(&mut builder, query);
        builder.push(" GROUP BY ip_address ORDER BY request_count DESC, ip_address ASC LIMIT ");
        builder.push_bind(limit.max(0));

        let rows = builder
            .build_query_as::<(String, i64)>()
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(rows
            .into_iter()
            .map(|(ip_address, count)| IpCount { ip_address, count })
            .collect())
    }

    /// Row count per HTTP method, highest count first
    pub async fn http_method_counts(&self, query: Option<&str>) -> Result<Vec<MethodCount>> {
        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT method, COUNT(*) AS request_count FROM access_logs");
        push_filter(&mut builder, query);
        builder.push(" GROUP BY method ORDER BY request_count DESC, method ASC");

        let rows = builder
            .build_query_as::<(String, i64)>()
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(rows
            .into_iter()
            .map(|(method, count)| MethodCount { method, count })
            .collect())
    }

    /// Total response bytes among rows matching `query`
    pub async fn sum_sizes(&self, query: Option<&str>) -> Result<i64> {
        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT COALESCE(SUM(size), 0) FROM access_logs");
        push_filter(&mut builder, query);

        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Sqlx)
    }

    /// All aggregates for rows matching `query`
    pub async fn log_statistics(&self, query: Option<&str>) -> Result<LogStatistics> {
        Ok(LogStatistics {
            unique_ip_addresses: self.count_unique_ip_addresses(query).await?,
            top_ip_addresses: self
                .top_ip_addresses(DEFAULT_TOP_IP_ADDRESSES, query)
                .await?,
            http_methods: self.http_method_counts(query).await?,
            total_size: self.sum_sizes(query).await?,
        })
    }

    /// One page of rows matching `query`, in insertion order
    ///
    /// Out-of-range pages are clamped to the nearest existing page.
    pub async fn get_logs(
        &self,
        page: i64,
        per_page: i64,
        query: Option<&str>,
    ) -> Result<(Vec<StoredLog>, Pagination)> {
        let per_page = per_page.max(1);
        let total = self.count_logs(query).await?;
        let pagination = Pagination::new(page, per_page, total);

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, ip_address, date, method, uri, status_code, size FROM access_logs",
        );
        push_filter(&mut builder, query);
        builder.push(" ORDER BY id ASC LIMIT ");
        builder.push_bind(per_page);
        builder.push(" OFFSET ");
        builder.push_bind(pagination.offset(per_page));

        let rows = builder
            .build_query_as::<LogRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        let logs = rows
            .into_iter()
            .map(LogRow::into_stored)
            .collect::<Result<Vec<_>>>()?;

        Ok((logs, pagination))
    }

    /// A page of rows together with aggregates over the same filter
    pub async fn logs_with_statistics(
        &self,
        page: i64,
        per_page: i64,
        query: Option<&str>,
    ) -> Result<PaginatedLogs> {
        let (logs, pagination) = self.get_logs(page, per_page, query).await?;
        let statistics = self.log_statistics(query).await?;

        Ok(PaginatedLogs {
            logs,
            statistics,
            pagination,
        })
    }
}

#[async_trait]
impl LogSink for Database {
    async fn create_records(&self, records: &[LogRecord]) -> Result<()> {
        self.insert_logs(records).await
    }
}
