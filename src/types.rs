//! Core types for access-log-import

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for an import run
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct RunId(pub i64);

impl RunId {
    /// Create a new RunId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for RunId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<RunId> for i64 {
    fn from(id: RunId) -> Self {
        id.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl sqlx::Type<sqlx::Sqlite> for RunId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for RunId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for RunId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Import run status
///
/// There is no failed state: a run whose transport fails stays `Started` at
/// the last percent it reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Run created, import in progress (or stalled)
    Started,
    /// All windows processed
    Finished,
}

impl RunStatus {
    /// Text stored in the `status` column
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Started => "started",
            RunStatus::Finished => "finished",
        }
    }

    /// Parse the `status` column, treating unknown values as still running
    pub fn from_db(value: &str) -> Self {
        match value {
            "finished" => RunStatus::Finished,
            _ => RunStatus::Started,
        }
    }
}

/// Progress record for one import invocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImportRun {
    /// Run identifier
    pub id: RunId,

    /// Progress in percent, 1 to 100
    pub percent: u8,

    /// Current status
    pub status: RunStatus,

    /// When the run was created
    pub created_at: DateTime<Utc>,

    /// Last progress update
    pub updated_at: DateTime<Utc>,
}

impl ImportRun {
    /// Whether the run has reached its terminal state
    pub fn is_finished(&self) -> bool {
        self.status == RunStatus::Finished
    }
}

/// How the source body was retrieved
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Byte-range windows, one percent step each
    Chunked,
    /// Whole body in a single request
    Full,
}

/// Outcome of a completed import
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ImportSummary {
    /// Final state of the run (always finished, percent 100)
    pub run: ImportRun,

    /// Retrieval strategy chosen after probing
    pub strategy: FetchStrategy,

    /// Number of fetch requests issued for the body
    pub windows: u64,

    /// Records handed to the log sink
    pub accepted: u64,

    /// Lines rejected by validation, blank lines excluded
    pub rejected: u64,
}

/// Event emitted during the import lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A run was created for a URL
    ImportStarted {
        /// Run ID
        run_id: RunId,
        /// Source URL
        url: String,
    },

    /// A run's percent advanced
    ImportProgress {
        /// Run ID
        run_id: RunId,
        /// New percent (1 to 99 while running)
        percent: u8,
    },

    /// A run reached percent 100
    ImportFinished {
        /// Run ID
        run_id: RunId,
        /// Records persisted
        accepted: u64,
        /// Lines rejected
        rejected: u64,
    },

    /// An import failed
    ImportFailed {
        /// Source URL
        url: String,
        /// Run ID, absent when the failure happened before the run was created
        #[serde(skip_serializing_if = "Option::is_none")]
        run_id: Option<RunId>,
        /// Error description
        error: String,
    },

    /// Importer is shutting down
    Shutdown,
}

/// A persisted access-log row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoredLog {
    /// Row ID (insertion order)
    pub id: i64,
    /// Client IP address, canonical form
    pub ip_address: String,
    /// Request timestamp with its original offset
    #[schema(value_type = String, format = DateTime)]
    pub date: DateTime<FixedOffset>,
    /// HTTP method
    pub method: String,
    /// Request URI, verbatim
    pub uri: String,
    /// Response status code
    pub status_code: u16,
    /// Response size in bytes
    pub size: u64,
}

/// Request count for one client address
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IpCount {
    /// Client IP address
    pub ip_address: String,
    /// Number of matching rows
    pub count: i64,
}

/// Request count for one HTTP method
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MethodCount {
    /// HTTP method
    pub method: String,
    /// Number of matching rows
    pub count: i64,
}

/// Aggregates over the (optionally filtered) log table
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LogStatistics {
    /// Distinct client addresses
    pub unique_ip_addresses: i64,
    /// Most frequent client addresses, descending
    pub top_ip_addresses: Vec<IpCount>,
    /// Row count per method
    pub http_methods: Vec<MethodCount>,
    /// Sum of response sizes in bytes
    pub total_size: i64,
}

/// Pages listed on each side of the current one in [`Pagination::page_range`]
pub const PAGE_RANGE_RADIUS: i64 = 5;

/// Page metadata for paginated listings
///
/// `next_page_number` and `previous_page_number` are 0 when there is no such page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    /// Current page (1-based, clamped into range)
    pub number: i64,
    /// Total pages, at least 1
    pub num_pages: i64,
    /// Whether a later page exists
    pub has_next: bool,
    /// Whether an earlier page exists
    pub has_previous: bool,
    /// Whether more than one page exists
    pub has_other_pages: bool,
    /// Next page number, or 0
    pub next_page_number: i64,
    /// Previous page number, or 0
    pub previous_page_number: i64,
    /// Page numbers around the current one, at most [`PAGE_RANGE_RADIUS`] on each side
    pub page_range: Vec<i64>,
}

impl Pagination {
    /// Build page metadata for `total` rows at `per_page` rows per page
    ///
    /// `page` is clamped into `[1, num_pages]`; an empty table still has one page.
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let per_page = per_page.max(1);
        let num_pages = ((total + per_page - 1) / per_page).max(1);
        let number = page.clamp(1, num_pages);
        let has_next = number < num_pages;
        let has_previous = number > 1;

        Self {
            number,
            num_pages,
            has_next,
            has_previous,
            has_other_pages: has_next || has_previous,
            next_page_number: if has_next { number + 1 } else { 0 },
            previous_page_number: if has_previous { number - 1 } else { 0 },
            page_range: ((number - PAGE_RANGE_RADIUS).max(1)
                ..=(number + PAGE_RANGE_RADIUS).min(num_pages))
                .collect(),
        }
    }

    /// Row offset of the first item on the current page
    pub fn offset(&self, per_page: i64) -> i64 {
        (self.number - 1) * per_page.max(1)
    }
}

/// One page of logs with aggregates over the same filter
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedLogs {
    /// Rows on this page, in insertion order
    pub logs: Vec<StoredLog>,
    /// Aggregates over every matching row, not just this page
    pub statistics: LogStatistics,
    /// Page metadata
    pub pagination: Pagination,
}
