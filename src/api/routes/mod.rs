//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`imports`] - Trigger imports and follow their runs
//! - [`logs`] - Browse imported records with statistics
//! - [`system`] - Health, events, OpenAPI

use serde::{Deserialize, Serialize};

mod imports;
mod logs;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use imports::*;
pub use logs::*;
pub use system::*;

/// Default page size for GET /logs
pub const DEFAULT_PER_PAGE: i64 = 25;

/// Largest page size GET /logs will serve
pub const MAX_PER_PAGE: i64 = 500;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /imports
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ImportRequest {
    /// URL of the access log to import
    pub url: String,
}

/// Response for POST /imports
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ImportAccepted {
    /// Normalized URL the import was dispatched for
    pub url: String,
    /// Always "accepted"
    pub status: String,
}

/// Progress of one run as listed by GET /imports
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RunPercent {
    /// Run ID
    pub id: i64,
    /// Progress percent (1-100)
    pub percent: u8,
}

/// Response for GET /imports
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ImportRunsResponse {
    /// Every run, oldest first
    pub percents: Vec<RunPercent>,
    /// True while any run is still started
    pub logs_import: bool,
}

/// Query parameters for GET /logs
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogsQuery {
    /// Case-insensitive substring matched against ip address, method and uri
    pub q: Option<String>,
    /// 1-based page number (default: 1)
    pub page: Option<i64>,
    /// Page size (default: 25, max: 500)
    pub per_page: Option<i64>,
}

impl LogsQuery {
    /// Page size after defaults and clamping
    pub fn per_page(&self) -> i64 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// Requested page, 1 when absent
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    /// Search filter with blanks treated as absent
    pub fn filter(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}
