//! Imported record listing.

use super::LogsQuery;
use crate::api::AppState;
use crate::error::Error;
use crate::types::PaginatedLogs;
use axum::{
    Json,
    extract::{Query, State},
};

/// GET /logs - Page through imported records with aggregate statistics
///
/// Statistics are computed over every record matching `q`, not just the page.
#[utoipa::path(
    get,
    path = "/api/v1/logs",
    tag = "logs",
    params(LogsQuery),
    responses(
        (status = 200, description = "One page of records", body = PaginatedLogs),
        (status = 400, description = "Malformed query string"),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<PaginatedLogs>, Error> {
    let page = state
        .importer
        .db
        .logs_with_statistics(query.page(), query.per_page(), query.filter())
        .await?;

    Ok(Json(page))
}
