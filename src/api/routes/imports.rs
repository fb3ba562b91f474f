//! Import trigger and run status handlers.

use super::{ImportAccepted, ImportRunsResponse, RunPercent};
use crate::api::AppState;
use crate::error::{ApiError, Error, ToHttpStatus};
use crate::types::{ImportRun, RunId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /imports - Start importing an access log
#[utoipa::path(
    post,
    path = "/api/v1/imports",
    tag = "imports",
    request_body = super::ImportRequest,
    responses(
        (status = 202, description = "Import dispatched", body = ImportAccepted),
        (status = 400, description = "Missing or invalid URL", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn create_import(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let Some(url) = payload.get("url").and_then(|v| v.as_str()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("missing_url", "Missing required field: url")),
        )
            .into_response();
    };

    match state.importer.spawn_import(url) {
        Ok(url) => (
            StatusCode::ACCEPTED,
            Json(ImportAccepted {
                url: url.to_string(),
                status: "accepted".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(url, error = %e, code = e.error_code(), "Import request rejected");
            e.into_response()
        }
    }
}

/// GET /imports - Progress of every run
#[utoipa::path(
    get,
    path = "/api/v1/imports",
    tag = "imports",
    responses(
        (status = 200, description = "Run progress", body = ImportRunsResponse),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn list_imports(
    State(state): State<AppState>,
) -> Result<Json<ImportRunsResponse>, Error> {
    let runs = state.importer.db.list_import_runs().await?;

    let logs_import = runs.iter().any(|r| !r.is_finished());
    let percents = runs
        .into_iter()
        .map(|r| RunPercent {
            id: r.id.get(),
            percent: r.percent,
        })
        .collect();

    Ok(Json(ImportRunsResponse {
        percents,
        logs_import,
    }))
}

/// GET /imports/:id - Get a single run
#[utoipa::path(
    get,
    path = "/api/v1/imports/{id}",
    tag = "imports",
    params(
        ("id" = i64, Path, description = "Run ID")
    ),
    responses(
        (status = 200, description = "Run information", body = ImportRun),
        (status = 404, description = "Run not found", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn get_import(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ImportRun>, Error> {
    state
        .importer
        .db
        .get_run(RunId(id))
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("import run {}", id)))
}
