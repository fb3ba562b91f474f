//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the access-log-import
//! REST API using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the access-log-import REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "access-log-import REST API",
        version = "0.1.0",
        description = "Import Apache combined access logs over HTTP, follow import progress, and browse imported records",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080/api/v1", description = "Local development server")
    ),
    paths(
        // Imports
        crate::api::routes::create_import,
        crate::api::routes::list_imports,
        crate::api::routes::get_import,

        // Logs
        crate::api::routes::list_logs,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::RunId,
        crate::types::RunStatus,
        crate::types::ImportRun,
        crate::types::FetchStrategy,
        crate::types::ImportSummary,
        crate::types::Event,
        crate::types::StoredLog,
        crate::types::IpCount,
        crate::types::MethodCount,
        crate::types::LogStatistics,
        crate::types::Pagination,
        crate::types::PaginatedLogs,
        crate::validate::HttpMethod,

        // Config types from config.rs
        crate::config::Config,
        crate::config::PersistenceConfig,
        crate::config::ImportConfig,
        crate::config::RetryConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,

        // API request/response types from routes
        crate::api::routes::ImportRequest,
        crate::api::routes::ImportAccepted,
        crate::api::routes::RunPercent,
        crate::api::routes::ImportRunsResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "imports", description = "Imports - Trigger access-log imports and follow their runs"),
        (name = "logs", description = "Logs - Browse imported records with aggregate statistics"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security addon to add API key authentication scheme to OpenAPI spec
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}
