//! Error types for access-log-import
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (transport, database, configuration)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes
//!
//! Line-level validation failures are deliberately absent here: a malformed
//! log line is a [`Rejection`](crate::validate::Rejection), never an `Error`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for access-log-import operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for access-log-import
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "database_path")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Transport-level failure talking to the log source
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The log source answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Requested URL
        url: String,
        /// Status code returned by the server
        status: u16,
    },

    /// A range request was answered with something other than partial content
    #[error("range {from}-{to} of {url} not honoured (HTTP {status})")]
    RangeNotSatisfied {
        /// Requested URL
        url: String,
        /// First requested byte (inclusive)
        from: u64,
        /// Last requested byte (inclusive)
        to: u64,
        /// Status code returned by the server
        status: u16,
    },

    /// The import trigger received a syntactically invalid URL
    #[error("'{0}' is not a valid URL")]
    InvalidUrl(String),

    /// Requested resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new imports
    #[error("shutdown in progress: not accepting new imports")]
    ShuttingDown,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),
}

/// API error response format
///
/// Returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "invalid_url",
///     "message": "'ftp:/x' is not a valid URL"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "invalid_url")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::InvalidUrl(_) => 400,

            Error::NotFound(_) => 404,
            Error::Database(DatabaseError::NotFound(_)) => 404,

            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // The log source is an upstream service
            Error::Network(_) => 502,
            Error::HttpStatus { .. } => 502,
            Error::RangeNotSatisfied { .. } => 502,

            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(DatabaseError::NotFound(_)) => "not_found",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Network(_) => "network_error",
            Error::HttpStatus { .. } => "upstream_status",
            Error::RangeNotSatisfied { .. } => "range_not_satisfied",
            Error::InvalidUrl(_) => "invalid_url",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::HttpStatus { url, status } => Some(serde_json::json!({
                "url": url,
                "status": status,
            })),
            Error::RangeNotSatisfied {
                url,
                from,
                to,
                status,
            } => Some(serde_json::json!({
                "url": url,
                "from": from,
                "to": to,
                "status": status,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
