//! # Error Handling
//!
//! Unified error handling for botwatch: storage-layer [`RepositoryError`],
//! domain-level [`TrackingError`], and the problem+json [`ApiError`] every
//! handler returns, with trace ID propagation.

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::telemetry;

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    #[serde(rename = "error")]
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Trace ID of the active request, or a short correlation ID outside a request scope
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                Some(format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        (self.status, headers, axum::Json(self)).into_response()
    }
}

/// Returns true when a database error reports a primary-key or unique-index collision.
pub fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const MYSQL_DUPLICATE_CODES: &[&str] = &["1022", "1062", "1169", "1586"];
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    if matches!(
        error.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    ) {
        return true;
    }

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    if let Some(code) = db_error.code() {
        let code_str = code.as_ref();
        return code_str == PG_UNIQUE
            || MYSQL_DUPLICATE_CODES.contains(&code_str)
            || SQLITE_DUPLICATE_CODES.contains(&code_str);
    }

    false
}

/// Errors raised by the repository layer
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("validation failed: {0}")]
    Validation(String),
    /// Carries the id of the website that already exists
    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Failures of the tracking and registration operations
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("invalid website_id or api_key")]
    InvalidCredentials,
    #[error("website '{id}' is already registered")]
    DuplicateTenant { id: String },
    #[error("storage failure: {0}")]
    StorageFailure(#[source] sea_orm::DbErr),
    #[error("{0}")]
    MalformedInput(String),
    #[error("website registry is disabled in single-site mode")]
    RegistryDisabled,
}

impl TrackingError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }

    /// Short label used for logs and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::DuplicateTenant { .. } => "duplicate_tenant",
            Self::StorageFailure(_) => "storage_failure",
            Self::MalformedInput(_) => "malformed_input",
            Self::RegistryDisabled => "registry_disabled",
        }
    }
}

impl From<RepositoryError> for TrackingError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(db_err) => Self::StorageFailure(db_err),
            RepositoryError::Validation(message) => Self::MalformedInput(message),
            RepositoryError::Conflict(message) => Self::DuplicateTenant { id: message },
        }
    }
}

impl From<TrackingError> for ApiError {
    fn from(error: TrackingError) -> Self {
        match error {
            TrackingError::InvalidCredentials => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid website_id or api_key",
            ),
            TrackingError::DuplicateTenant { id } => ApiError::new(
                StatusCode::BAD_REQUEST,
                "DUPLICATE_TENANT",
                "Website already registered",
            )
            .with_details(serde_json::json!({ "website_id": id })),
            TrackingError::MalformedInput(message) => {
                ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message.as_str())
            }
            TrackingError::RegistryDisabled => ApiError::new(
                StatusCode::NOT_FOUND,
                "REGISTRY_DISABLED",
                "Website registry is disabled in single-site mode",
            ),
            TrackingError::StorageFailure(db_err) => db_err.into(),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        TrackingError::from(error).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message.as_str())
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        match error {
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORAGE_FAILURE",
                    "Database service unavailable",
                )
            }
            other => {
                tracing::error!("Database error: {:?}", other);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_FAILURE",
                    "Database error",
                )
            }
        }
    }
}
