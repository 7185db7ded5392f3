//! Event tracker API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use eventtracker_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Mirror schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Tracing or exporter setup failed.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Summary of what failed.
    pub error: String,
    /// Underlying cause, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Raw database error code, when the mirror reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorBody {
    fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            code: None,
        }
    }
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            DomainError::NotFound(message) => (StatusCode::NOT_FOUND, ErrorBody::message(message)),
            DomainError::Validation(message) => {
                (StatusCode::BAD_REQUEST, ErrorBody::message(message))
            }
            DomainError::MirrorCheck { source, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Failed to check database for duplicates".to_owned(),
                    details: Some(source.message),
                    code: None,
                },
            ),
            DomainError::MirrorWrite { source, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Failed to store event in database".to_owned(),
                    details: Some(source.message),
                    code: source.code,
                },
            ),
            DomainError::Mirror(source) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Failed to query events from database".to_owned(),
                    details: Some(source.message),
                    code: None,
                },
            ),
            other @ (DomainError::Config(_)
            | DomainError::Connection(_)
            | DomainError::Timeout { .. }
            | DomainError::Ledger(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::message(other.to_string()),
            ),
        };

        (status, Json(body)).into_response()
    }
}
