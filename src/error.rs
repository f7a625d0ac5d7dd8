//! Error taxonomy shared by services and HTTP handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Result alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or missing request fields.
    #[error("{0}")]
    Validation(String),
    /// Unknown identifier.
    #[error("{0}")]
    NotFound(String),
    /// A parameter was present but out of range or of the wrong type.
    #[error("{0}")]
    InvalidParameter(String),
    /// Requested codec is not on the allow-list.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    /// Stored data could not be parsed for the requested analysis.
    #[error("{0}")]
    InvalidData(String),
    /// An analysis or codec failed. The message is already sanitised.
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Wrap a failure from a codec or analysis routine.
    ///
    /// The detailed cause is logged; the client only sees `public`.
    pub fn upstream(public: &str, cause: impl std::fmt::Display) -> Self {
        tracing::warn!("{}: {}", public, cause);
        Self::Upstream(public.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::InvalidParameter(_)
            | Self::UnsupportedFormat(_)
            | Self::InvalidData(_)
            | Self::Upstream(_)
            | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Database(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Database operation failed".to_string()
            }
            Self::Io(e) => {
                tracing::error!("Storage error: {}", e);
                "Storage operation failed".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
