//! Error handling module
//!
//! Request-level error type and its HTTP response conversion. Every failure
//! is answered with a status code and a plain-text body holding the message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::auth::AuthError;
use crate::domain::DomainError;
use crate::pool::PoolError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Malformed request body
    #[error("Invalid request body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to read request body: {0}")]
    Body(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(AuthError::Provider(_)) => StatusCode::BAD_GATEWAY,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,

            AppError::Decode(_) | AppError::Body(_) => StatusCode::BAD_REQUEST,

            AppError::Domain(DomainError::InvalidId(_)) => StatusCode::BAD_REQUEST,
            AppError::Domain(DomainError::ChartNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Domain(_) => StatusCode::INTERNAL_SERVER_ERROR,

            AppError::Pool(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(status = %status, error = ?self, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
        }

        (status, self.to_string()).into_response()
    }
}
