//! Custom error types for the HTTP layer

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::{CacheError, DatabaseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;

/// Error returned by handlers, rendered as `{ "error": message }`
#[derive(Error, Debug)]
pub enum AppError {
    /// Local login failed
    #[error("Username and password do not match")]
    InvalidCredentials,

    /// Signup for an email that already has an account
    #[error("A user account with that email already exists")]
    EmailTaken,

    /// The route requires an authenticated session
    #[error("Unauthorized")]
    Unauthorized,

    /// Login throttled for this email
    #[error("Too many login attempts, try again later")]
    TooManyAttempts,

    /// Bad request with message
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Session store error
    #[error("Session store error: {0}")]
    Session(#[from] CacheError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::EmailTaken | AuthError::AccountConflict(_) => AppError::EmailTaken,
            AuthError::Store(e) => AppError::Database(e),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            // Duplicate signups answer 401, which existing clients rely on
            AppError::InvalidCredentials | AppError::EmailTaken | AppError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AppError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) | AppError::Database(_) | AppError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = if status.is_server_error() {
            error!("{}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for handler results
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_duplicate_email_is_401() {
        let (status, body) = render(AppError::EmailTaken).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "A user account with that email already exists");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, body) = render(AppError::Internal("pool exhausted".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_auth_errors_map_to_http_errors() {
        let (status, body) = render(AuthError::InvalidCredentials.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Username and password do not match");
    }
}
