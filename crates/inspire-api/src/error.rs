//! API error handling

use crate::auth::AuthError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
    Database(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ApiError::bad_request(msg))).into_response()
            }
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(ApiError::unauthorized(msg)),
            )
                .into_response(),
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiError::internal_error()),
                )
                    .into_response()
            }
            AppError::Database(msg) => {
                error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiError::new("DATABASE_ERROR", "Database operation failed")),
                )
                    .into_response()
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AuthenticationFailed(_) => AppError::Unauthorized(err.to_string()),
            AuthError::InactiveAccount
            | AuthError::DuplicateEmail
            | AuthError::WeakPassword(_)
            | AuthError::InvalidRequest(_) => AppError::BadRequest(err.to_string()),
            AuthError::IssuanceFailed(_) | AuthError::Hashing(_) => {
                AppError::Internal(err.to_string())
            }
            AuthError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::FailureReason;
    use inspire_core::StoreError;

    fn status_of(err: AuthError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_auth_error_status_mapping() {
        assert_eq!(
            status_of(AuthError::failed(FailureReason::SessionRevoked)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_of(AuthError::InactiveAccount), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AuthError::DuplicateEmail), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(AuthError::WeakPassword("too short".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AuthError::IssuanceFailed("registry down".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AuthError::Store(StoreError::Database("down".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthorized_sets_challenge_header() {
        let response = AppError::Unauthorized("Not authenticated".to_string()).into_response();
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn test_failure_reason_not_exposed() {
        let app_error = AppError::from(AuthError::failed(FailureReason::SessionRevoked));
        match app_error {
            AppError::Unauthorized(msg) => assert_eq!(msg, "Could not validate credentials"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
