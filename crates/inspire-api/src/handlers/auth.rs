//! Authentication API handlers
//!
//! Token issuance (OAuth2 password grant) and logout.

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::middleware::audit_refusal;
use crate::auth::{bearer_token, AuthError, LoginForm, OkResponse, TokenResponse};
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Form, Json};
use std::sync::Arc;

/// Exchange email and password for an access token
///
/// Takes an `application/x-www-form-urlencoded` body with `username` (the
/// email) and `password`. Every successful login creates a new session;
/// earlier tokens stay valid until they expire or are logged out.
///
/// # Responses
///
/// * `200 OK` - `{access_token, token_type: "bearer"}`
/// * `401 Unauthorized` - Unknown email or wrong password (not distinguished)
/// * `500 Internal Server Error` - Token could not be issued
#[utoipa::path(
    post,
    path = "/auth/token",
    tag = "auth",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Incorrect username or password", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn token_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    match state.authenticator.login(&form.username, &form.password).await {
        Ok(issued) => {
            audit_log(&AuditEvent::LoginSuccess {
                user_id: issued.account_id,
                session_id: issued.session_id,
                ip_address,
                user_agent,
            });
            Ok(Json(TokenResponse::bearer(issued.access_token)))
        }
        Err(AuthError::AuthenticationFailed(reason)) => {
            audit_log(&AuditEvent::LoginFailure {
                email: form.username,
                reason: reason.to_string(),
                ip_address,
                user_agent,
            });
            Err(AppError::Unauthorized(
                "Incorrect username or password".to_string(),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// Revoke the session of the presented token
///
/// Logging out a session that is already revoked succeeds. The token must
/// otherwise be valid: correctly signed, unexpired and for an active account.
///
/// # Responses
///
/// * `200 OK` - `{ok: true}`
/// * `400 Bad Request` - Inactive account
/// * `401 Unauthorized` - Missing or invalid token
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Session revoked", body = OkResponse),
        (status = 400, description = "Inactive user", body = crate::error::ApiError),
        (status = 401, description = "Could not validate credentials", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let token = bearer_token(&headers)?;

    let outcome = match state.authenticator.logout(token).await {
        Ok(outcome) => outcome,
        Err(e) => {
            audit_refusal(&headers, &e);
            return Err(e.into());
        }
    };

    audit_log(&AuditEvent::Logout {
        user_id: outcome.account_id,
        session_id: outcome.session_id,
        already_revoked: outcome.already_revoked,
        ip_address: extract_ip_address(&headers),
    });

    Ok(Json(OkResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_serialization() {
        let json = serde_json::to_value(TokenResponse::bearer("abc".to_string())).unwrap();
        assert_eq!(json["access_token"], "abc");
        assert_eq!(json["token_type"], "bearer");
    }

    #[test]
    fn test_ok_response_serialization() {
        let json = serde_json::to_string(&OkResponse::ok()).unwrap();
        assert_eq!(json, r#"{"ok":true}"#);
    }
}
