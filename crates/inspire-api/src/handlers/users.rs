//! Account API handlers
//!
//! Registration is public; the `/users/me` routes sit behind the auth
//! middleware and act on the caller's own account.

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::{
    AccountPublic, AuthError, AuthenticatedUser, OkResponse, RegisterRequest,
    UpdateAccountRequest,
};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

/// Register a new account
///
/// The password must be at least 8 characters and contain an uppercase
/// letter, a lowercase letter, a digit and a special character. New accounts
/// are active and belong to the default user group.
///
/// # Responses
///
/// * `201 Created` - Account created
/// * `400 Bad Request` - Weak password, invalid email or email already registered
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AccountPublic),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);
    let email = request.email.clone();

    match state.accounts.register(request).await {
        Ok(account) => {
            audit_log(&AuditEvent::RegistrationSuccess {
                user_id: account.id,
                email: account.email.clone(),
                ip_address,
                user_agent,
            });
            Ok((StatusCode::CREATED, Json(AccountPublic::from(account))))
        }
        Err(e) => {
            if !matches!(e, AuthError::Store(_) | AuthError::Hashing(_)) {
                audit_log(&AuditEvent::RegistrationFailure {
                    email,
                    reason: e.to_string(),
                    ip_address,
                    user_agent,
                });
            }
            Err(e.into())
        }
    }
}

/// Get the caller's account
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Current account", body = AccountPublic),
        (status = 400, description = "Inactive user", body = crate::error::ApiError),
        (status = 401, description = "Could not validate credentials", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me_handler(Extension(user): Extension<AuthenticatedUser>) -> impl IntoResponse {
    Json(AccountPublic::from(user.account))
}

/// Update the caller's profile and/or password
///
/// Only the fields present in the body are changed.
#[utoipa::path(
    patch,
    path = "/users/me",
    tag = "users",
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account updated", body = OkResponse),
        (status = 400, description = "Invalid input or inactive user", body = crate::error::ApiError),
        (status = 401, description = "Could not validate credentials", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.accounts.update(user.id(), &request).await?;

    audit_log(&AuditEvent::AccountUpdated {
        user_id: user.id(),
        password_changed: request.password.is_some(),
        ip_address: extract_ip_address(&headers),
    });

    Ok(Json(OkResponse::ok()))
}

/// Delete the caller's account
///
/// The account is deactivated rather than erased, and the session used for
/// this request is revoked.
#[utoipa::path(
    delete,
    path = "/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Account deactivated", body = OkResponse),
        (status = 400, description = "Inactive user", body = crate::error::ApiError),
        (status = 401, description = "Could not validate credentials", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    state.accounts.set_active(user.id(), false).await?;
    state.authenticator.revoke_session(user.session_id).await?;

    audit_log(&AuditEvent::AccountDeactivated {
        user_id: user.id(),
        session_id: user.session_id,
        ip_address: extract_ip_address(&headers),
    });

    Ok(Json(OkResponse::ok()))
}
