/// Authentication middleware for protecting routes
///
/// Extracts the bearer token from the Authorization header and resolves it
/// through the shared [`Authenticator`](super::Authenticator). On success the
/// [`AuthenticatedUser`] is added to request extensions.
use super::error::AuthError;
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".to_string()))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".to_string()))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AppError::Unauthorized(
            "Invalid Authorization header".to_string(),
        ));
    }

    Ok(token.trim())
}

/// Audit a refused token with the request context
pub(crate) fn audit_refusal(headers: &HeaderMap, err: &AuthError) {
    let ip_address = extract_ip_address(headers);
    let user_agent = extract_user_agent(headers);

    match err {
        AuthError::AuthenticationFailed(reason) => audit_log(&AuditEvent::InvalidToken {
            ip_address,
            user_agent,
            reason: reason.to_string(),
        }),
        AuthError::InactiveAccount => audit_log(&AuditEvent::InactiveAccount {
            ip_address,
            user_agent,
        }),
        _ => {}
    }
}

/// Authentication middleware that requires a valid, unrevoked token
///
/// # Usage
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
/// use inspire_api::auth::auth_middleware;
///
/// let app = Router::new()
///     .route("/users/me", get(me_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;

    let user = match state.authenticator.authenticate_user(token).await {
        Ok(user) => user,
        Err(e) => {
            audit_refusal(request.headers(), &e);
            return Err(e.into());
        }
    };

    debug!(account_id = user.id(), session_id = %user.session_id, "Request authenticated");
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert_eq!(bearer_token(&headers("bearer abc")).unwrap(), "abc");
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        assert!(bearer_token(&HeaderMap::new()).is_err());
        assert!(bearer_token(&headers("Basic dXNlcjpwYXNz")).is_err());
        assert!(bearer_token(&headers("Bearer")).is_err());
        assert!(bearer_token(&headers("Bearer   ")).is_err());
    }
}
