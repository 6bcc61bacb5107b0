//! API route definitions

use crate::auth::auth_middleware;
use crate::handlers::{auth, health, users};
use crate::openapi::openapi_json;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create the API routes
///
/// Logout sits outside the auth middleware: it must accept a
/// token whose session is already revoked.
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/auth/token", post(auth::token_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/users", post(users::register_handler))
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json));

    // Protected routes (valid, unrevoked token for an active account)
    let protected_routes = Router::new()
        .route(
            "/users/me",
            get(users::me_handler)
                .patch(users::update_me_handler)
                .delete(users::delete_me_handler),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
