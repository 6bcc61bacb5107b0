//! OpenAPI document for the HTTP API

use crate::auth::{
    AccountPublic, LoginForm, OkResponse, RegisterRequest, TokenResponse, UpdateAccountRequest,
};
use crate::error::ApiError;
use crate::handlers;
use crate::handlers::health::HealthResponse;
use axum::{response::IntoResponse, Json};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Urban Inspire API",
        description = "Authentication, session revocation and account management"
    ),
    paths(
        handlers::auth::token_handler,
        handlers::auth::logout_handler,
        handlers::users::register_handler,
        handlers::users::me_handler,
        handlers::users::update_me_handler,
        handlers::users::delete_me_handler,
        handlers::health::health_check,
    ),
    components(schemas(
        LoginForm,
        TokenResponse,
        RegisterRequest,
        UpdateAccountRequest,
        AccountPublic,
        OkResponse,
        HealthResponse,
        ApiError,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Token issuance and logout"),
        (name = "users", description = "Registration and self-service account management"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serve the OpenAPI document as JSON
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let paths = doc["paths"].as_object().unwrap();

        for path in ["/auth/token", "/auth/logout", "/users", "/users/me", "/health"] {
            assert!(paths.contains_key(path), "missing {path}");
        }
        assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
    }
}
