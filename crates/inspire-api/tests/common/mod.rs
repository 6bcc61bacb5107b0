//! Shared fixtures for the HTTP integration tests

use axum::Router;
use inspire_api::auth::PasswordConfig;
use inspire_api::create_router;
use inspire_api::state::{AppState, StorageBackend};
use inspire_core::AppConfig;
use inspire_store::{MemoryCredentialStore, MemorySessionRegistry};
use std::sync::Arc;

/// Signing secret of every test state
pub const TEST_JWT_SECRET: &str = "inspire-test-secret-0123456789abcdef";

/// Fresh in-memory state with cheap password hashing
pub fn test_state() -> AppState {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = TEST_JWT_SECRET.to_string();

    AppState::with_password_config(
        PasswordConfig::minimal(),
        config,
        Arc::new(MemoryCredentialStore::new()),
        Arc::new(MemorySessionRegistry::new()),
        StorageBackend::Memory,
    )
    .expect("test state")
}

/// Router over a fresh [`test_state`]
pub fn app() -> Router {
    create_router(Arc::new(test_state()))
}
