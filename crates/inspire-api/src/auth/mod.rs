//! Authentication and session revocation
//!
//! This module provides:
//! - Token issuance and validation (HMAC-signed JWTs)
//! - Password hashing with Argon2id
//! - The `Authenticator`, which ties tokens to revocable server-side sessions
//! - Account registration and self-service updates
//! - Middleware for request authentication

pub mod accounts;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;

pub use accounts::AccountService;
pub use error::{AuthError, FailureReason};
pub use jwt::{JwtError, SignedToken, TokenClaims, TokenIssuer};
pub use middleware::{auth_middleware, bearer_token};
pub use models::{
    AccountPublic, LoginForm, OkResponse, RegisterRequest, TokenResponse, UpdateAccountRequest,
};
pub use password::{validate_password_strength, PasswordConfig, PasswordError, PasswordHasher};
pub use service::{
    spawn_session_pruner, AuthenticatedUser, Authenticator, IssuedToken, LogoutOutcome,
};
