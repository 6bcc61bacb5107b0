//! Authentication error taxonomy
//!
//! These errors are what the authenticator and account service report. The
//! HTTP status for each is decided in `crate::error`.

use super::jwt::JwtError;
use super::password::PasswordError;
use inspire_core::StoreError;
use std::fmt;
use thiserror::Error;

/// Why a credential or token was refused
///
/// Kept for audit logs only. Every reason renders to the same client-facing
/// error, so callers cannot tell which accounts or sessions exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Unknown email or wrong password (deliberately not distinguished)
    InvalidCredentials,
    /// Signature, algorithm, expiry or format check failed
    InvalidToken(String),
    /// The token's session id was never recorded
    UnknownSession,
    /// The session was revoked by logout
    SessionRevoked,
    /// The token's subject does not own its session
    SubjectMismatch,
    /// The token's subject no longer exists
    UnknownAccount,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::InvalidCredentials => f.write_str("invalid credentials"),
            FailureReason::InvalidToken(detail) => write!(f, "invalid token: {detail}"),
            FailureReason::UnknownSession => f.write_str("unknown session"),
            FailureReason::SessionRevoked => f.write_str("session revoked"),
            FailureReason::SubjectMismatch => f.write_str("subject does not own session"),
            FailureReason::UnknownAccount => f.write_str("unknown account"),
        }
    }
}

impl From<JwtError> for FailureReason {
    fn from(err: JwtError) -> Self {
        FailureReason::InvalidToken(err.to_string())
    }
}

/// Authentication and account errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Could not validate credentials")]
    AuthenticationFailed(FailureReason),

    #[error("Inactive user")]
    InactiveAccount,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("{0}")]
    WeakPassword(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Failed to issue token: {0}")]
    IssuanceFailed(String),

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] PasswordError),

    #[error(transparent)]
    Store(StoreError),
}

impl AuthError {
    pub fn failed(reason: impl Into<FailureReason>) -> Self {
        AuthError::AuthenticationFailed(reason.into())
    }

    /// Audit detail for refused credentials or tokens
    pub fn reason(&self) -> Option<&FailureReason> {
        match self {
            AuthError::AuthenticationFailed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            other => AuthError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_failures_render_the_same() {
        let reasons = [
            FailureReason::InvalidCredentials,
            FailureReason::InvalidToken("expired".to_string()),
            FailureReason::UnknownSession,
            FailureReason::SessionRevoked,
            FailureReason::SubjectMismatch,
            FailureReason::UnknownAccount,
        ];

        for reason in reasons {
            let err = AuthError::failed(reason.clone());
            assert_eq!(err.to_string(), "Could not validate credentials");
            assert_eq!(err.reason(), Some(&reason));
        }
    }

    #[test]
    fn test_store_duplicate_email_maps() {
        assert!(matches!(
            AuthError::from(StoreError::DuplicateEmail),
            AuthError::DuplicateEmail
        ));
        assert!(matches!(
            AuthError::from(StoreError::Database("down".to_string())),
            AuthError::Store(_)
        ));
    }

    #[test]
    fn test_jwt_error_becomes_reason() {
        let err = AuthError::failed(JwtError::ExpiredToken);
        assert_eq!(
            err.reason(),
            Some(&FailureReason::InvalidToken("Token has expired".to_string()))
        );
    }
}
