//! Inspire Core - Domain models, traits, and shared types
//!
//! This crate defines the abstractions shared by the store, API and CLI crates:
//! - Account and session records
//! - The `CredentialStore` and `SessionRegistry` traits
//! - Store error types
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, JwtAlgorithm, LoggingConfig, ServerConfig,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Numeric account identifier. This is the token subject, never the email.
pub type AccountId = i64;

/// User group assigned to self-registered accounts.
pub const DEFAULT_USER_GROUP: i32 = 2;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised by credential and session stores
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Session {0} is already recorded")]
    DuplicateSession(Uuid),

    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    #[error("Database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ============================================================================
// Accounts
// ============================================================================

/// Identity record of a registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_group: i32,
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub email: String,

    /// Argon2id PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create an account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub user_group: i32,
}

impl NewAccount {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            firstname: String::new(),
            lastname: String::new(),
            username: String::new(),
            email: email.into(),
            password_hash: password_hash.into(),
            user_group: DEFAULT_USER_GROUP,
        }
    }

    pub fn with_profile(
        mut self,
        firstname: impl Into<String>,
        lastname: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        self.firstname = firstname.into();
        self.lastname = lastname.into();
        self.username = username.into();
        self
    }
}

/// Partial profile update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.firstname.is_none()
            && self.lastname.is_none()
            && self.username.is_none()
            && self.email.is_none()
    }

    /// Apply the set fields to an account in place
    pub fn apply_to(&self, account: &mut Account) {
        if let Some(v) = &self.firstname {
            account.firstname = v.clone();
        }
        if let Some(v) = &self.lastname {
            account.lastname = v.clone();
        }
        if let Some(v) = &self.username {
            account.username = v.clone();
        }
        if let Some(v) = &self.email {
            account.email = v.clone();
        }
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// Server-side record of one issued access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub account_id: AccountId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(account_id: AccountId, session_id: Uuid, expires_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            account_id,
            expires_at,
            created_at: Utc::now(),
        }
    }

    /// True once `now` is past the absolute expiry
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Persistence of user identity and password hashes
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an account by its (unique) email
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Look up an account by id
    async fn find_by_id(&self, id: AccountId) -> StoreResult<Option<Account>>;

    /// Create an account; fails with `DuplicateEmail` if the email is taken
    async fn create(&self, account: NewAccount) -> StoreResult<Account>;

    /// Update profile fields; fails with `DuplicateEmail` if a new email is taken
    async fn update_profile(&self, id: AccountId, update: &ProfileUpdate)
        -> StoreResult<Account>;

    /// Replace the password hash
    async fn update_password(&self, id: AccountId, password_hash: &str) -> StoreResult<()>;

    /// Set the active flag
    async fn set_active(&self, id: AccountId, active: bool) -> StoreResult<()>;
}

/// Persistence of issued sessions and their revocations
#[async_trait::async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Persist a new session; fails with `DuplicateSession` on id collision
    async fn record_session(&self, session: &SessionRecord) -> StoreResult<()>;

    /// Fetch a recorded session
    async fn find_session(&self, session_id: Uuid) -> StoreResult<Option<SessionRecord>>;

    /// Keyed revocation lookup
    async fn is_revoked(&self, session_id: Uuid) -> StoreResult<bool>;

    /// Mark a session revoked. Revoking twice, or revoking a session that
    /// is no longer recorded (pruned), is a no-op.
    async fn revoke(&self, session_id: Uuid) -> StoreResult<()>;

    /// Delete sessions (and their revocations) that expired before `now`
    async fn prune_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_account() -> Account {
        Account {
            id: 7,
            user_group: DEFAULT_USER_GROUP,
            firstname: "Ada".to_string(),
            lastname: "Lovelace".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let json = serde_json::to_string(&sample_account()).unwrap();
        assert!(json.contains("ada@example.com"));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
    }

    #[test]
    fn test_profile_update_applies_only_set_fields() {
        let mut account = sample_account();
        let update = ProfileUpdate {
            username: Some("countess".to_string()),
            ..Default::default()
        };

        assert!(!update.is_empty());
        update.apply_to(&mut account);

        assert_eq!(account.username, "countess");
        assert_eq!(account.firstname, "Ada");
        assert_eq!(account.email, "ada@example.com");
    }

    #[test]
    fn test_empty_profile_update() {
        assert!(ProfileUpdate::default().is_empty());
    }

    #[test]
    fn test_new_account_defaults_to_regular_group() {
        let account = NewAccount::new("a@x.com", "hash").with_profile("A", "B", "ab");
        assert_eq!(account.user_group, DEFAULT_USER_GROUP);
        assert_eq!(account.username, "ab");
    }

    #[test]
    fn test_session_expiry_is_strict() {
        let now = Utc::now();
        let session = SessionRecord::new(1, Uuid::new_v4(), now);

        assert!(!session.is_expired_at(now));
        assert!(session.is_expired_at(now + Duration::seconds(1)));
        assert!(!session.is_expired_at(now - Duration::minutes(5)));
    }
}
