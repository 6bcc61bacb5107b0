//! Authentication service layer
//!
//! The [`Authenticator`] turns credentials into signed, server-tracked access
//! tokens and resolves tokens back to accounts. Every token carries a session
//! id that is recorded at login; logout revokes that id, and any later
//! presentation of the token is refused even though its signature and expiry
//! are still valid.

use super::error::{AuthError, FailureReason};
use super::jwt::{JwtError, TokenClaims, TokenIssuer};
use super::password::PasswordHasher;
use chrono::{DateTime, Duration, Utc};
use inspire_core::config::MAX_ACCESS_TOKEN_EXPIRE_MINUTES;
use inspire_core::{
    Account, AccountId, AuthConfig, CredentialStore, SessionRecord, SessionRegistry, StoreError,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Session id collisions are retried this many times before giving up
const SESSION_ID_RETRIES: usize = 1;

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub account_id: AccountId,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Caller resolved from a valid, unrevoked token
///
/// Added to request extensions by the auth middleware and extracted in
/// handlers with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub account: Account,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl AuthenticatedUser {
    pub fn id(&self) -> AccountId {
        self.account.id
    }
}

/// Result of a logout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub account_id: AccountId,
    pub session_id: Uuid,
    /// The session had already been revoked before this call
    pub already_revoked: bool,
}

struct ValidatedToken {
    claims: TokenClaims,
    account: Account,
    revoked: bool,
}

/// Issues, validates and revokes access tokens
pub struct Authenticator {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionRegistry>,
    issuer: TokenIssuer,
    hasher: Arc<PasswordHasher>,
    token_ttl: Duration,
}

impl Authenticator {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionRegistry>,
        issuer: TokenIssuer,
        hasher: Arc<PasswordHasher>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            credentials,
            sessions,
            issuer,
            hasher,
            token_ttl,
        }
    }

    /// Build from auth configuration; fails on an unusable signing secret or
    /// a token lifetime outside `1..=MAX_ACCESS_TOKEN_EXPIRE_MINUTES`
    pub fn from_config(
        config: &AuthConfig,
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionRegistry>,
        hasher: Arc<PasswordHasher>,
    ) -> Result<Self, JwtError> {
        let minutes = config.access_token_expire_minutes;
        let ttl = Some(minutes)
            .filter(|m| (1..=MAX_ACCESS_TOKEN_EXPIRE_MINUTES).contains(m))
            .and_then(|m| i64::try_from(m).ok())
            .and_then(Duration::try_minutes)
            .ok_or(JwtError::InvalidLifetime)?;
        Ok(Self::new(
            credentials,
            sessions,
            TokenIssuer::from_config(config)?,
            hasher,
            ttl,
        ))
    }

    /// Lifetime of newly issued tokens
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Exchange an email and password for a new access token
    ///
    /// Unknown emails and wrong passwords fail identically, and both pay for
    /// one password verification. Each successful login records a fresh
    /// session, so logging in twice yields two independently revocable tokens.
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let account = match self.credentials.find_by_email(email).await? {
            Some(account) => account,
            None => {
                self.hasher.verify_dummy(password);
                debug!("Login for unknown email refused");
                return Err(AuthError::failed(FailureReason::InvalidCredentials));
            }
        };

        if !self.hasher.verify(password, &account.password_hash) {
            debug!(account_id = account.id, "Login with wrong password refused");
            return Err(AuthError::failed(FailureReason::InvalidCredentials));
        }

        let mut attempts = 0;
        loop {
            match self.issue_session(account.id).await {
                Err(AuthError::Store(StoreError::DuplicateSession(id)))
                    if attempts < SESSION_ID_RETRIES =>
                {
                    warn!(session_id = %id, "Session id collision, retrying");
                    attempts += 1;
                }
                Err(AuthError::Store(StoreError::DuplicateSession(id))) => {
                    error!(session_id = %id, "Session id collision persisted");
                    return Err(AuthError::IssuanceFailed(
                        "could not allocate a session id".to_string(),
                    ));
                }
                other => return other,
            }
        }
    }

    async fn issue_session(&self, account_id: AccountId) -> Result<IssuedToken, AuthError> {
        let session_id = Uuid::new_v4();
        let signed = self
            .issuer
            .issue(account_id, session_id, self.token_ttl)
            .map_err(|e| {
                error!("Token signing failed: {}", e);
                AuthError::IssuanceFailed(e.to_string())
            })?;
        let expires_at = signed.claims.expires_at();

        // The token is only returned once its session is durable; an
        // unrecorded session would be unrevocable.
        self.sessions
            .record_session(&SessionRecord::new(account_id, session_id, expires_at))
            .await
            .map_err(|e| match e {
                StoreError::DuplicateSession(_) => AuthError::Store(e),
                other => {
                    error!("Failed to record session: {}", other);
                    AuthError::IssuanceFailed(other.to_string())
                }
            })?;

        info!(account_id, session_id = %session_id, "Session issued");

        Ok(IssuedToken {
            access_token: signed.token,
            account_id,
            session_id,
            expires_at,
        })
    }

    /// Resolve a token to its account
    pub async fn authenticate(&self, token: &str) -> Result<Account, AuthError> {
        self.authenticate_user(token).await.map(|user| user.account)
    }

    /// Resolve a token to its account and session
    ///
    /// Checks, in order: signature, algorithm and expiry; that the session
    /// was recorded; that it is not revoked; that the account exists and is
    /// active.
    pub async fn authenticate_user(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let validated = self.validate(token).await?;
        if validated.revoked {
            return Err(AuthError::failed(FailureReason::SessionRevoked));
        }
        if !validated.account.is_active {
            return Err(AuthError::InactiveAccount);
        }

        Ok(AuthenticatedUser {
            session_id: validated.claims.uid,
            expires_at: validated.claims.expires_at(),
            account: validated.account,
        })
    }

    /// Revoke the session a token belongs to
    ///
    /// The token must pass the same checks as [`Self::authenticate_user`],
    /// except that logging out an already revoked session succeeds.
    pub async fn logout(&self, token: &str) -> Result<LogoutOutcome, AuthError> {
        let validated = self.validate(token).await?;
        if !validated.revoked && !validated.account.is_active {
            return Err(AuthError::InactiveAccount);
        }

        let session_id = validated.claims.uid;
        if !validated.revoked {
            self.sessions.revoke(session_id).await?;
            info!(account_id = validated.account.id, session_id = %session_id, "Session revoked");
        }

        Ok(LogoutOutcome {
            account_id: validated.account.id,
            session_id,
            already_revoked: validated.revoked,
        })
    }

    /// Revoke a session by id, e.g. when its owner deletes their account
    pub async fn revoke_session(&self, session_id: Uuid) -> Result<(), AuthError> {
        self.sessions.revoke(session_id).await?;
        Ok(())
    }

    /// Delete sessions whose expiry has passed, along with their revocations
    ///
    /// Pruned tokens are already refused on expiry, so this only bounds the
    /// size of the registry.
    pub async fn prune_expired_sessions(&self) -> Result<u64, AuthError> {
        let pruned = self.sessions.prune_expired(Utc::now()).await?;
        if pruned > 0 {
            info!(pruned, "Pruned expired sessions");
        }
        Ok(pruned)
    }

    async fn validate(&self, token: &str) -> Result<ValidatedToken, AuthError> {
        let claims = self.issuer.decode(token).map_err(AuthError::failed)?;
        let account_id = claims.account_id().map_err(AuthError::failed)?;

        let session = self
            .sessions
            .find_session(claims.uid)
            .await?
            .ok_or_else(|| AuthError::failed(FailureReason::UnknownSession))?;
        if session.account_id != account_id {
            return Err(AuthError::failed(FailureReason::SubjectMismatch));
        }

        let revoked = self.sessions.is_revoked(claims.uid).await?;

        let account = self
            .credentials
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AuthError::failed(FailureReason::UnknownAccount))?;

        Ok(ValidatedToken {
            claims,
            account,
            revoked,
        })
    }
}

/// Run [`Authenticator::prune_expired_sessions`] every `interval`
pub fn spawn_session_pruner(
    authenticator: Arc<Authenticator>,
    interval: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = authenticator.prune_expired_sessions().await {
                warn!("Session pruning failed: {}", e);
            }
        }
    })
}
