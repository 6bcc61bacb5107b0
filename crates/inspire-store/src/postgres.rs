//! PostgreSQL credential store and session registry
//!
//! Uses SQLx with runtime-checked queries. The schema lives in
//! `migrations/` and is applied with [`run_migrations`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inspire_core::{
    Account, AccountId, CredentialStore, DatabaseConfig, NewAccount, ProfileUpdate,
    SessionRecord, SessionRegistry, StoreError, StoreResult,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str =
    "id, user_group, firstname, lastname, username, email, password_hash, is_active, created_at";

/// Open a connection pool for the configured database
pub async fn connect(config: &DatabaseConfig) -> StoreResult<PgPool> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| StoreError::Database("DATABASE_URL is not configured".to_string()))?;

    info!("Initializing database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(url)
        .await
        .map_err(|e| StoreError::Database(format!("PostgreSQL connection failed: {e}")))?;

    info!("Database connection pool initialized");
    Ok(pool)
}

/// Apply pending schema migrations
pub async fn run_migrations(pool: &PgPool) -> StoreResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))
}

/// Check database connectivity
pub async fn health_check(pool: &PgPool) -> bool {
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => true,
        Err(e) => {
            error!("Database health check failed: {}", e);
            false
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

fn db_error(context: &str, err: sqlx::Error) -> StoreError {
    StoreError::Database(format!("{context}: {err}"))
}

/// Account row from database
#[derive(Debug, FromRow)]
struct AccountRow {
    id: i64,
    user_group: i32,
    firstname: String,
    lastname: String,
    username: String,
    email: String,
    password_hash: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            user_group: row.user_group,
            firstname: row.firstname,
            lastname: row.lastname,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// Session row from database
#[derive(Debug, FromRow)]
struct SessionRow {
    session_id: Uuid,
    user_id: i64,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        SessionRecord {
            session_id: row.session_id,
            account_id: row.user_id,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL-backed credential store
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch user by email", e))?;

        Ok(row.map(Account::from))
    }

    async fn find_by_id(&self, id: AccountId) -> StoreResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch user", e))?;

        Ok(row.map(Account::from))
    }

    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(&account.email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to check existing user", e))?;

        if existing > 0 {
            return Err(StoreError::DuplicateEmail);
        }

        // The unique index still catches a concurrent registration of the same email.
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            INSERT INTO users (user_group, firstname, lastname, username, email, password_hash, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, NOW())
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(account.user_group)
        .bind(&account.firstname)
        .bind(&account.lastname)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateEmail
            } else {
                db_error("Failed to create user", e)
            }
        })?;

        Ok(row.into())
    }

    async fn update_profile(
        &self,
        id: AccountId,
        update: &ProfileUpdate,
    ) -> StoreResult<Account> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            UPDATE users SET
                firstname = COALESCE($2, firstname),
                lastname = COALESCE($3, lastname),
                username = COALESCE($4, username),
                email = COALESCE($5, email)
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&update.firstname)
        .bind(&update.lastname)
        .bind(&update.username)
        .bind(&update.email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateEmail
            } else {
                db_error("Failed to update user", e)
            }
        })?;

        row.map(Account::from)
            .ok_or(StoreError::AccountNotFound(id))
    }

    async fn update_password(&self, id: AccountId, password_hash: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to update password", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AccountNotFound(id));
        }
        Ok(())
    }

    async fn set_active(&self, id: AccountId, active: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to update active flag", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AccountNotFound(id));
        }
        Ok(())
    }
}

/// PostgreSQL-backed session registry
///
/// Revocations are rows in `session_revocations` keyed by session id, so
/// every handler sees a `revoke` as soon as its insert commits.
#[derive(Clone)]
pub struct PgSessionRegistry {
    pool: PgPool,
}

impl PgSessionRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRegistry for PgSessionRegistry {
    async fn record_session(&self, session: &SessionRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO user_sessions (session_id, user_id, expires_at, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(session.session_id)
        .bind(session.account_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateSession(session.session_id)
            } else {
                db_error("Failed to store session", e)
            }
        })?;

        Ok(())
    }

    async fn find_session(&self, session_id: Uuid) -> StoreResult<Option<SessionRecord>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT session_id, user_id, expires_at, created_at FROM user_sessions WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch session", e))?;

        Ok(row.map(SessionRecord::from))
    }

    async fn is_revoked(&self, session_id: Uuid) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM session_revocations WHERE session_id = $1)",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to check revocation", e))
    }

    async fn revoke(&self, session_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO session_revocations (session_id, revoked_at)
            SELECT session_id, NOW() FROM user_sessions WHERE session_id = $1
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                if done.rows_affected() == 0 {
                    debug!(session_id = %session_id, "Session already revoked or pruned");
                }
                Ok(())
            }
            // The session row was pruned between the select and the insert.
            Err(e) if is_foreign_key_violation(&e) => Ok(()),
            Err(e) => Err(db_error("Failed to revoke session", e)),
        }
    }

    async fn prune_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to prune sessions", e))?;

        Ok(result.rows_affected())
    }
}
