//! Application state management

use crate::auth::{
    AccountService, Authenticator, JwtError, PasswordConfig, PasswordError, PasswordHasher,
};
use inspire_core::{AppConfig, ConfigError, CredentialStore, SessionRegistry, StoreError};
use inspire_store::{
    MemoryCredentialStore, MemorySessionRegistry, PgCredentialStore, PgSessionRegistry,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised while assembling the application state
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Token issuer: {0}")]
    Jwt(#[from] JwtError),

    #[error("Password hasher: {0}")]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Where accounts and sessions are kept
#[derive(Clone)]
pub enum StorageBackend {
    /// Process-local maps; revocations are lost on restart
    Memory,
    Postgres(PgPool),
}

impl StorageBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Postgres(_) => "postgres",
        }
    }
}

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Token issuance, validation and revocation
    pub authenticator: Arc<Authenticator>,
    /// Registration and profile management
    pub accounts: AccountService,
    /// Backing store
    pub storage: StorageBackend,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Assemble state around the given stores
    pub fn new(
        config: AppConfig,
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionRegistry>,
        storage: StorageBackend,
    ) -> Result<Self, StateError> {
        Self::with_password_config(
            PasswordConfig::from(&config.auth),
            config,
            credentials,
            sessions,
            storage,
        )
    }

    /// Assemble state with explicit hashing parameters
    pub fn with_password_config(
        password_config: PasswordConfig,
        config: AppConfig,
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionRegistry>,
        storage: StorageBackend,
    ) -> Result<Self, StateError> {
        let hasher = Arc::new(PasswordHasher::new(&password_config)?);
        let authenticator = Authenticator::from_config(
            &config.auth,
            credentials.clone(),
            sessions,
            hasher.clone(),
        )?;

        Ok(Self {
            accounts: AccountService::new(credentials, hasher),
            authenticator: Arc::new(authenticator),
            storage,
            config,
            start_time: Instant::now(),
        })
    }

    /// State backed by the in-memory stores
    pub fn in_memory(config: AppConfig) -> Result<Self, StateError> {
        Self::new(
            config,
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemorySessionRegistry::new()),
            StorageBackend::Memory,
        )
    }

    /// State backed by PostgreSQL
    pub fn postgres(config: AppConfig, pool: PgPool) -> Result<Self, StateError> {
        Self::new(
            config,
            Arc::new(PgCredentialStore::new(pool.clone())),
            Arc::new(PgSessionRegistry::new(pool.clone())),
            StorageBackend::Postgres(pool),
        )
    }

    /// Connect to the configured database (running migrations), or fall back
    /// to the in-memory stores when no database URL is set
    pub async fn from_config(config: AppConfig) -> Result<Self, StateError> {
        if config.database.url.is_none() {
            warn!("DATABASE_URL not set; using in-memory stores, sessions will not survive a restart");
            return Self::in_memory(config);
        }

        let pool = inspire_store::connect(&config.database).await?;
        inspire_store::run_migrations(&pool).await?;
        info!("Database migrations applied");

        Self::postgres(config, pool)
    }

    /// Check that the backing store is reachable
    pub async fn storage_healthy(&self) -> bool {
        match &self.storage {
            StorageBackend::Memory => true,
            StorageBackend::Postgres(pool) => inspire_store::health_check(pool).await,
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
