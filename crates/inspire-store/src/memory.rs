//! In-memory credential store and session registry
//!
//! Backed by maps behind a `tokio::sync::RwLock`. Writes take the write lock,
//! so a `revoke` is visible to every `is_revoked` that starts after it
//! returns. State lives only as long as the process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inspire_core::{
    Account, AccountId, CredentialStore, NewAccount, ProfileUpdate, SessionRecord,
    SessionRegistry, StoreError, StoreResult,
};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Accounts {
    next_id: AccountId,
    by_id: HashMap<AccountId, Account>,
}

impl Accounts {
    fn email_taken(&self, email: &str, except: Option<AccountId>) -> bool {
        self.by_id
            .values()
            .any(|a| a.email == email && Some(a.id) != except)
    }
}

/// Process-local credential store
#[derive(Default)]
pub struct MemoryCredentialStore {
    accounts: RwLock<Accounts>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.accounts.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.by_id.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self.accounts.read().await.by_id.get(&id).cloned())
    }

    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        let mut accounts = self.accounts.write().await;
        if accounts.email_taken(&account.email, None) {
            return Err(StoreError::DuplicateEmail);
        }

        accounts.next_id += 1;
        let created = Account {
            id: accounts.next_id,
            user_group: account.user_group,
            firstname: account.firstname,
            lastname: account.lastname,
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            is_active: true,
            created_at: Utc::now(),
        };
        accounts.by_id.insert(created.id, created.clone());

        Ok(created)
    }

    async fn update_profile(
        &self,
        id: AccountId,
        update: &ProfileUpdate,
    ) -> StoreResult<Account> {
        let mut accounts = self.accounts.write().await;
        if let Some(email) = &update.email {
            if accounts.email_taken(email, Some(id)) {
                return Err(StoreError::DuplicateEmail);
            }
        }

        let account = accounts
            .by_id
            .get_mut(&id)
            .ok_or(StoreError::AccountNotFound(id))?;
        update.apply_to(account);

        Ok(account.clone())
    }

    async fn update_password(&self, id: AccountId, password_hash: &str) -> StoreResult<()> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .by_id
            .get_mut(&id)
            .ok_or(StoreError::AccountNotFound(id))?;
        account.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn set_active(&self, id: AccountId, active: bool) -> StoreResult<()> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .by_id
            .get_mut(&id)
            .ok_or(StoreError::AccountNotFound(id))?;
        account.is_active = active;
        Ok(())
    }
}

#[derive(Default)]
struct Sessions {
    records: HashMap<Uuid, SessionRecord>,
    revoked: HashSet<Uuid>,
}

/// Process-local session registry
#[derive(Default)]
pub struct MemorySessionRegistry {
    sessions: RwLock<Sessions>,
}

impl MemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.records.len()
    }

    /// Number of revocation entries
    pub async fn revocation_count(&self) -> usize {
        self.sessions.read().await.revoked.len()
    }
}

#[async_trait]
impl SessionRegistry for MemorySessionRegistry {
    async fn record_session(&self, session: &SessionRecord) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.records.contains_key(&session.session_id) {
            return Err(StoreError::DuplicateSession(session.session_id));
        }
        sessions
            .records
            .insert(session.session_id, session.clone());
        Ok(())
    }

    async fn find_session(&self, session_id: Uuid) -> StoreResult<Option<SessionRecord>> {
        Ok(self.sessions.read().await.records.get(&session_id).cloned())
    }

    async fn is_revoked(&self, session_id: Uuid) -> StoreResult<bool> {
        Ok(self.sessions.read().await.revoked.contains(&session_id))
    }

    async fn revoke(&self, session_id: Uuid) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.records.contains_key(&session_id) {
            sessions.revoked.insert(session_id);
        }
        Ok(())
    }

    async fn prune_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<Uuid> = sessions
            .records
            .values()
            .filter(|s| s.is_expired_at(now))
            .map(|s| s.session_id)
            .collect();

        for id in &expired {
            sessions.records.remove(id);
            sessions.revoked.remove(id);
        }

        Ok(expired.len() as u64)
    }
}
