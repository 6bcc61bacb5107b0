//! Account registration and self-service profile management

use super::error::AuthError;
use super::models::{RegisterRequest, UpdateAccountRequest};
use super::password::{validate_password_strength, PasswordHasher};
use inspire_core::{Account, AccountId, CredentialStore, NewAccount, StoreError};
use std::sync::Arc;
use tracing::info;

/// Creates and maintains accounts in the credential store
pub struct AccountService {
    credentials: Arc<dyn CredentialStore>,
    hasher: Arc<PasswordHasher>,
}

impl AccountService {
    pub fn new(credentials: Arc<dyn CredentialStore>, hasher: Arc<PasswordHasher>) -> Self {
        Self {
            credentials,
            hasher,
        }
    }

    /// Register a new active account in the default user group
    pub async fn register(&self, request: RegisterRequest) -> Result<Account, AuthError> {
        let email = request.email.trim();
        validate_email(email)?;
        validate_password_strength(&request.password).map_err(AuthError::WeakPassword)?;

        if self.credentials.find_by_email(email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.hasher.hash(&request.password)?;
        let account = self
            .credentials
            .create(NewAccount::new(email, password_hash).with_profile(
                request.firstname,
                request.lastname,
                request.username,
            ))
            .await?;

        info!(account_id = account.id, "Account registered");
        Ok(account)
    }

    /// Apply a partial update to an account and return the result
    pub async fn update(
        &self,
        id: AccountId,
        request: &UpdateAccountRequest,
    ) -> Result<Account, AuthError> {
        let mut profile = request.profile();
        if let Some(email) = profile.email.as_mut() {
            *email = email.trim().to_string();
            validate_email(email)?;
        }

        let password_hash = match &request.password {
            Some(password) => {
                validate_password_strength(password).map_err(AuthError::WeakPassword)?;
                Some(self.hasher.hash(password)?)
            }
            None => None,
        };

        let mut account = if profile.is_empty() {
            self.credentials
                .find_by_id(id)
                .await?
                .ok_or(StoreError::AccountNotFound(id))?
        } else {
            self.credentials.update_profile(id, &profile).await?
        };

        if let Some(hash) = password_hash {
            self.credentials.update_password(id, &hash).await?;
            account.password_hash = hash;
            info!(account_id = id, "Password changed");
        }

        Ok(account)
    }

    /// Set the active flag; inactive accounts cannot authenticate
    pub async fn set_active(&self, id: AccountId, active: bool) -> Result<(), AuthError> {
        self.credentials.set_active(id, active).await?;
        info!(account_id = id, active, "Account active flag changed");
        Ok(())
    }

    /// Look up an account by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError> {
        Ok(self.credentials.find_by_email(email.trim()).await?)
    }
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AuthError::InvalidRequest("Invalid email format".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::PasswordConfig;
    use inspire_store::MemoryCredentialStore;

    fn service() -> (AccountService, Arc<MemoryCredentialStore>, Arc<PasswordHasher>) {
        let store = Arc::new(MemoryCredentialStore::new());
        let hasher = Arc::new(PasswordHasher::new(&PasswordConfig::minimal()).unwrap());
        (
            AccountService::new(store.clone(), hasher.clone()),
            store,
            hasher,
        )
    }

    fn request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            firstname: "Ada".to_string(),
            lastname: "Lovelace".to_string(),
            username: "ada".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let (service, _, hasher) = service();
        let account = service.register(request("a@x.com", "Abcdef1!")).await.unwrap();

        assert!(account.is_active);
        assert_eq!(account.user_group, inspire_core::DEFAULT_USER_GROUP);
        assert_ne!(account.password_hash, "Abcdef1!");
        assert!(hasher.verify("Abcdef1!", &account.password_hash));
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let (service, store, _) = service();
        let result = service.register(request("a@x.com", "abcdefgh")).await;

        assert!(matches!(result, Err(AuthError::WeakPassword(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let (service, store, _) = service();
        service.register(request("a@x.com", "Abcdef1!")).await.unwrap();

        let result = service.register(request("a@x.com", "Xyzabc2?")).await;
        assert!(matches!(result, Err(AuthError::DuplicateEmail)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_email() {
        let (service, _, _) = service();
        for email in ["", "no-at-sign", "@x.com", "a@"] {
            let result = service.register(request(email, "Abcdef1!")).await;
            assert!(matches!(result, Err(AuthError::InvalidRequest(_))), "{email}");
        }
    }

    #[tokio::test]
    async fn test_update_profile_and_password() {
        let (service, _, hasher) = service();
        let account = service.register(request("a@x.com", "Abcdef1!")).await.unwrap();

        let updated = service
            .update(
                account.id,
                &UpdateAccountRequest {
                    username: Some("countess".to_string()),
                    password: Some("Newpass9#".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.username, "countess");
        assert_eq!(updated.firstname, "Ada");
        assert!(hasher.verify("Newpass9#", &updated.password_hash));
        assert!(!hasher.verify("Abcdef1!", &updated.password_hash));
    }

    #[tokio::test]
    async fn test_update_weak_password_changes_nothing() {
        let (service, store, hasher) = service();
        let account = service.register(request("a@x.com", "Abcdef1!")).await.unwrap();

        let result = service
            .update(
                account.id,
                &UpdateAccountRequest {
                    username: Some("countess".to_string()),
                    password: Some("weak".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AuthError::WeakPassword(_))));

        let stored = store.find_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(stored.username, "ada");
        assert!(hasher.verify("Abcdef1!", &stored.password_hash));
    }

    #[tokio::test]
    async fn test_set_active() {
        let (service, store, _) = service();
        let account = service.register(request("a@x.com", "Abcdef1!")).await.unwrap();

        service.set_active(account.id, false).await.unwrap();
        assert!(!store.find_by_id(account.id).await.unwrap().unwrap().is_active);

        assert!(matches!(
            service.set_active(999, true).await,
            Err(AuthError::Store(StoreError::AccountNotFound(999)))
        ));
    }
}
