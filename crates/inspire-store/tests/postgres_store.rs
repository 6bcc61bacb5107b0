//! PostgreSQL store tests
//!
//! These require a reachable database. Set DATABASE_URL and run:
//! cargo test -p inspire-store -- --ignored

use chrono::{Duration, Utc};
use inspire_core::{
    CredentialStore, DatabaseConfig, NewAccount, ProfileUpdate, SessionRecord, SessionRegistry,
    StoreError,
};
use inspire_store::{connect, run_migrations, PgCredentialStore, PgSessionRegistry};
use uuid::Uuid;

async fn pool() -> sqlx::PgPool {
    let config = DatabaseConfig {
        url: std::env::var("DATABASE_URL").ok(),
        ..Default::default()
    };
    let pool = connect(&config).await.expect("database connection");
    run_migrations(&pool).await.expect("migrations");
    pool
}

fn unique_email() -> String {
    format!("{}@example.com", Uuid::new_v4())
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_pg_account_lifecycle() {
    let store = PgCredentialStore::new(pool().await);
    let email = unique_email();

    let created = store
        .create(NewAccount::new(&email, "hash").with_profile("Ada", "L", "ada"))
        .await
        .unwrap();
    assert!(created.is_active);

    let duplicate = store.create(NewAccount::new(&email, "hash")).await;
    assert!(matches!(duplicate, Err(StoreError::DuplicateEmail)));

    let updated = store
        .update_profile(
            created.id,
            &ProfileUpdate {
                username: Some("countess".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.username, "countess");
    assert_eq!(updated.email, email);

    store.set_active(created.id, false).await.unwrap();
    let reloaded = store.find_by_email(&email).await.unwrap().unwrap();
    assert!(!reloaded.is_active);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_pg_session_revocation() {
    let pool = pool().await;
    let accounts = PgCredentialStore::new(pool.clone());
    let registry = PgSessionRegistry::new(pool);

    let account = accounts
        .create(NewAccount::new(unique_email(), "hash"))
        .await
        .unwrap();
    let session = SessionRecord::new(
        account.id,
        Uuid::new_v4(),
        Utc::now() + Duration::minutes(30),
    );

    registry.record_session(&session).await.unwrap();
    assert!(matches!(
        registry.record_session(&session).await,
        Err(StoreError::DuplicateSession(_))
    ));
    assert!(!registry.is_revoked(session.session_id).await.unwrap());

    registry.revoke(session.session_id).await.unwrap();
    registry.revoke(session.session_id).await.unwrap();
    assert!(registry.is_revoked(session.session_id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_pg_revoke_pruned_session_is_noop() {
    let registry = PgSessionRegistry::new(pool().await);
    let id = Uuid::new_v4();

    registry.revoke(id).await.unwrap();
    assert!(!registry.is_revoked(id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_pg_prune_expired_sessions() {
    let pool = pool().await;
    let accounts = PgCredentialStore::new(pool.clone());
    let registry = PgSessionRegistry::new(pool);

    let account = accounts
        .create(NewAccount::new(unique_email(), "hash"))
        .await
        .unwrap();
    let expired = SessionRecord::new(account.id, Uuid::new_v4(), Utc::now() - Duration::hours(1));
    registry.record_session(&expired).await.unwrap();
    registry.revoke(expired.session_id).await.unwrap();

    let pruned = registry.prune_expired(Utc::now()).await.unwrap();
    assert!(pruned >= 1);
    assert!(registry.find_session(expired.session_id).await.unwrap().is_none());
    assert!(!registry.is_revoked(expired.session_id).await.unwrap());
}
