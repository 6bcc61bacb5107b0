//! Inspire Store - credential and session persistence
//!
//! Two implementations of the `inspire_core` store traits:
//! - `postgres`: durable PostgreSQL stores backed by SQLx (production)
//! - `memory`: process-local stores for tests and database-less development

pub mod memory;
pub mod postgres;

pub use memory::{MemoryCredentialStore, MemorySessionRegistry};
pub use postgres::{connect, health_check, run_migrations, PgCredentialStore, PgSessionRegistry};
pub use sqlx::PgPool;
