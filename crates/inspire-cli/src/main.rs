//! Urban Inspire CLI - database and account administration
//!
//! Usage:
//!   inspire migrate
//!   inspire create-account --email <email> [--firstname ..] [--lastname ..] [--username ..]
//!   inspire activate --email <email>
//!   inspire deactivate --email <email>
//!   inspire prune-sessions
//!
//! The database comes from `--database-url` or `DATABASE_URL`; other
//! settings are read from the environment like the API server does.

use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use inspire_api::auth::{AccountService, PasswordConfig, PasswordHasher, RegisterRequest};
use inspire_core::{AppConfig, SessionRegistry};
use inspire_store::{connect, run_migrations, PgCredentialStore, PgPool, PgSessionRegistry};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "inspire")]
#[command(about = "Urban Inspire backend administration")]
#[command(version)]
struct Cli {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create an active account
    CreateAccount {
        #[arg(long)]
        email: String,
        /// Password; prefer the environment variable over the flag
        #[arg(long, env = "INSPIRE_ACCOUNT_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "")]
        firstname: String,
        #[arg(long, default_value = "")]
        lastname: String,
        #[arg(long, default_value = "")]
        username: String,
    },
    /// Allow an account to authenticate again
    Activate {
        #[arg(long)]
        email: String,
    },
    /// Refuse all tokens of an account until it is reactivated
    Deactivate {
        #[arg(long)]
        email: String,
    },
    /// Delete expired sessions and their revocation entries
    PruneSessions,
}

async fn open_pool(config: &AppConfig) -> anyhow::Result<PgPool> {
    if config.database.url.is_none() {
        return Err(anyhow!("DATABASE_URL is not set"));
    }
    let pool = connect(&config.database).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

fn account_service(config: &AppConfig, pool: PgPool) -> anyhow::Result<AccountService> {
    let hasher = PasswordHasher::new(&PasswordConfig::from(&config.auth))
        .context("Invalid password hashing parameters")?;
    Ok(AccountService::new(
        Arc::new(PgCredentialStore::new(pool)),
        Arc::new(hasher),
    ))
}

async fn set_active(config: &AppConfig, email: &str, active: bool) -> anyhow::Result<()> {
    let accounts = account_service(config, open_pool(config).await?)?;
    let account = accounts
        .find_by_email(email)
        .await?
        .ok_or_else(|| anyhow!("No account with email {email}"))?;

    accounts.set_active(account.id, active).await?;
    println!(
        "Account {} ({}) is now {}",
        account.id,
        account.email,
        if active { "active" } else { "inactive" }
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inspire_store=info,inspire_api=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    if let Some(url) = cli.database_url {
        config.database.url = Some(url);
    }

    match cli.command {
        Commands::Migrate => {
            open_pool(&config).await?;
            println!("Migrations applied");
        }
        Commands::CreateAccount {
            email,
            password,
            firstname,
            lastname,
            username,
        } => {
            let accounts = account_service(&config, open_pool(&config).await?)?;
            let account = accounts
                .register(RegisterRequest {
                    email,
                    password,
                    firstname,
                    lastname,
                    username,
                })
                .await?;
            println!("Created account {} ({})", account.id, account.email);
        }
        Commands::Activate { email } => set_active(&config, &email, true).await?,
        Commands::Deactivate { email } => set_active(&config, &email, false).await?,
        Commands::PruneSessions => {
            let registry = PgSessionRegistry::new(open_pool(&config).await?);
            let pruned = registry.prune_expired(Utc::now()).await?;
            println!("Pruned {pruned} expired sessions");
        }
    }

    Ok(())
}
