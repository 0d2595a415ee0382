//! Admin command - manage back-office accounts

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use vgenie_core::validation::{normalize_email, validate_password};
use vgenie_core::GenieConfig;
use vgenie_server::auth::PasswordHasher;
use vgenie_server::{open_store, Store, StoreMode};

#[derive(Parser, Debug)]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommands,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// Create an admin account
    Create(CreateArgs),
}

#[derive(Parser, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub email: String,

    /// Password (prefer the environment variable over the flag)
    #[arg(long, env = "VGENIE_ADMIN_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run_admin(args: AdminArgs, config: GenieConfig) -> Result<()> {
    match args.command {
        AdminCommands::Create(args) => run_create(args, config).await,
    }
}

async fn run_create(args: CreateArgs, mut config: GenieConfig) -> Result<()> {
    let email = normalize_email(&args.email)?;
    validate_password(&args.password)?;

    if config.database.url.is_none() {
        bail!("DATABASE_URL not set; admin accounts need the database");
    }
    // An in-memory account would vanish when this process exits
    config.database.memory_fallback = false;
    let store = open_store(&config.database)
        .await
        .context("Failed to open database")?;
    if store.mode() != StoreMode::Database {
        bail!("database unavailable");
    }

    let hash = PasswordHasher::default().hash(&args.password);
    let admin = store
        .create_admin(&email, &hash)
        .await
        .with_context(|| format!("Failed to create admin {}", email))?;

    println!("✅ Created admin {} ({})", admin.email, admin.id);
    Ok(())
}
