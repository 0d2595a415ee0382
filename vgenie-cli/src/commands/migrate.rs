//! Migrate command - apply the PostgreSQL schema

use anyhow::{Context, Result};
use clap::Parser;
use vgenie_core::GenieConfig;
use vgenie_server::db::{connect_with_retry, migrations};
use vgenie_server::store::Backoff;

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Database URL (overrides config and DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,
}

pub async fn run_migrate(args: MigrateArgs, config: GenieConfig) -> Result<()> {
    let url = args
        .database_url
        .or(config.database.url)
        .context("DATABASE_URL not set. Set via --database-url, DATABASE_URL env, or the config file")?;

    let backoff = Backoff::with_attempts(config.database.connect_attempts);
    let pool = connect_with_retry(&url, 1, backoff)
        .await
        .context("Failed to connect to database")?;
    migrations::run(&pool).await.context("Migration failed")?;

    println!("✅ Schema is up to date ({} statements applied)", migrations::STATEMENTS.len());
    Ok(())
}
