//! Serve command - run the ValuationGenie HTTP API

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use vgenie_core::GenieConfig;
use vgenie_server::{build_state, run_server};

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides config and VGENIE_BIND)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides config and DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Refuse to start without the database instead of using memory
    #[arg(long)]
    pub no_memory_fallback: bool,
}

/// Apply command-line overrides on top of the loaded configuration
fn apply_overrides(args: &ServeArgs, config: &mut GenieConfig) {
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if args.cors_permissive {
        config.server.cors_permissive = true;
    }
    if let Some(url) = &args.database_url {
        config.database.url = Some(url.clone());
    }
    if args.no_memory_fallback {
        config.database.memory_fallback = false;
    }
}

pub async fn run_serve(args: ServeArgs, mut config: GenieConfig) -> Result<()> {
    apply_overrides(&args, &mut config);
    tracing::info!(bind = %config.server.bind, "Starting ValuationGenie server");

    let state = build_state(config)
        .await
        .context("Failed to initialize server state")?;

    // Blocks until shutdown
    run_server(state).await.context("Server error")?;
    Ok(())
}
