//! vgenie CLI - ValuationGenie operator tool
//!
//! - `serve`: run the HTTP API
//! - `migrate`: create or update the PostgreSQL schema
//! - `estimate`: compute a valuation range offline
//! - `industries`: print the industry multiple table
//! - `admin create`: add a back-office account
//! - `config show`: print the effective configuration with secrets masked

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use vgenie_core::GenieConfig;

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "vgenie",
    author,
    version,
    about = "ValuationGenie backend: API server, migrations and offline valuations"
)]
struct Cli {
    /// Config file (default: $VGENIE_CONFIG or ~/.vgenie/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Debug logging unless RUST_LOG is set
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces over OTLP (needs the telemetry feature)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Apply the database schema
    Migrate(commands::migrate::MigrateArgs),
    /// Compute a valuation range from the command line
    Estimate(commands::estimate::EstimateArgs),
    /// Print the industry multiple table
    Industries(commands::industries::IndustriesArgs),
    /// Back-office account management
    Admin(commands::admin::AdminArgs),
    /// Inspect configuration
    Config(commands::config::ConfigArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Load configuration for commands that need it
pub(crate) fn load_config(path: Option<&std::path::Path>) -> Result<GenieConfig> {
    GenieConfig::load(path).context("failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real environment variables win
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let tracing_config = tracing_setup::TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    };
    tracing_setup::init(&tracing_config).ok();

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Serve(args) => commands::run_serve(args, load_config(config_path)?).await,
        Commands::Migrate(args) => commands::run_migrate(args, load_config(config_path)?).await,
        Commands::Estimate(args) => commands::run_estimate(args),
        Commands::Industries(args) => commands::run_industries(args),
        Commands::Admin(args) => commands::run_admin(args, load_config(config_path)?).await,
        Commands::Config(args) => commands::run_config(args, config_path),
        Commands::Completions(args) => run_completions(args),
    };

    tracing_setup::shutdown_otel();
    result
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());
    Ok(())
}
