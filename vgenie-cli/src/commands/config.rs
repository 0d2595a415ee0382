//! Config command - inspect the effective configuration

use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use vgenie_core::GenieConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML, secrets masked
    Show,
    /// Print the default config file path
    Path,
}

pub fn run_config(args: ConfigArgs, path: Option<&Path>) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            let config = crate::load_config(path)?;
            print!("{}", config.redacted().to_toml()?);
        }
        ConfigCommands::Path => {
            let default_path = GenieConfig::default_path();
            let status = if default_path.exists() { "exists" } else { "not found" };
            println!("{} ({})", default_path.display(), status);
        }
    }
    Ok(())
}
