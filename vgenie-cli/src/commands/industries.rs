//! Industries command - print the multiple table

use anyhow::Result;
use clap::Parser;
use vgenie_core::industry::{industries, DEFAULT_MULTIPLE};
use vgenie_core::money::format_multiple;

#[derive(Parser, Debug)]
pub struct IndustriesArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run_industries(args: IndustriesArgs) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(industries())?);
        return Ok(());
    }

    let width = industries().iter().map(|i| i.key.len()).max().unwrap_or(0);
    for industry in industries() {
        println!(
            "{:<width$}  {:>5} - {:<5}  {}",
            industry.key,
            format_multiple(industry.multiple.low),
            format_multiple(industry.multiple.high),
            industry.label,
            width = width
        );
    }
    println!(
        "\nUnlisted industries use {} - {}",
        format_multiple(DEFAULT_MULTIPLE.low),
        format_multiple(DEFAULT_MULTIPLE.high)
    );
    Ok(())
}
