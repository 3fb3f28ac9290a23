//! Click statistics
//!
//! Prints aggregate numbers for a click log: totals, per-page averages,
//! page size ranges and the most common resolution.
//!
//! Usage:
//!   cargo run --bin click-stats
//!   cargo run --bin click-stats -- --clicks data/clicks.json

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use clickmap::constants::DEFAULT_CLICKS_FILE;
use clickmap::{ClickStats, load_clicks};

#[derive(Parser, Debug)]
#[command(name = "click-stats", about = "Summarize a click log")]
struct Cli {
    /// Click records (JSON array)
    #[arg(long, default_value = DEFAULT_CLICKS_FILE)]
    clicks: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let records = load_clicks(&cli.clicks)
        .with_context(|| format!("reading clicks from {}", cli.clicks.display()))?;

    let stats = ClickStats::compute(&records);
    println!("{}", stats);
    Ok(())
}
