//! Click heatmap renderer
//!
//! Renders one heatmap per page from the click log, over the page's captured
//! screenshot. Pages whose clicks did not change since the last run are
//! skipped unless --force is given.
//!
//! Usage:
//!   cargo run                         # Defaults / config/clickmap_settings.json
//!   cargo run -- --window 500         # Use each page's 500 most recent clicks
//!   cargo run -- --window 0 --force   # All clicks, re-render everything
//!   cargo run -- --check              # List new/changed/removed pages only
//!   cargo run -- --refresh            # Drop the cache, then render
//!   cargo run -- --config settings.toml --threads 1
//!
//! Outputs land under heatmaps/ mirroring webpages/screenshots/:
//!   heatmaps/<host>/<path dirs>/<last segment>[_<query>].png

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use clickmap::{FieldStrategy, FingerprintMode, HeatmapPipeline, RenderConfig};

#[derive(Parser, Debug)]
#[command(name = "clickmap", about = "Render click-density heatmaps over page screenshots")]
struct Cli {
    /// Settings file (JSON, or TOML by extension)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Click records (JSON array)
    #[arg(long)]
    clicks: Option<PathBuf>,

    /// Root of the captured base screenshots
    #[arg(long)]
    screenshots: Option<PathBuf>,

    /// Output root for rendered heatmaps
    #[arg(long)]
    output: Option<PathBuf>,

    /// Fingerprint cache file
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Most recent clicks per page to use (0 = all)
    #[arg(long)]
    window: Option<usize>,

    /// Re-render every page even if its clicks are unchanged
    #[arg(long)]
    force: bool,

    /// Only report which pages changed since the last run
    #[arg(long)]
    check: bool,

    /// Delete the cache before running
    #[arg(long)]
    refresh: bool,

    /// Worker threads (0 = all cores, 1 = sequential)
    #[arg(long)]
    threads: Option<usize>,

    /// Duplicate clustering bucket size in pixels (0 = exact coordinates)
    #[arg(long)]
    cluster: Option<f64>,

    /// Density accumulator: auto, dense or sparse
    #[arg(long)]
    field: Option<FieldStrategy>,

    /// Fingerprint mode: ordered or unordered
    #[arg(long)]
    fingerprint: Option<FingerprintMode>,
}

impl Cli {
    fn into_config(self) -> Result<(RenderConfig, bool, bool)> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::from_file(path)
                .with_context(|| format!("loading settings {}", path.display()))?,
            None => RenderConfig::from_config_files(),
        };

        if let Some(clicks) = self.clicks {
            config.clicks = clicks;
        }
        if let Some(screenshots) = self.screenshots {
            config.screenshots = screenshots;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(cache) = self.cache {
            config.cache = cache;
        }
        if let Some(window) = self.window {
            config.window = Some(window);
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(cluster) = self.cluster {
            config.cluster_resolution = cluster;
        }
        if let Some(field) = self.field {
            config.field = field;
        }
        if let Some(fingerprint) = self.fingerprint {
            config.fingerprint = fingerprint;
        }
        config.force |= self.force;

        config.validate()?;
        Ok((config, self.check, self.refresh))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (config, check, refresh) = Cli::parse().into_config()?;
    let pipeline = HeatmapPipeline::new(config);

    if check {
        let changes = pipeline.check().context("checking click fingerprints")?;
        println!("{}", changes);
        return Ok(());
    }

    if refresh {
        pipeline.clear_cache()?;
    }

    let config = pipeline.config();
    log::info!(
        "Rendering {} over {} into {}",
        config.clicks.display(),
        config.screenshots.display(),
        config.output.display()
    );

    let report = pipeline.run().context("rendering heatmaps")?;
    for (page, err) in report.failed() {
        eprintln!("Failed: {} ({})", page, err);
    }
    println!("{}", report);
    Ok(())
}
