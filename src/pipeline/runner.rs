//! Heatmap pipeline orchestration
//!
//! Groups clicks by page, consults the cache, renders every changed page in
//! parallel and persists the new cache once all pages are done.

use chrono::Local;
use image::RgbaImage;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::Instant;

use super::config::RenderConfig;
use super::report::{PageOutcome, PageResult, PageStats, RunReport};
use crate::cache::{self, CacheEntry, ChangeSet, HeatmapCache, compute_fingerprint};
use crate::clicks::{ClickRecord, PageClicks, group_by_page, load_clicks};
use crate::error::{Error, Result};
use crate::page::PageLayout;
use crate::render::{
    ColorRamp, build_density, composite_over, load_base_image, map_clicks, paint_overlay,
    save_heatmap,
};

/// Render `records` over `base`, returning the composited image and its stats.
///
/// The returned stats carry an empty output path; the caller fills it in.
pub fn render_page(
    records: &[ClickRecord],
    mut base: RgbaImage,
    config: &RenderConfig,
    ramp: &ColorRamp,
) -> (RgbaImage, PageStats) {
    let (width, height) = base.dimensions();
    let (points, dropped) = map_clicks(records, width, height);

    let field = build_density(&points, width, height, config.cluster_resolution, config.field);
    let (overlay, drawn_pixels) = paint_overlay(field.as_ref(), ramp);
    composite_over(&mut base, &overlay);

    let stats = PageStats {
        clicks: records.len(),
        dropped,
        max_density: field.max_density(),
        drawn_pixels,
        field: field.kind(),
        output: Default::default(),
    };
    (base, stats)
}

pub struct HeatmapPipeline {
    config: RenderConfig,
    ramp: ColorRamp,
}

impl HeatmapPipeline {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            ramp: ColorRamp::default(),
        }
    }

    pub fn with_ramp(mut self, ramp: ColorRamp) -> Self {
        self.ramp = ramp;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Load the configured click file and run.
    pub fn run(&self) -> Result<RunReport> {
        let records = load_clicks(&self.config.clicks)?;
        self.run_records(&records)
    }

    /// Run over an already loaded click collection.
    pub fn run_records(&self, records: &[ClickRecord]) -> Result<RunReport> {
        self.config.validate()?;
        let started_at = Local::now();
        let timer = Instant::now();

        let pages = group_by_page(records);
        log::info!(
            "Found clicks for {} pages ({} records)",
            pages.len(),
            records.len()
        );

        let cache = HeatmapCache::load(&self.config.cache);
        let results = self.process_all(&pages, &cache)?;

        // Every worker is done; this is the only cache write of the run
        let entries: BTreeMap<String, CacheEntry> = results
            .iter()
            .map(|result| (result.page.clone(), result.entry))
            .collect();
        cache.persist(&entries)?;

        let report = RunReport {
            started_at,
            elapsed: timer.elapsed(),
            pages: results,
        };
        log::info!("{}", report);
        Ok(report)
    }

    /// Compare current fingerprints with the cache without rendering anything.
    pub fn check(&self) -> Result<ChangeSet> {
        let records = load_clicks(&self.config.clicks)?;
        let cache = HeatmapCache::load(&self.config.cache);
        let current: BTreeMap<String, CacheEntry> = group_by_page(&records)
            .iter()
            .map(|page| (page.page.clone(), self.entry_for(page)))
            .collect();
        Ok(cache.diff(&current))
    }

    /// Drop the cache store so the next run renders every page.
    pub fn clear_cache(&self) -> Result<()> {
        cache::clear_cache(&self.config.cache)
    }

    fn process_all(&self, pages: &[PageClicks], cache: &HeatmapCache) -> Result<Vec<PageResult>> {
        self.in_pool(|| {
            if self.config.threads == 1 {
                pages.iter().map(|page| self.process_page(page, cache)).collect()
            } else {
                pages
                    .par_iter()
                    .map(|page| self.process_page(page, cache))
                    .collect()
            }
        })
    }

    /// Run `op` on the configured pool. Splatting inside `op` shares that
    /// pool, so `threads = 1` keeps the whole run on a single thread.
    fn in_pool<R: Send>(&self, op: impl FnOnce() -> R + Send) -> Result<R> {
        if self.config.threads == 0 {
            return Ok(op());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build thread pool: {}", e)))?;
        Ok(pool.install(op))
    }

    fn entry_for(&self, page: &PageClicks) -> CacheEntry {
        let window = self.config.effective_window();
        let records = page.windowed(window);
        CacheEntry::new(compute_fingerprint(records, self.config.fingerprint), window)
    }

    fn process_page(&self, page: &PageClicks, cache: &HeatmapCache) -> PageResult {
        let mut entry = self.entry_for(page);

        if cache.should_skip(&page.page, entry.fingerprint, entry.window_size, self.config.force) {
            log::debug!(
                "Skipping {}: clicks unchanged (fingerprint {})",
                page.page,
                entry.fingerprint_hex()
            );
            return PageResult {
                page: page.page.clone(),
                entry,
                outcome: PageOutcome::Skipped,
            };
        }

        let records = page.windowed(entry.window_size);
        let outcome = match self.render_to_disk(&page.page, records) {
            Ok(stats) => {
                log::info!(
                    "Heatmap saved: {} ({} clicks, max density {:.2}, {} field, fingerprint {})",
                    stats.output.display(),
                    stats.clicks,
                    stats.max_density,
                    stats.field,
                    entry.fingerprint_hex()
                );
                PageOutcome::Rendered(stats)
            }
            Err(err) => {
                log::warn!("Skipping {}: {}", page.page, err);
                entry.rendered = false;
                PageOutcome::Failed(err)
            }
        };

        PageResult {
            page: page.page.clone(),
            entry,
            outcome,
        }
    }

    fn render_to_disk(&self, page: &str, records: &[ClickRecord]) -> Result<PageStats> {
        let layout = PageLayout::from_address(page)?;
        let base_path = layout.base_image_path(&self.config.screenshots);
        if !base_path.is_file() {
            return Err(Error::Lookup {
                page: page.to_string(),
                path: base_path,
            });
        }

        let base = load_base_image(&base_path)?;
        log::debug!(
            "Rendering {} clicks for {} over {}x{} base",
            records.len(),
            page,
            base.width(),
            base.height()
        );
        let (img, mut stats) = render_page(records, base, &self.config, &self.ramp);

        let output_path = layout.output_path(&self.config.output);
        save_heatmap(&img, &output_path)?;
        stats.output = output_path;
        Ok(stats)
    }
}
