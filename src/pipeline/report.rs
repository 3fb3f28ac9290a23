//! Per-page outcomes and the run summary

use chrono::{DateTime, Local};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheEntry;
use crate::error::Error;
use crate::render::FieldKind;

/// Numbers describing one rendered heatmap
#[derive(Debug, Clone, PartialEq)]
pub struct PageStats {
    /// Clicks in the window
    pub clicks: usize,
    /// Clicks dropped for degenerate page sizes
    pub dropped: usize,
    pub max_density: f64,
    /// Overlay pixels above the visibility floor
    pub drawn_pixels: usize,
    pub field: FieldKind,
    pub output: PathBuf,
}

#[derive(Debug)]
pub enum PageOutcome {
    Rendered(PageStats),
    /// Cache hit, nothing written
    Skipped,
    Failed(Error),
}

#[derive(Debug)]
pub struct PageResult {
    pub page: String,
    /// Entry written to the cache for this page
    pub entry: CacheEntry,
    pub outcome: PageOutcome,
}

/// Result of a full pipeline run, pages in input order
#[derive(Debug)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
    pub pages: Vec<PageResult>,
}

impl RunReport {
    pub fn rendered(&self) -> impl Iterator<Item = (&str, &PageStats)> {
        self.pages.iter().filter_map(|p| match &p.outcome {
            PageOutcome::Rendered(stats) => Some((p.page.as_str(), stats)),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.pages
            .iter()
            .filter(|p| matches!(p.outcome, PageOutcome::Skipped))
            .map(|p| p.page.as_str())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.pages.iter().filter_map(|p| match &p.outcome {
            PageOutcome::Failed(err) => Some((p.page.as_str(), err)),
            _ => None,
        })
    }

    pub fn page(&self, page: &str) -> Option<&PageResult> {
        self.pages.iter().find(|p| p.page == page)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Heatmap run started {}: {} pages, {} rendered, {} unchanged, {} failed in {:.2}s",
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            self.pages.len(),
            self.rendered().count(),
            self.skipped().count(),
            self.failed().count(),
            self.elapsed.as_secs_f64()
        )
    }
}
