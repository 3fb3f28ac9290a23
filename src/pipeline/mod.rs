//! Heatmap pipeline - grouping, cache decisions, per-page rendering
//!
//! Pages are independent: each one is mapped, splatted, colored and
//! composited on its own worker. The cache store is written once, after
//! every page has finished.

pub mod config;
pub mod report;
pub mod runner;

#[cfg(test)]
mod tests;

pub use config::RenderConfig;
pub use report::{PageOutcome, PageResult, PageStats, RunReport};
pub use runner::{HeatmapPipeline, render_page};
