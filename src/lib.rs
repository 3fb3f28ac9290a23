//! clickmap - click-density heatmaps over captured page screenshots
//!
//! Turns logged click coordinates into a Gaussian density overlay per page,
//! composites it onto the page's base screenshot and remembers a fingerprint
//! of the clicks so unchanged pages are not re-rendered.

pub mod cache;
pub mod clicks;
pub mod constants;
pub mod error;
pub mod page;
pub mod pipeline;
pub mod render;

// Re-export commonly used types for convenience
pub use cache::{CacheEntry, ChangeSet, FingerprintMode, HeatmapCache, compute_fingerprint};
pub use clicks::{ClickRecord, ClickStats, PageClicks, group_by_page, load_clicks};
pub use error::{Error, Result};
pub use page::{PageLayout, sanitize_path_part};
pub use pipeline::{HeatmapPipeline, PageOutcome, PageStats, RenderConfig, RunReport};
pub use render::{ColorRamp, DensityField, FieldKind, FieldStrategy, GradientStop, MappedPoint};
