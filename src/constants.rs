//! Tunable constants for clickmap
//!
//! Splat geometry, color ramp thresholds and default file locations.

// =============================================================================
// SPLAT GEOMETRY
// =============================================================================

pub const BASE_SPLAT_RADIUS: f64 = 20.0; // Radius of an isolated click (pixels)
pub const MAX_SPLAT_RADIUS: f64 = 40.0; // Upper bound regardless of duplicates
pub const DUPLICATE_RADIUS_GAIN: f64 = 5.0; // Radius growth per sqrt(duplicate count)

/// Clustering resolution in pixels. 0 = only bit-identical coordinates count as duplicates.
pub const DEFAULT_CLUSTER_RESOLUTION: f64 = 0.0;

/// Rows per band when splatting a dense field in parallel
pub const SPLAT_BAND_ROWS: usize = 32;

/// Auto field selection goes sparse when the worst-case splat area is below
/// pixels / SPARSE_AREA_DIVISOR.
pub const SPARSE_AREA_DIVISOR: u64 = 4;

// =============================================================================
// COLOR RAMP
// =============================================================================

pub const VISIBILITY_FLOOR: f64 = 0.1; // Densities below this are not drawn
pub const SINGLE_CLICK_DENSITY: f64 = 1.0; // At or below: fixed "isolated click" color

pub const SINGLE_CLICK_ALPHA: u8 = 160;
pub const LOW_BAND_ALPHA: u8 = 180;
pub const HIGH_BAND_ALPHA: u8 = 200;

pub const COLOR_BLUE: [u8; 3] = [0, 0, 255];
pub const COLOR_VIOLET: [u8; 3] = [255, 0, 255];
pub const COLOR_RED: [u8; 3] = [255, 0, 0];

// =============================================================================
// RUN DEFAULTS
// =============================================================================

/// Most recent clicks per page used for fingerprinting and rendering
pub const DEFAULT_WINDOW: usize = 100;

pub const DEFAULT_CLICKS_FILE: &str = "clicks.json";
pub const DEFAULT_SCREENSHOTS_DIR: &str = "webpages/screenshots";
pub const DEFAULT_OUTPUT_DIR: &str = "heatmaps";
pub const DEFAULT_CACHE_FILE: &str = "heatmap_cache.json";

/// Local settings file picked up when no --config is given
pub const SETTINGS_FILE: &str = "config/clickmap_settings.json";

/// File stem used when a page address has no path segments
pub const INDEX_FILE_STEM: &str = "index";
