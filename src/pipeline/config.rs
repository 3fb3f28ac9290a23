//! Run configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::FingerprintMode;
use crate::constants::{
    DEFAULT_CACHE_FILE, DEFAULT_CLICKS_FILE, DEFAULT_CLUSTER_RESOLUTION, DEFAULT_OUTPUT_DIR,
    DEFAULT_SCREENSHOTS_DIR, DEFAULT_WINDOW, SETTINGS_FILE,
};
use crate::error::{Error, Result};
use crate::render::FieldStrategy;

/// Everything a heatmap run needs: where things live and how to render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Click record collection (JSON array)
    pub clicks: PathBuf,
    /// Root of the captured base screenshots
    pub screenshots: PathBuf,
    /// Root the rendered heatmaps are written under
    pub output: PathBuf,
    /// Fingerprint store
    pub cache: PathBuf,
    /// Most recent clicks per page to use (None or 0 = all)
    pub window: Option<usize>,
    /// Re-render every page even if its clicks are unchanged
    pub force: bool,
    /// Duplicate clustering bucket size in pixels (0 = exact coordinates)
    pub cluster_resolution: f64,
    pub field: FieldStrategy,
    pub fingerprint: FingerprintMode,
    /// Worker threads (0 = rayon default, 1 = sequential)
    pub threads: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clicks: PathBuf::from(DEFAULT_CLICKS_FILE),
            screenshots: PathBuf::from(DEFAULT_SCREENSHOTS_DIR),
            output: PathBuf::from(DEFAULT_OUTPUT_DIR),
            cache: PathBuf::from(DEFAULT_CACHE_FILE),
            window: Some(DEFAULT_WINDOW),
            force: false,
            cluster_resolution: DEFAULT_CLUSTER_RESOLUTION,
            field: FieldStrategy::Auto,
            fingerprint: FingerprintMode::Ordered,
            threads: 0,
        }
    }
}

impl RenderConfig {
    /// Load from a settings file; `.toml` files are TOML, anything else JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let config: Self = if is_toml {
            toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?
        } else {
            serde_json::from_str(&contents)
                .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Local settings file if present and valid, otherwise built-in defaults.
    pub fn from_config_files() -> Self {
        let path = Path::new(SETTINGS_FILE);
        if !path.exists() {
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(config) => {
                log::info!("Loaded settings from {}", SETTINGS_FILE);
                config
            }
            Err(e) => {
                log::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Window actually applied to each page
    pub fn effective_window(&self) -> Option<usize> {
        self.window.filter(|&n| n > 0)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.cluster_resolution.is_finite() || self.cluster_resolution < 0.0 {
            return Err(Error::Config(format!(
                "cluster_resolution must be a non-negative number, got {}",
                self.cluster_resolution
            )));
        }
        Ok(())
    }
}
