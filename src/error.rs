//! Error types for the heatmap pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering heatmaps
///
/// Only [`Error::Input`] aborts a run. Everything else is scoped to one
/// record or one page and reported alongside the pages that succeeded.
#[derive(Error, Debug)]
pub enum Error {
    /// Click record collection could not be read or parsed
    #[error("Invalid click input {}: {reason}", .path.display())]
    Input { path: PathBuf, reason: String },

    /// Click recorded with a zero page dimension
    #[error("Click has degenerate page size {width}x{height}")]
    DegenerateRecord { width: f64, height: f64 },

    /// No base image captured for a page
    #[error("Base image not found for {page}, expected at {}", .path.display())]
    Lookup { page: String, path: PathBuf },

    /// Page address could not be parsed into a path layout
    #[error("Invalid page address {page}: {reason}")]
    InvalidPage { page: String, reason: String },

    /// Stored cache could not be read back
    #[error("Cache store {} is corrupt: {reason}", .path.display())]
    CacheCorruption { path: PathBuf, reason: String },

    /// Image decode or encode failure
    #[error("Image error for {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Filesystem failure
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Error::Image {
            path: path.into(),
            source,
        }
    }

    /// Whether this error should stop the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Input { .. } | Error::Config(_))
    }
}
