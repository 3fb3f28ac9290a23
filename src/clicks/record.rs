//! Click records and per-page grouping

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// One logged click, as produced by log ingestion.
///
/// Unknown fields in the input are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickRecord {
    /// Address of the page the click happened on
    #[serde(rename = "url")]
    pub page: String,
    #[serde(rename = "absX")]
    pub abs_x: f64,
    #[serde(rename = "absY")]
    pub abs_y: f64,
    /// Page width at click time
    #[serde(rename = "pageWidth")]
    pub page_width: f64,
    /// Page height at click time
    #[serde(rename = "pageHeight")]
    pub page_height: f64,
}

impl ClickRecord {
    pub fn new(
        page: impl Into<String>,
        abs_x: f64,
        abs_y: f64,
        page_width: f64,
        page_height: f64,
    ) -> Self {
        Self {
            page: page.into(),
            abs_x,
            abs_y,
            page_width,
            page_height,
        }
    }

    /// The tuple that identifies this click for fingerprinting
    pub fn geometry(&self) -> [f64; 4] {
        [self.abs_x, self.abs_y, self.page_width, self.page_height]
    }
}

/// Load the click record collection from a JSON array file.
pub fn load_clicks(path: &Path) -> Result<Vec<ClickRecord>> {
    let contents = fs::read_to_string(path).map_err(|e| Error::Input {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_clicks(&contents).map_err(|reason| Error::Input {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parse a JSON array of click records.
pub fn parse_clicks(contents: &str) -> std::result::Result<Vec<ClickRecord>, String> {
    serde_json::from_str(contents).map_err(|e| e.to_string())
}

/// Clicks for one page, in input order
#[derive(Debug, Clone)]
pub struct PageClicks {
    pub page: String,
    pub records: Vec<ClickRecord>,
}

impl PageClicks {
    /// The most recent `window` records, or all of them when `window` is `None` or zero.
    pub fn windowed(&self, window: Option<usize>) -> &[ClickRecord] {
        match window {
            Some(n) if n > 0 && n < self.records.len() => &self.records[self.records.len() - n..],
            _ => &self.records,
        }
    }
}

/// Group clicks by page, keeping pages in order of first appearance.
pub fn group_by_page(records: &[ClickRecord]) -> Vec<PageClicks> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<PageClicks> = Vec::new();

    for record in records {
        match index.get(record.page.as_str()) {
            Some(&idx) => groups[idx].records.push(record.clone()),
            None => {
                index.insert(record.page.as_str(), groups.len());
                groups.push(PageClicks {
                    page: record.page.clone(),
                    records: vec![record.clone()],
                });
            }
        }
    }

    groups
}
