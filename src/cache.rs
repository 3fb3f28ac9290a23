//! Click fingerprints and the per-page render cache
//!
//! The cache maps each page address to the fingerprint of the clicks its
//! heatmap was last built from. A page whose fingerprint and window are
//! unchanged is skipped. The store is a pretty-printed JSON object that is
//! replaced as a whole at the end of every run.

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::clicks::ClickRecord;
use crate::error::{Error, Result};

/// How click tuples are folded into a fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintMode {
    /// Hash of the tuple sequence; reordering counts as a change
    #[default]
    Ordered,
    /// Commutative sum of per-tuple hashes; only the multiset matters
    Unordered,
}

impl FromStr for FingerprintMode {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "ordered" => Ok(FingerprintMode::Ordered),
            "unordered" => Ok(FingerprintMode::Unordered),
            other => Err(format!("unknown fingerprint mode '{}' (ordered|unordered)", other)),
        }
    }
}

fn hash_f64(hasher: &mut Sha256, value: f64) {
    // + 0.0 folds -0.0 into 0.0
    hasher.update((value + 0.0).to_bits().to_le_bytes());
}

fn digest_u64(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Fingerprint the (absX, absY, pageWidth, pageHeight) tuples of `records`.
///
/// Stable across processes and platforms, so stored fingerprints stay
/// comparable between builds.
pub fn compute_fingerprint(records: &[ClickRecord], mode: FingerprintMode) -> u64 {
    match mode {
        FingerprintMode::Ordered => {
            let mut hasher = Sha256::new();
            hasher.update((records.len() as u64).to_le_bytes());
            for record in records {
                for value in record.geometry() {
                    hash_f64(&mut hasher, value);
                }
            }
            digest_u64(hasher)
        }
        FingerprintMode::Unordered => records.iter().fold(0u64, |acc, record| {
            let mut hasher = Sha256::new();
            for value in record.geometry() {
                hash_f64(&mut hasher, value);
            }
            acc.wrapping_add(digest_u64(hasher))
        }),
    }
}

/// What the cache remembers about one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(alias = "click_hash", deserialize_with = "deserialize_fingerprint")]
    pub fingerprint: u64,
    /// Click window the fingerprint was taken over; None = all clicks
    #[serde(alias = "last_n_clicks", default)]
    pub window_size: Option<usize>,
    /// False when the last attempt to render this page failed
    #[serde(default = "default_rendered")]
    pub rendered: bool,
}

fn default_rendered() -> bool {
    true
}

/// Older stores wrote signed 64-bit hashes; negatives keep their bit pattern.
fn deserialize_fingerprint<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFingerprint {
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match RawFingerprint::deserialize(deserializer)? {
        RawFingerprint::Unsigned(value) => value,
        RawFingerprint::Signed(value) => value as u64,
    })
}

impl CacheEntry {
    pub fn new(fingerprint: u64, window_size: Option<usize>) -> Self {
        Self {
            fingerprint,
            window_size,
            rendered: true,
        }
    }

    /// Built from the same clicks and window, whether or not rendering succeeded
    pub fn same_inputs(&self, fingerprint: u64, window_size: Option<usize>) -> bool {
        self.fingerprint == fingerprint && self.window_size == window_size
    }

    pub fn fingerprint_hex(&self) -> String {
        hex::encode(self.fingerprint.to_be_bytes())
    }
}

/// Entries as found on disk; older stores kept a bare hash per page
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Entry(CacheEntry),
    Legacy(#[serde(deserialize_with = "deserialize_fingerprint")] u64),
}

impl From<StoredEntry> for CacheEntry {
    fn from(stored: StoredEntry) -> Self {
        match stored {
            StoredEntry::Entry(entry) => entry,
            StoredEntry::Legacy(fingerprint) => CacheEntry::new(fingerprint, None),
        }
    }
}

/// Pages that differ between the stored cache and the current clicks
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub new_pages: Vec<String>,
    pub changed_pages: Vec<String>,
    pub removed_pages: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.new_pages.is_empty() && self.changed_pages.is_empty() && self.removed_pages.is_empty()
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No new or changed pages detected.");
        }
        let sections = [
            ("New pages:", &self.new_pages),
            ("Changed pages:", &self.changed_pages),
            ("Removed pages:", &self.removed_pages),
        ];
        let mut first = true;
        for (title, pages) in sections {
            if pages.is_empty() {
                continue;
            }
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "{}", title)?;
            for page in pages {
                write!(f, "\n  {}", page)?;
            }
        }
        Ok(())
    }
}

/// Entries from the previous run
#[derive(Debug, Clone, Default)]
pub struct HeatmapCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl HeatmapCache {
    /// Read the store, falling back to an empty cache if it is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            log::info!("No cache at {}, rendering every page", path.display());
            return Self::empty(path);
        }
        match Self::try_load(path) {
            Ok(cache) => {
                log::debug!("Loaded {} cache entries from {}", cache.len(), path.display());
                cache
            }
            Err(err) => {
                log::warn!("{}; starting cold", err);
                Self::empty(path)
            }
        }
    }

    /// Read the store, reporting corruption instead of recovering from it.
    pub fn try_load(path: &Path) -> Result<Self> {
        let corrupt = |reason: String| Error::CacheCorruption {
            path: path.to_path_buf(),
            reason,
        };
        let contents = fs::read_to_string(path).map_err(|e| corrupt(e.to_string()))?;
        let stored: BTreeMap<String, StoredEntry> =
            serde_json::from_str(&contents).map_err(|e| corrupt(e.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            entries: stored
                .into_iter()
                .map(|(page, stored)| (page, CacheEntry::from(stored)))
                .collect(),
        })
    }

    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, page: &str) -> Option<&CacheEntry> {
        self.entries.get(page)
    }

    /// True only for an unchanged, previously rendered page when not forced.
    pub fn should_skip(
        &self,
        page: &str,
        fingerprint: u64,
        window_size: Option<usize>,
        force: bool,
    ) -> bool {
        if force {
            return false;
        }
        self.entries
            .get(page)
            .is_some_and(|entry| entry.rendered && entry.same_inputs(fingerprint, window_size))
    }

    /// Classify pages against the current fingerprints.
    pub fn diff(&self, current: &BTreeMap<String, CacheEntry>) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for (page, entry) in current {
            match self.entries.get(page) {
                None => changes.new_pages.push(page.clone()),
                Some(old)
                    if !old.rendered || !old.same_inputs(entry.fingerprint, entry.window_size) =>
                {
                    changes.changed_pages.push(page.clone())
                }
                _ => {}
            }
        }

        for page in self.entries.keys() {
            if !current.contains_key(page) {
                changes.removed_pages.push(page.clone());
            }
        }

        changes
    }

    /// Replace the store with exactly `entries`.
    ///
    /// Written to a sibling temp file first and renamed over the old store.
    pub fn persist(&self, entries: &BTreeMap<String, CacheEntry>) -> Result<()> {
        persist_entries(&self.path, entries)
    }
}

pub fn persist_entries(path: &Path, entries: &BTreeMap<String, CacheEntry>) -> Result<()> {
    let mut json = serde_json::to_string_pretty(entries)
        .map_err(|e| Error::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    json.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, json).map_err(|e| Error::io(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| Error::io(path, e))?;
    log::debug!("Saved {} cache entries to {}", entries.len(), path.display());
    Ok(())
}

/// Delete the store so the next run starts cold.
pub fn clear_cache(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::info!("Cleared heatmap cache {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}
