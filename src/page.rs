//! Page identity to file layout
//!
//! Base screenshots and rendered heatmaps share one directory layout derived
//! from the page address:
//!
//! ```text
//! https://example.com/course/view.php?id=3
//!   -> example_com/course/view_php_id_3.png
//! ```

use std::path::{Path, PathBuf};

use crate::constants::INDEX_FILE_STEM;
use crate::error::{Error, Result};

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_path_part(part: &str) -> String {
    part.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// Raw components of a page address, split without any normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AddressParts<'a> {
    netloc: &'a str,
    path: &'a str,
    query: &'a str,
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Split `scheme://netloc/path;params?query#fragment` the way the capture
/// component does: host case, default ports, escapes and `..` are kept as written.
fn split_address(address: &str) -> AddressParts<'_> {
    let mut rest = address;
    if let Some((_, after)) = rest.split_once(':').filter(|(scheme, _)| is_scheme(scheme)) {
        rest = after;
    }

    let mut netloc = "";
    if let Some(after) = rest.strip_prefix("//") {
        let end = after.find(['/', '?', '#']).unwrap_or(after.len());
        netloc = &after[..end];
        rest = &after[end..];
    }

    let rest = rest.split_once('#').map_or(rest, |(head, _)| head);
    let (mut path, query) = rest.split_once('?').unwrap_or((rest, ""));

    // `;params` only attach to the last segment
    let last_start = path.rfind('/').map_or(0, |i| i + 1);
    if let Some(semi) = path[last_start..].find(';') {
        path = &path[..last_start + semi];
    }

    AddressParts {
        netloc,
        path,
        query,
    }
}

/// Relative location of a page's image under a screenshots or output root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    /// Sanitized netloc first (when present), then every path segment but the last
    dirs: Vec<String>,
    file_name: String,
}

impl PageLayout {
    pub fn from_address(page: &str) -> Result<Self> {
        if page.trim().is_empty() {
            return Err(Error::InvalidPage {
                page: page.to_string(),
                reason: "empty page address".to_string(),
            });
        }
        let parts = split_address(page);

        let mut dirs = Vec::new();
        if !parts.netloc.is_empty() {
            dirs.push(sanitize_path_part(parts.netloc));
        }
        let mut segments: Vec<String> = parts
            .path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(sanitize_path_part)
            .collect();

        let stem = segments.pop().unwrap_or_else(|| INDEX_FILE_STEM.to_string());
        dirs.extend(segments);

        let file_name = if parts.query.is_empty() {
            format!("{}.png", stem)
        } else {
            format!("{}_{}.png", stem, sanitize_path_part(parts.query))
        };

        Ok(Self { dirs, file_name })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.dirs.iter().collect();
        path.push(&self.file_name);
        path
    }

    /// Where the capture component stores this page's screenshot
    pub fn base_image_path(&self, screenshots_root: &Path) -> PathBuf {
        screenshots_root.join(self.relative_path())
    }

    /// Where the rendered heatmap for this page goes
    pub fn output_path(&self, output_root: &Path) -> PathBuf {
        output_root.join(self.relative_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_path_part("view.php"), "view_php");
        assert_eq!(sanitize_path_part("id=3&x=y"), "id_3_x_y");
        assert_eq!(sanitize_path_part("keep-this_one"), "keep-this_one");
    }

    #[test]
    fn test_root_page_is_index() {
        let layout = PageLayout::from_address("https://example.com/").unwrap();
        assert_eq!(layout.relative_path(), Path::new("example_com").join("index.png"));
    }

    #[test]
    fn test_nested_path_with_query() {
        let layout = PageLayout::from_address("https://example.com/a/b.php?id=3&x=y").unwrap();
        assert_eq!(
            layout.relative_path(),
            Path::new("example_com").join("a").join("b_php_id_3_x_y.png")
        );
    }

    #[test]
    fn test_port_and_trailing_slash() {
        let layout = PageLayout::from_address("http://192.168.1.102:8080/moodle/course/").unwrap();
        assert_eq!(
            layout.relative_path(),
            Path::new("192_168_1_102_8080").join("moodle").join("course.png")
        );
    }

    #[test]
    fn test_empty_query_has_no_suffix() {
        let layout = PageLayout::from_address("https://example.com/page?").unwrap();
        assert_eq!(layout.file_name(), "page.png");
    }

    #[test]
    fn test_roots_share_layout() {
        let layout = PageLayout::from_address("https://example.com/x").unwrap();
        let base = layout.base_image_path(Path::new("shots"));
        let out = layout.output_path(Path::new("heatmaps"));
        assert_eq!(base.strip_prefix("shots").unwrap(), out.strip_prefix("heatmaps").unwrap());
    }

    #[test]
    fn test_empty_address_rejected() {
        let err = PageLayout::from_address("  ").unwrap_err();
        assert!(matches!(err, Error::InvalidPage { .. }));
    }

    #[test]
    fn test_default_port_kept() {
        let layout = PageLayout::from_address("http://192.168.1.102:80/moodle/course/").unwrap();
        assert_eq!(
            layout.relative_path(),
            Path::new("192_168_1_102_80").join("moodle").join("course.png")
        );
    }

    #[test]
    fn test_host_case_and_non_ascii_kept_raw() {
        let layout = PageLayout::from_address("http://LMS.Example/Курс").unwrap();
        assert_eq!(layout.relative_path(), Path::new("LMS_Example").join("____.png"));
    }

    #[test]
    fn test_dot_segments_not_resolved() {
        let layout = PageLayout::from_address("http://lms.test/a/../b").unwrap();
        assert_eq!(
            layout.relative_path(),
            Path::new("lms_test").join("a").join("__").join("b.png")
        );
    }

    #[test]
    fn test_fragment_and_params_dropped() {
        let layout =
            PageLayout::from_address("https://lms.test/a/page;jsessionid=1?id=2#top").unwrap();
        assert_eq!(
            layout.relative_path(),
            Path::new("lms_test").join("a").join("page_id_2.png")
        );
    }

    #[test]
    fn test_relative_address() {
        let layout = PageLayout::from_address("course/view.php?id=3").unwrap();
        assert_eq!(layout.relative_path(), Path::new("course").join("view_php_id_3.png"));
    }

    #[test]
    fn test_split_address() {
        assert_eq!(
            split_address("https://h:1/p/q?x=1#f"),
            AddressParts {
                netloc: "h:1",
                path: "/p/q",
                query: "x=1",
            }
        );
        assert_eq!(split_address("https://h?x").path, "");
        assert_eq!(split_address("mailto:x@y").path, "x@y");
    }
}
