//! Aggregate statistics over a click collection

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::record::ClickRecord;

/// Summary numbers shown next to the rendered heatmaps
#[derive(Debug, Clone, PartialEq)]
pub struct ClickStats {
    pub total_clicks: usize,
    pub unique_pages: usize,
    pub avg_clicks_per_page: f64,
    /// Mean (absX, absY)
    pub avg_position: (f64, f64),
    /// (min, max) page width, None for an empty collection
    pub page_width_range: Option<(f64, f64)>,
    pub page_height_range: Option<(f64, f64)>,
    /// Most frequent "W/H" page size
    pub most_common_resolution: Option<String>,
}

impl ClickStats {
    pub fn compute(records: &[ClickRecord]) -> Self {
        let total_clicks = records.len();
        let unique_pages = records
            .iter()
            .map(|r| r.page.as_str())
            .collect::<HashSet<_>>()
            .len();

        let avg_clicks_per_page = if unique_pages > 0 {
            total_clicks as f64 / unique_pages as f64
        } else {
            0.0
        };

        let avg_position = if total_clicks > 0 {
            let n = total_clicks as f64;
            (
                records.iter().map(|r| r.abs_x).sum::<f64>() / n,
                records.iter().map(|r| r.abs_y).sum::<f64>() / n,
            )
        } else {
            (0.0, 0.0)
        };

        Self {
            total_clicks,
            unique_pages,
            avg_clicks_per_page,
            avg_position,
            page_width_range: min_max(records.iter().map(|r| r.page_width)),
            page_height_range: min_max(records.iter().map(|r| r.page_height)),
            most_common_resolution: most_common_resolution(records),
        }
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Ties go to the resolution seen first.
fn most_common_resolution(records: &[ClickRecord]) -> Option<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (order, record) in records.iter().enumerate() {
        let key = format!("{}/{}", record.page_width, record.page_height);
        counts.entry(key).or_insert((0, order)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(key, _)| key)
}

impl fmt::Display for ClickStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let range = |r: Option<(f64, f64)>| match r {
            Some((lo, hi)) => format!("min = {}, max = {}", lo, hi),
            None => "min = N/A, max = N/A".to_string(),
        };
        writeln!(f, "Total clicks: {}", self.total_clicks)?;
        writeln!(f, "Unique pages: {}", self.unique_pages)?;
        writeln!(f, "Average clicks per page: {:.2}", self.avg_clicks_per_page)?;
        writeln!(
            f,
            "Average click position (absX, absY): ({:.1}, {:.1})",
            self.avg_position.0, self.avg_position.1
        )?;
        writeln!(f, "Page width: {}", range(self.page_width_range))?;
        writeln!(f, "Page height: {}", range(self.page_height_range))?;
        write!(
            f,
            "Most common resolution (W/H): {}",
            self.most_common_resolution.as_deref().unwrap_or("N/A")
        )
    }
}
