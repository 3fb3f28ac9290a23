//! Click input: loading, per-page grouping and aggregate statistics

mod record;
mod stats;

pub use record::{ClickRecord, PageClicks, group_by_page, load_clicks, parse_clicks};
pub use stats::ClickStats;
