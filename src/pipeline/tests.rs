use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::{
    ClickRecord, ColorRamp, Error, FingerprintMode, GradientStop, HeatmapCache, HeatmapPipeline,
    PageLayout, PageOutcome, RenderConfig, compute_fingerprint,
};

const PAGE_A: &str = "https://lms.test/course/view.php?id=3";
const PAGE_B: &str = "https://lms.test/";
const PAGE_MISSING: &str = "https://lms.test/grades/report";

struct Workspace {
    root: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let root = std::env::temp_dir().join(format!("clickmap-test-{}", Uuid::new_v4()));
        fs::create_dir_all(&root).unwrap();
        Self { root }
    }

    fn config(&self) -> RenderConfig {
        RenderConfig {
            clicks: self.root.join("clicks.json"),
            screenshots: self.root.join("screenshots"),
            output: self.root.join("heatmaps"),
            cache: self.root.join("heatmap_cache.json"),
            ..RenderConfig::default()
        }
    }

    fn add_screenshot(&self, page: &str, width: u32, height: u32) -> RgbaImage {
        let layout = PageLayout::from_address(page).unwrap();
        let path = layout.base_image_path(&self.root.join("screenshots"));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        img.save(&path).unwrap();
        img
    }

    fn write_clicks(&self, records: &[ClickRecord]) {
        fs::write(
            self.root.join("clicks.json"),
            serde_json::to_string_pretty(records).unwrap(),
        )
        .unwrap();
    }

    fn output_path(&self, page: &str) -> PathBuf {
        PageLayout::from_address(page)
            .unwrap()
            .output_path(&self.root.join("heatmaps"))
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn click(page: &str, x: f64, y: f64) -> ClickRecord {
    ClickRecord::new(page, x, y, 100.0, 100.0)
}

fn sample_clicks() -> Vec<ClickRecord> {
    vec![
        click(PAGE_A, 50.0, 50.0),
        click(PAGE_B, 10.0, 10.0),
        click(PAGE_A, 50.0, 50.0),
        click(PAGE_MISSING, 20.0, 20.0),
        click(PAGE_A, 25.0, 75.0),
        click(PAGE_B, 90.0, 10.0),
    ]
}

fn read_image(path: &Path) -> RgbaImage {
    image::open(path).unwrap().to_rgba8()
}

#[test]
fn test_missing_screenshot_skips_only_that_page() {
    let ws = Workspace::new();
    ws.add_screenshot(PAGE_A, 120, 90);
    ws.add_screenshot(PAGE_B, 64, 64);
    ws.write_clicks(&sample_clicks());

    let report = HeatmapPipeline::new(ws.config()).run().unwrap();

    assert_eq!(report.pages.len(), 3);
    assert_eq!(report.rendered().count(), 2);
    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, PAGE_MISSING);
    assert!(matches!(failed[0].1, Error::Lookup { .. }));

    assert!(ws.output_path(PAGE_A).is_file());
    assert!(ws.output_path(PAGE_B).is_file());
    assert!(!ws.output_path(PAGE_MISSING).exists());

    // Pages come back in first-appearance order
    let order: Vec<_> = report.pages.iter().map(|p| p.page.as_str()).collect();
    assert_eq!(order, vec![PAGE_A, PAGE_B, PAGE_MISSING]);

    let missing = report.page(PAGE_MISSING).unwrap();
    assert!(!missing.entry.rendered);

    let cache = HeatmapCache::try_load(&ws.config().cache).unwrap();
    assert_eq!(cache.len(), 3);
    assert!(cache.get(PAGE_A).unwrap().rendered);
    assert!(!cache.get(PAGE_MISSING).unwrap().rendered);
}

#[test]
fn test_unchanged_clicks_hit_the_cache() {
    let ws = Workspace::new();
    ws.add_screenshot(PAGE_A, 120, 90);
    ws.add_screenshot(PAGE_B, 64, 64);
    ws.write_clicks(&sample_clicks());
    let pipeline = HeatmapPipeline::new(ws.config());

    pipeline.run().unwrap();
    let cache_after_first = fs::read(&ws.config().cache).unwrap();

    // Remove an output: a cache hit must not write it again
    fs::remove_file(ws.output_path(PAGE_A)).unwrap();

    let second = pipeline.run().unwrap();
    let skipped: Vec<_> = second.skipped().collect();
    assert_eq!(skipped, vec![PAGE_A, PAGE_B]);
    assert_eq!(second.rendered().count(), 0);
    assert!(!ws.output_path(PAGE_A).exists());

    // The page that failed before is still attempted
    assert_eq!(second.failed().count(), 1);

    let cache_after_second = fs::read(&ws.config().cache).unwrap();
    assert_eq!(cache_after_first, cache_after_second);
}

#[test]
fn test_force_and_window_changes_rerender() {
    let ws = Workspace::new();
    ws.add_screenshot(PAGE_A, 120, 90);
    ws.add_screenshot(PAGE_B, 64, 64);
    ws.write_clicks(&sample_clicks());

    HeatmapPipeline::new(ws.config()).run().unwrap();

    let forced = HeatmapPipeline::new(RenderConfig {
        force: true,
        ..ws.config()
    })
    .run()
    .unwrap();
    assert_eq!(forced.rendered().count(), 2);
    assert_eq!(forced.skipped().count(), 0);

    // Window of 1 changes PAGE_A's (3 clicks) and PAGE_B's (2 clicks) fingerprints
    let windowed = HeatmapPipeline::new(RenderConfig {
        window: Some(1),
        ..ws.config()
    })
    .run()
    .unwrap();
    assert_eq!(windowed.rendered().count(), 2);
    let (_, stats) = windowed.rendered().find(|(page, _)| *page == PAGE_A).unwrap();
    assert_eq!(stats.clicks, 1);
}

#[test]
fn test_new_clicks_rerender_only_their_page() {
    let ws = Workspace::new();
    ws.add_screenshot(PAGE_A, 120, 90);
    ws.add_screenshot(PAGE_B, 64, 64);
    let mut clicks = sample_clicks();
    ws.write_clicks(&clicks);
    let pipeline = HeatmapPipeline::new(ws.config());
    pipeline.run().unwrap();

    clicks.push(click(PAGE_B, 40.0, 40.0));
    ws.write_clicks(&clicks);

    let changes = pipeline.check().unwrap();
    // The page without a screenshot never rendered, so it stays "changed"
    assert_eq!(
        changes.changed_pages,
        vec![PAGE_B.to_string(), PAGE_MISSING.to_string()]
    );
    assert!(changes.new_pages.is_empty());

    let report = pipeline.run().unwrap();
    let rendered: Vec<_> = report.rendered().map(|(page, _)| page).collect();
    assert_eq!(rendered, vec![PAGE_B]);
    assert_eq!(report.skipped().collect::<Vec<_>>(), vec![PAGE_A]);
}

#[test]
fn test_dropped_pages_leave_the_cache() {
    let ws = Workspace::new();
    ws.add_screenshot(PAGE_A, 120, 90);
    ws.add_screenshot(PAGE_B, 64, 64);
    ws.write_clicks(&sample_clicks());
    let pipeline = HeatmapPipeline::new(ws.config());
    pipeline.run().unwrap();

    ws.write_clicks(&[click(PAGE_A, 1.0, 1.0)]);
    let changes = pipeline.check().unwrap();
    assert_eq!(changes.removed_pages.len(), 2);

    pipeline.run().unwrap();
    let cache = HeatmapCache::try_load(&ws.config().cache).unwrap();
    assert_eq!(cache.len(), 1);
    assert!(cache.get(PAGE_B).is_none());
}

#[test]
fn test_resized_screenshot_maps_clicks() {
    let ws = Workspace::new();
    let base = ws.add_screenshot(PAGE_B, 200, 200);
    ws.write_clicks(&[click(PAGE_B, 50.0, 50.0)]);

    let report = HeatmapPipeline::new(ws.config()).run().unwrap();
    let (_, stats) = report.rendered().next().unwrap();
    assert_eq!(stats.max_density, 1.0);

    let out = read_image(&ws.output_path(PAGE_B));
    assert_eq!(out.dimensions(), (200, 200));
    // Peak at (100, 100): single-click blue blended over the base
    let peak = out.get_pixel(100, 100).0;
    let under = base.get_pixel(100, 100).0;
    assert!(peak[2] > under[2]);
    // Far corner untouched
    assert_eq!(out.get_pixel(0, 0), base.get_pixel(0, 0));
    assert_eq!(out.get_pixel(199, 0), base.get_pixel(199, 0));
}

#[test]
fn test_custom_ramp_colors_output() {
    let ws = Workspace::new();
    ws.add_screenshot(PAGE_B, 100, 100);
    ws.write_clicks(&[click(PAGE_B, 50.0, 50.0)]);
    let ramp = ColorRamp {
        single_click: None,
        ..ColorRamp::with_stops(vec![GradientStop::new(0.0, [0, 255, 0], 255)])
    };

    let report = HeatmapPipeline::new(ws.config()).with_ramp(ramp).run().unwrap();
    let result = report.page(PAGE_B).unwrap();
    assert!(matches!(result.outcome, PageOutcome::Rendered(_)));

    let out = read_image(&ws.output_path(PAGE_B));
    let center = out.get_pixel(50, 50).0;
    assert!(center[0] <= 1 && center[1] >= 254 && center[2] <= 1, "{:?}", center);
}

#[test]
fn test_corrupt_cache_is_a_cold_start() {
    let ws = Workspace::new();
    ws.add_screenshot(PAGE_B, 64, 64);
    ws.write_clicks(&[click(PAGE_B, 10.0, 10.0)]);
    fs::write(&ws.config().cache, "[[[ definitely not a cache").unwrap();

    let report = HeatmapPipeline::new(ws.config()).run().unwrap();
    assert_eq!(report.rendered().count(), 1);
    assert!(HeatmapCache::try_load(&ws.config().cache).is_ok());
}

#[test]
fn test_malformed_clicks_abort_the_run() {
    let ws = Workspace::new();
    fs::write(ws.root.join("clicks.json"), r#"[{"url": "https://x.test/"}]"#).unwrap();
    let err = HeatmapPipeline::new(ws.config()).run().unwrap_err();
    assert!(matches!(err, Error::Input { .. }));
    assert!(!ws.config().cache.exists());
}

#[test]
fn test_degenerate_clicks_are_dropped() {
    let ws = Workspace::new();
    ws.add_screenshot(PAGE_B, 64, 64);
    ws.write_clicks(&[
        ClickRecord::new(PAGE_B, 10.0, 10.0, 0.0, 100.0),
        click(PAGE_B, 30.0, 30.0),
    ]);
    let report = HeatmapPipeline::new(ws.config()).run().unwrap();
    let (_, stats) = report.rendered().next().unwrap();
    assert_eq!(stats.clicks, 2);
    assert_eq!(stats.dropped, 1);
}

#[test]
fn test_sequential_and_parallel_outputs_match() {
    let seq = Workspace::new();
    let par = Workspace::new();
    let mut clicks = sample_clicks();
    for i in 0..30 {
        clicks.push(click(PAGE_A, (i * 3) as f64, (i * 7 % 100) as f64));
    }
    for ws in [&seq, &par] {
        ws.add_screenshot(PAGE_A, 120, 90);
        ws.add_screenshot(PAGE_B, 64, 64);
        ws.write_clicks(&clicks);
    }

    HeatmapPipeline::new(RenderConfig {
        threads: 1,
        ..seq.config()
    })
    .run()
    .unwrap();
    HeatmapPipeline::new(RenderConfig {
        threads: 4,
        ..par.config()
    })
    .run()
    .unwrap();

    for page in [PAGE_A, PAGE_B] {
        assert_eq!(read_image(&seq.output_path(page)), read_image(&par.output_path(page)));
    }
    assert_eq!(
        fs::read(&seq.config().cache).unwrap(),
        fs::read(&par.config().cache).unwrap()
    );
}

#[test]
fn test_fingerprint_tracks_click_order() {
    let records: Vec<ClickRecord> = (0..20)
        .map(|i| click(PAGE_A, i as f64, (i * 2) as f64))
        .collect();
    let mut shuffled = records.clone();
    let mut rng = StdRng::seed_from_u64(7);
    while shuffled == records {
        shuffled.shuffle(&mut rng);
    }

    assert_ne!(
        compute_fingerprint(&records, FingerprintMode::Ordered),
        compute_fingerprint(&shuffled, FingerprintMode::Ordered)
    );
    assert_eq!(
        compute_fingerprint(&records, FingerprintMode::Unordered),
        compute_fingerprint(&shuffled, FingerprintMode::Unordered)
    );
}
