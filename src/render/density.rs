//! Density field construction
//!
//! Every mapped click contributes a Gaussian splat whose radius grows with
//! the number of clicks sharing its spot:
//!
//! ```text
//! r      = min(BASE + GAIN * sqrt(duplicates), MAX)
//! weight = exp(-d^2 / (2 * (r/2)^2))      for d <= r
//! ```
//!
//! Two accumulators sit behind [`DensityField`]: a dense row-major grid and a
//! sparse cell map for large images with few clicks.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::mapping::MappedPoint;
use crate::constants::{
    BASE_SPLAT_RADIUS, DUPLICATE_RADIUS_GAIN, MAX_SPLAT_RADIUS, SPARSE_AREA_DIVISOR,
    SPLAT_BAND_ROWS,
};

/// Splat radius for a point shared by `duplicates` clicks (including itself)
pub fn splat_radius(duplicates: usize) -> f64 {
    (BASE_SPLAT_RADIUS + DUPLICATE_RADIUS_GAIN * (duplicates as f64).sqrt()).min(MAX_SPLAT_RADIUS)
}

/// Count, for every point, how many points fall in the same cluster.
///
/// With `resolution <= 0` only bit-identical coordinates cluster together.
/// Otherwise points are bucketed into `resolution`-sized squares first.
pub fn duplicate_counts(points: &[MappedPoint], resolution: f64) -> Vec<usize> {
    let keys: Vec<(i64, i64)> = points.iter().map(|p| cluster_key(p, resolution)).collect();

    let mut counts: HashMap<(i64, i64), usize> = HashMap::with_capacity(keys.len());
    for key in &keys {
        *counts.entry(*key).or_insert(0) += 1;
    }

    keys.iter().map(|key| counts[key]).collect()
}

fn cluster_key(point: &MappedPoint, resolution: f64) -> (i64, i64) {
    if resolution > 0.0 {
        (
            (point.x / resolution).floor() as i64,
            (point.y / resolution).floor() as i64,
        )
    } else {
        // + 0.0 folds -0.0 into 0.0
        ((point.x + 0.0).to_bits() as i64, (point.y + 0.0).to_bits() as i64)
    }
}

/// One click's contribution: a center and a radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Splat {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl Splat {
    pub fn weight_at(&self, cx: f64, cy: f64) -> Option<f64> {
        let dx = cx - self.x;
        let dy = cy - self.y;
        let d2 = dx * dx + dy * dy;
        if d2 > self.radius * self.radius {
            return None;
        }
        let sigma = self.radius / 2.0;
        Some((-d2 / (2.0 * sigma * sigma)).exp())
    }

    /// Visit every in-image cell of this splat whose row lies in `rows`.
    fn visit_rows(
        &self,
        width: u32,
        height: u32,
        rows: std::ops::Range<u32>,
        mut f: impl FnMut(u32, u32, f64),
    ) {
        let Some((x0, x1)) = cell_span(self.x, self.radius, width) else {
            return;
        };
        let Some((y0, y1)) = cell_span(self.y, self.radius, height) else {
            return;
        };
        let y_start = y0.max(rows.start);
        let y_end = (y1 + 1).min(rows.end);

        for cy in y_start..y_end {
            for cx in x0..=x1 {
                if let Some(weight) = self.weight_at(cx as f64, cy as f64) {
                    f(cx, cy, weight);
                }
            }
        }
    }
}

/// Inclusive cell range covering `[center - radius, center + radius]`, clipped to `0..len`
fn cell_span(center: f64, radius: f64, len: u32) -> Option<(u32, u32)> {
    let lo = (center - radius).ceil().max(0.0);
    let hi = (center + radius).floor().min(len as f64 - 1.0);
    if lo > hi {
        None
    } else {
        Some((lo as u32, hi as u32))
    }
}

/// Attach a radius to every point
pub fn plan_splats(points: &[MappedPoint], cluster_resolution: f64) -> Vec<Splat> {
    let counts = duplicate_counts(points, cluster_resolution);
    points
        .iter()
        .zip(counts)
        .map(|(p, count)| Splat {
            x: p.x,
            y: p.y,
            radius: splat_radius(count),
        })
        .collect()
}

/// Which accumulator backs a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Dense,
    Sparse,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Dense => write!(f, "dense"),
            FieldKind::Sparse => write!(f, "sparse"),
        }
    }
}

/// How to pick the accumulator for a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStrategy {
    /// Sparse when the clicks can only touch a small part of the image
    #[default]
    Auto,
    Dense,
    Sparse,
}

impl FieldStrategy {
    pub fn resolve(self, point_count: usize, width: u32, height: u32) -> FieldKind {
        match self {
            FieldStrategy::Dense => FieldKind::Dense,
            FieldStrategy::Sparse => FieldKind::Sparse,
            FieldStrategy::Auto => {
                let side = 2 * MAX_SPLAT_RADIUS as u64 + 1;
                let worst_area = point_count as u64 * side * side;
                let pixels = width as u64 * height as u64;
                if worst_area.saturating_mul(SPARSE_AREA_DIVISOR) < pixels {
                    FieldKind::Sparse
                } else {
                    FieldKind::Dense
                }
            }
        }
    }
}

impl FromStr for FieldStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "auto" => Ok(FieldStrategy::Auto),
            "dense" => Ok(FieldStrategy::Dense),
            "sparse" => Ok(FieldStrategy::Sparse),
            other => Err(format!("unknown field strategy '{}' (auto|dense|sparse)", other)),
        }
    }
}

/// Per-pixel click density for one image
pub trait DensityField: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn kind(&self) -> FieldKind;

    /// Density at a pixel; 0 for untouched or out-of-range cells
    fn get(&self, x: u32, y: u32) -> f64;

    /// Add every splat's contribution
    fn accumulate(&mut self, splats: &[Splat]);

    /// Largest density in the field, 0 when empty
    fn max_density(&self) -> f64;

    /// Visit every cell with non-zero density
    fn for_each_touched(&self, f: &mut dyn FnMut(u32, u32, f64));
}

/// Row-major grid, one `f64` per pixel
#[derive(Clone)]
pub struct DenseField {
    width: u32,
    height: u32,
    values: Vec<f64>,
    max: f64,
}

impl DenseField {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width as usize * height as usize],
            max: 0.0,
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl DensityField for DenseField {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn kind(&self) -> FieldKind {
        FieldKind::Dense
    }

    fn get(&self, x: u32, y: u32) -> f64 {
        if x >= self.width || y >= self.height {
            return 0.0;
        }
        self.values[self.index(x, y)]
    }

    /// Bands of rows are filled in parallel. Each band applies splats in input
    /// order, so every cell sums in the same order as a sequential pass.
    fn accumulate(&mut self, splats: &[Splat]) {
        let row_len = self.width as usize;
        if row_len == 0 || self.height == 0 {
            return;
        }
        let (width, height) = (self.width, self.height);

        self.values
            .par_chunks_mut(row_len * SPLAT_BAND_ROWS)
            .enumerate()
            .for_each(|(band, cells)| {
                let y0 = (band * SPLAT_BAND_ROWS) as u32;
                let y1 = y0 + (cells.len() / row_len) as u32;
                for splat in splats {
                    splat.visit_rows(width, height, y0..y1, |x, y, weight| {
                        cells[(y - y0) as usize * row_len + x as usize] += weight;
                    });
                }
            });

        self.max = self.values.iter().copied().fold(0.0, f64::max);
    }

    fn max_density(&self) -> f64 {
        self.max
    }

    fn for_each_touched(&self, f: &mut dyn FnMut(u32, u32, f64)) {
        let row_len = self.width as usize;
        if row_len == 0 {
            return;
        }
        for (idx, &value) in self.values.iter().enumerate() {
            if value > 0.0 {
                f((idx % row_len) as u32, (idx / row_len) as u32, value);
            }
        }
    }
}

/// Only touched cells are stored
#[derive(Clone)]
pub struct SparseField {
    width: u32,
    height: u32,
    cells: HashMap<(u32, u32), f64>,
    max: f64,
}

impl SparseField {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: HashMap::new(),
            max: 0.0,
        }
    }
}

impl DensityField for SparseField {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn kind(&self) -> FieldKind {
        FieldKind::Sparse
    }

    fn get(&self, x: u32, y: u32) -> f64 {
        self.cells.get(&(x, y)).copied().unwrap_or(0.0)
    }

    fn accumulate(&mut self, splats: &[Splat]) {
        let (width, height) = (self.width, self.height);
        let cells = &mut self.cells;
        let mut max = self.max;
        for splat in splats {
            splat.visit_rows(width, height, 0..height, |x, y, weight| {
                let cell = cells.entry((x, y)).or_insert(0.0);
                *cell += weight;
                if *cell > max {
                    max = *cell;
                }
            });
        }
        self.max = max;
    }

    fn max_density(&self) -> f64 {
        self.max
    }

    fn for_each_touched(&self, f: &mut dyn FnMut(u32, u32, f64)) {
        for (&(x, y), &value) in &self.cells {
            if value > 0.0 {
                f(x, y, value);
            }
        }
    }
}

/// Build the density field for a set of mapped points.
pub fn build_density(
    points: &[MappedPoint],
    width: u32,
    height: u32,
    cluster_resolution: f64,
    strategy: FieldStrategy,
) -> Box<dyn DensityField> {
    let splats = plan_splats(points, cluster_resolution);
    let mut field: Box<dyn DensityField> = match strategy.resolve(points.len(), width, height) {
        FieldKind::Dense => Box::new(DenseField::new(width, height)),
        FieldKind::Sparse => Box::new(SparseField::new(width, height)),
    };
    field.accumulate(&splats);
    field
}
