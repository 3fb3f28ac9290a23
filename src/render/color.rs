//! Density to RGBA color mapping

use image::Rgba;

use crate::constants::{
    COLOR_BLUE, COLOR_RED, COLOR_VIOLET, HIGH_BAND_ALPHA, LOW_BAND_ALPHA, SINGLE_CLICK_ALPHA,
    SINGLE_CLICK_DENSITY, VISIBILITY_FLOOR,
};

/// A point on the gradient, positioned as a fraction of the run's max density.
///
/// The segment starting at a stop uses that stop's alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub at: f64,
    pub color: [u8; 3],
    pub alpha: u8,
}

impl GradientStop {
    pub const fn new(at: f64, color: [u8; 3], alpha: u8) -> Self {
        Self { at, color, alpha }
    }
}

/// Maps densities to overlay colors.
///
/// Two absolute floors are applied before the relative gradient: densities
/// under `visibility_floor` are not drawn, densities up to `single_click`
/// get a fixed color.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    pub visibility_floor: f64,
    pub single_click: Option<(f64, GradientStop)>,
    /// Sorted by `at`
    pub stops: Vec<GradientStop>,
}

impl Default for ColorRamp {
    /// Blue for isolated clicks, then blue → violet → red toward the hottest spot.
    fn default() -> Self {
        Self {
            visibility_floor: VISIBILITY_FLOOR,
            single_click: Some((
                SINGLE_CLICK_DENSITY,
                GradientStop::new(0.0, COLOR_BLUE, SINGLE_CLICK_ALPHA),
            )),
            stops: vec![
                GradientStop::new(0.0, COLOR_BLUE, LOW_BAND_ALPHA),
                GradientStop::new(0.5, COLOR_VIOLET, HIGH_BAND_ALPHA),
                GradientStop::new(1.0, COLOR_RED, HIGH_BAND_ALPHA),
            ],
        }
    }
}

impl ColorRamp {
    pub fn with_stops(mut stops: Vec<GradientStop>) -> Self {
        stops.sort_by(|a, b| a.at.partial_cmp(&b.at).unwrap_or(std::cmp::Ordering::Equal));
        Self {
            stops,
            ..Self::default()
        }
    }

    /// Color for `density` given the run's maximum, or `None` if not drawn.
    pub fn color_for(&self, density: f64, max_density: f64) -> Option<Rgba<u8>> {
        if !(density >= self.visibility_floor) {
            return None;
        }
        if let Some((threshold, stop)) = &self.single_click {
            if density <= *threshold {
                return Some(rgba(stop.color, stop.alpha));
            }
        }

        if self.stops.is_empty() {
            return None;
        }
        let ratio = if max_density > 0.0 {
            (density / max_density).clamp(0.0, 1.0)
        } else {
            1.0
        };

        // Lower stop: last one at or below `ratio`, or the first stop
        let lower_idx = self
            .stops
            .iter()
            .rposition(|stop| stop.at <= ratio)
            .unwrap_or(0);
        let lower = &self.stops[lower_idx];
        let Some(upper) = self.stops.get(lower_idx + 1) else {
            return Some(rgba(lower.color, lower.alpha));
        };
        let span = upper.at - lower.at;
        let t = if span > 0.0 {
            ((ratio - lower.at) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Some(rgba(lerp_color(lower.color, upper.color, t), lower.alpha))
    }
}

fn lerp_color(from: [u8; 3], to: [u8; 3], t: f64) -> [u8; 3] {
    let mut out = [0u8; 3];
    for (channel, (a, b)) in out.iter_mut().zip(from.iter().zip(to.iter())) {
        let value = *a as f64 + (*b as f64 - *a as f64) * t;
        *channel = value.round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn rgba(color: [u8; 3], alpha: u8) -> Rgba<u8> {
    Rgba([color[0], color[1], color[2], alpha])
}
