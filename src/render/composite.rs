//! Overlay painting and alpha compositing

use image::{Pixel, RgbaImage};
use std::fs;
use std::path::Path;

use super::color::ColorRamp;
use super::density::DensityField;
use crate::error::{Error, Result};

/// Paint the color-mapped density field into a transparent layer.
///
/// Returns the layer and how many pixels were drawn.
pub fn paint_overlay(field: &dyn DensityField, ramp: &ColorRamp) -> (RgbaImage, usize) {
    let mut layer = RgbaImage::new(field.width(), field.height());
    let max_density = field.max_density();
    let mut drawn = 0;

    field.for_each_touched(&mut |x, y, density| {
        if let Some(color) = ramp.color_for(density, max_density) {
            layer.put_pixel(x, y, color);
            drawn += 1;
        }
    });

    (layer, drawn)
}

/// Blend `overlay` over `base` in place ("over" operator).
///
/// Fully transparent overlay pixels leave the base pixel untouched.
pub fn composite_over(base: &mut RgbaImage, overlay: &RgbaImage) {
    debug_assert_eq!(base.dimensions(), overlay.dimensions());
    for (dst, src) in base.pixels_mut().zip(overlay.pixels()) {
        if src.0[3] == 0 {
            continue;
        }
        dst.blend(src);
    }
}

/// Load a base screenshot as RGBA.
pub fn load_base_image(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path).map_err(|e| Error::image(path, e))?;
    Ok(img.to_rgba8())
}

/// Write a composited heatmap, creating parent directories as needed.
pub fn save_heatmap(img: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    img.save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| Error::image(path, e))
}
