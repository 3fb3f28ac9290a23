//! Capture-time click positions to image pixel coordinates

use crate::clicks::ClickRecord;
use crate::error::{Error, Result};

/// A click position in image pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedPoint {
    pub x: f64,
    pub y: f64,
}

/// Rescale a click into an image of `image_width` x `image_height` pixels.
///
/// The page may have been a different size when the click was logged than
/// when the screenshot was captured; positions are scaled linearly per axis.
pub fn map_click(record: &ClickRecord, image_width: u32, image_height: u32) -> Result<MappedPoint> {
    if record.page_width == 0.0 || record.page_height == 0.0 {
        return Err(Error::DegenerateRecord {
            width: record.page_width,
            height: record.page_height,
        });
    }

    let x = record.abs_x * image_width as f64 / record.page_width;
    let y = record.abs_y * image_height as f64 / record.page_height;

    if !x.is_finite() || !y.is_finite() {
        return Err(Error::DegenerateRecord {
            width: record.page_width,
            height: record.page_height,
        });
    }

    Ok(MappedPoint { x, y })
}

/// Map every record, dropping (and logging) the ones that can't be scaled.
///
/// Returns the mapped points and how many records were dropped.
pub fn map_clicks(
    records: &[ClickRecord],
    image_width: u32,
    image_height: u32,
) -> (Vec<MappedPoint>, usize) {
    let mut points = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for record in records {
        match map_click(record, image_width, image_height) {
            Ok(point) => points.push(point),
            Err(err) => {
                log::warn!("Skipping click on {}: {}", record.page, err);
                dropped += 1;
            }
        }
    }

    (points, dropped)
}
