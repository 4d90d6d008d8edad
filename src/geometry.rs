//! Conversion between normalized box coordinates and pixel coordinates.
//!
//! This is the only place coordinate spaces are converted. Both directions
//! are pure functions of the box and the image size.

use crate::error::{GeometryError, InvalidDimensionsError};
use crate::models::BoundingBox;

/// Box in absolute pixel coordinates of a particular image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl PixelBox {
    /// Integer corners `(x1, y1, x2, y2)` rounded to the nearest pixel.
    pub fn to_rect_corners(&self) -> (i32, i32, i32, i32) {
        (
            self.x1.round() as i32,
            self.y1.round() as i32,
            self.x2.round() as i32,
            self.y2.round() as i32,
        )
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), InvalidDimensionsError> {
    if width == 0 || height == 0 {
        return Err(InvalidDimensionsError { width, height });
    }
    Ok(())
}

/// Scale a normalized box to pixel coordinates of a `width` x `height` image.
///
/// x values are scaled by the width and y values by the height. No clamping
/// is done; a valid box always lands inside `[0, width] x [0, height]`.
pub fn denormalize(
    bbox: &BoundingBox,
    width: u32,
    height: u32,
) -> Result<PixelBox, InvalidDimensionsError> {
    check_dimensions(width, height)?;

    let (w, h) = (width as f64, height as f64);
    Ok(PixelBox {
        x1: bbox.x1() * w,
        y1: bbox.y1() * h,
        x2: bbox.x2() * w,
        y2: bbox.y2() * h,
    })
}

/// Inverse of [`denormalize`], for detectors that report pixel-space boxes.
///
/// The result goes through the same validation as any other box, so a pixel
/// box that falls outside the image is rejected rather than clamped.
pub fn normalize(px: &PixelBox, width: u32, height: u32) -> Result<BoundingBox, GeometryError> {
    check_dimensions(width, height)?;

    let (w, h) = (width as f64, height as f64);
    let bbox = BoundingBox::new(px.x1 / w, px.y1 / h, px.x2 / w, px.y2 / h)?;
    Ok(bbox)
}
