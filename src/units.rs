//! Unit conversion between typographic points, millimetres and raster pixels.
//!
//! The rendering engine measures lengths in *dots*. A point is
//! `dots_per_point` dots and a CSS pixel is `dots_per_pixel` dots, so a
//! length in points maps to `points * dots_per_point / dots_per_pixel`
//! pixels. Results are rounded up so a scaled image never undershoots the
//! box it is placed in.

use crate::config::BuilderConfig;

/// Default dots per point (20 dots per 0.75 pt).
pub const DEFAULT_DOTS_PER_POINT: f32 = 20.0 * 4.0 / 3.0;

/// Default dots per CSS pixel.
pub const DEFAULT_DOTS_PER_PIXEL: u32 = 20;

/// Default device pixel ratio (no oversampling).
pub const DEFAULT_DEVICE_PIXEL_RATIO: u32 = 1;

/// Millimetres per point used by the millimetre conversion.
const MILLIMETRES_PER_POINT: f64 = 0.35;

/// The ratios used while scaling an image. Not persisted anywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleParameters {
    pub dots_per_point: f32,
    pub dots_per_pixel: u32,
    /// Integer multiplier applied to target pixel sizes; values below 1 act as 1.
    pub device_pixel_ratio: u32,
}

impl Default for ScaleParameters {
    fn default() -> Self {
        Self {
            dots_per_point: DEFAULT_DOTS_PER_POINT,
            dots_per_pixel: DEFAULT_DOTS_PER_PIXEL,
            device_pixel_ratio: DEFAULT_DEVICE_PIXEL_RATIO,
        }
    }
}

impl From<&BuilderConfig> for ScaleParameters {
    fn from(config: &BuilderConfig) -> Self {
        Self {
            dots_per_point: config.dots_per_point,
            dots_per_pixel: config.dots_per_pixel,
            device_pixel_ratio: config.device_pixel_ratio,
        }
    }
}

impl ScaleParameters {
    pub fn points_to_pixels(&self, points: f64) -> u32 {
        points_to_pixels(points, self.dots_per_point, self.dots_per_pixel)
    }

    pub fn millimetres_to_pixels(&self, millimetres: f64) -> u32 {
        millimetres_to_pixels(millimetres, self.dots_per_point, self.dots_per_pixel)
    }

    /// Multiply a pixel size by the device pixel ratio.
    pub fn apply_ratio(&self, pixels: u32) -> u32 {
        pixels.saturating_mul(self.device_pixel_ratio.max(1))
    }
}

/// `ceil(points * dots_per_point / dots_per_pixel)`.
///
/// Inputs are not validated: non-positive lengths saturate to `0`.
pub fn points_to_pixels(points: f64, dots_per_point: f32, dots_per_pixel: u32) -> u32 {
    (points * f64::from(dots_per_point) / f64::from(dots_per_pixel)).ceil() as u32
}

/// `ceil(mm * dots_per_point / dots_per_pixel / 0.35)`.
///
/// Computed directly rather than through [`points_to_pixels`] so the two
/// roundings don't compound.
pub fn millimetres_to_pixels(millimetres: f64, dots_per_point: f32, dots_per_pixel: u32) -> u32 {
    (millimetres * f64::from(dots_per_point) / f64::from(dots_per_pixel) / MILLIMETRES_PER_POINT)
        .ceil() as u32
}
