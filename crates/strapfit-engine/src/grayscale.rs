//! Grayscale conversion for dial detection.
//!
//! Transparent regions are flattened onto white first so a cut-out dial on
//! a transparent background reads the same as one photographed on white.

use image::{GrayImage, Luma};

use crate::types::PixelBuffer;

/// Luminance of a pixel composited over white.
///
/// Uses the standard weighting `0.299*R + 0.587*G + 0.114*B`.
#[must_use]
pub fn luminance_over_white(pixel: image::Rgba<u8>) -> f64 {
    let [r, g, b, a] = pixel.0;
    let alpha = f64::from(a) / 255.0;
    let flatten = |c: u8| f64::from(c).mul_add(alpha, 255.0 * (1.0 - alpha));
    0.299f64.mul_add(flatten(r), 0.587f64.mul_add(flatten(g), 0.114 * flatten(b)))
}

/// Convert an RGBA buffer to single-channel luminance.
#[must_use = "returns the grayscale image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_grayscale(image: &PixelBuffer) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let value = luminance_over_white(*image.get_pixel(x, y));
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}
