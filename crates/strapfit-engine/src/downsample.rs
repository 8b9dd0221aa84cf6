//! Downsampling to the detection working resolution.
//!
//! The dial detector's grid search is quadratic in image size, so it runs
//! on a copy whose longest side is at most
//! [`DetectorConfig::max_dimension`](crate::types::DetectorConfig). The
//! returned scale factor maps detection-space coordinates back to the
//! source (`source = detection / scale`).
//!
//! If the image is already at or below the target resolution, it is
//! returned unchanged with a scale of 1.

use std::fmt;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::types::PixelBuffer;

/// Resampling filter used when downsampling.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality,
/// with a `Disabled` variant to skip downsampling entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DownsampleFilter {
    /// Skip downsampling regardless of image size.
    Disabled,
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl DownsampleFilter {
    /// Convert to the `image` crate's `FilterType`.
    ///
    /// Returns `None` for [`DownsampleFilter::Disabled`].
    const fn to_image_filter(self) -> Option<FilterType> {
        match self {
            Self::Disabled => None,
            Self::Nearest => Some(FilterType::Nearest),
            Self::Triangle => Some(FilterType::Triangle),
            Self::CatmullRom => Some(FilterType::CatmullRom),
            Self::Lanczos3 => Some(FilterType::Lanczos3),
        }
    }
}

impl fmt::Display for DownsampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// A downsampled copy together with the factor that produced it.
#[derive(Debug, Clone)]
pub struct Downsampled {
    /// The (possibly unchanged) image.
    pub image: PixelBuffer,
    /// `downsampled width / source width`; 1.0 when nothing changed.
    pub scale: f64,
}

/// Downsample `image` so its longest side is at most `max_dimension`.
///
/// Aspect ratio is preserved and neither side drops below one pixel.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn downsample(
    image: &PixelBuffer,
    max_dimension: u32,
    filter: DownsampleFilter,
) -> Downsampled {
    let unchanged = || Downsampled {
        image: image.clone(),
        scale: 1.0,
    };

    let Some(image_filter) = filter.to_image_filter() else {
        return unchanged();
    };

    let (w, h) = image.dimensions();
    let long_axis = w.max(h);
    if long_axis <= max_dimension || max_dimension == 0 {
        return unchanged();
    }

    let factor = f64::from(max_dimension) / f64::from(long_axis);
    let new_w = ((f64::from(w) * factor).round() as u32).max(1);
    let new_h = ((f64::from(h) * factor).round() as u32).max(1);
    let resized = image::imageops::resize(image, new_w, new_h, image_filter);

    Downsampled {
        scale: f64::from(new_w) / f64::from(w),
        image: resized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image(w: u32, h: u32) -> PixelBuffer {
        PixelBuffer::from_pixel(w, h, image::Rgba([128, 128, 128, 255]))
    }

    #[test]
    fn default_filter_is_triangle() {
        assert_eq!(DownsampleFilter::default(), DownsampleFilter::Triangle);
    }

    #[test]
    fn no_downsample_when_already_small() {
        let result = downsample(&test_image(100, 80), 560, DownsampleFilter::Triangle);
        assert_eq!(result.image.dimensions(), (100, 80));
        assert!((result.scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn downsample_landscape() {
        let result = downsample(&test_image(1120, 840), 560, DownsampleFilter::Triangle);
        assert_eq!(result.image.dimensions(), (560, 420));
        assert!((result.scale - 0.5).abs() < 1e-9);
    }

    #[test]
    fn downsample_portrait() {
        let result = downsample(&test_image(600, 1200), 560, DownsampleFilter::Triangle);
        assert_eq!(result.image.dimensions(), (280, 560));
    }

    #[test]
    fn downsample_square_thousand() {
        let result = downsample(&test_image(1000, 1000), 560, DownsampleFilter::Triangle);
        assert_eq!(result.image.dimensions(), (560, 560));
        assert!((result.scale - 0.56).abs() < 1e-9);
    }

    #[test]
    fn disabled_filter_skips_even_large_image() {
        let result = downsample(&test_image(1024, 768), 256, DownsampleFilter::Disabled);
        assert_eq!(result.image.dimensions(), (1024, 768));
        assert!((result.scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn extreme_aspect_never_collapses_to_zero() {
        let result = downsample(&test_image(2000, 1), 100, DownsampleFilter::Nearest);
        assert_eq!(result.image.dimensions(), (100, 1));
    }
}
