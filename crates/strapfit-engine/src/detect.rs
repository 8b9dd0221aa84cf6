//! Dial detection: find the most circle-like, highest-contrast region of a
//! photo.
//!
//! The search runs on a copy downscaled to
//! [`DetectorConfig::max_dimension`]:
//!
//! 1. Flatten onto white and convert to luminance.
//! 2. Sobel gradients, combined as `sqrt(gx² + gy²)`.
//! 3. A summed-area table over the luminance for O(1) square means.
//! 4. Grid search over centres inside the central
//!    [`DetectorConfig::search_fraction`] of the image and radii between
//!    [`DetectorConfig::min_radius_fraction`] and
//!    [`DetectorConfig::max_radius_fraction`] of the shorter side. Each
//!    candidate scores `ring_weight * ring_energy + contrast_weight *
//!    contrast`, where ring energy is the mean gradient magnitude sampled
//!    around the circle and contrast is the absolute difference between
//!    the mean intensity of an inner and an outer square.
//! 5. The first strictly better candidate wins; there is no non-maximum
//!    suppression, so equal scores resolve in scan order (row-major
//!    centres, then ascending radius).
//!
//! Detection never fails. A blank search or a best score at or below
//! [`DetectorConfig::min_score`] yields a centred fallback square flagged
//! as not confident.

use std::f64::consts::TAU;

use image::{ImageBuffer, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

use crate::downsample::downsample;
use crate::grayscale::to_grayscale;
use crate::integral::IntegralImage;
use crate::segment::{MaskStrategy, segment};
use crate::types::{
    DetectionResult, DetectorConfig, DialRect, Dimensions, GrayImage, PixelBuffer, PixelRect,
    Point, SegmentConfig,
};

/// Gradient magnitude per pixel.
pub type GradientMagnitude = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Outcome of a detection run, in source-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialDetection {
    /// Square bounding box of the dial (`center ± radius`).
    pub rect: DialRect,
    /// Dial centre.
    pub center: Point,
    /// Dial radius.
    pub radius: f64,
    /// Winning candidate in detection space, if the search produced one.
    pub candidate: Option<DetectionResult>,
    /// Detection-space / source-space size ratio.
    pub scale: f64,
    /// `false` when `rect` is the fallback rather than a real detection.
    pub confident: bool,
}

/// Detect the dial in `image` and return its bounding box in source
/// pixels.
///
/// Best effort: always returns a usable rectangle. Use [`detect_dial`]
/// to find out whether the result came from the fallback.
#[must_use]
pub fn detect(image: &PixelBuffer, config: &DetectorConfig) -> DialRect {
    detect_dial(image, config).rect
}

/// Run the full detector and report the winning candidate alongside the
/// source-space rectangle.
#[must_use]
pub fn detect_dial(image: &PixelBuffer, config: &DetectorConfig) -> DialDetection {
    let source = Dimensions::of(image);
    let small = downsample(image, config.max_dimension, config.downsample_filter);
    let gray = to_grayscale(&small.image);
    log::debug!(
        "detecting on {}x{} (scale {:.3})",
        gray.width(),
        gray.height(),
        small.scale,
    );

    match find_best_circle(&gray, config) {
        Some(best) if best.score > config.min_score && small.scale > 0.0 => {
            log::debug!(
                "dial candidate at ({:.0}, {:.0}) r={:.0} score={:.2}",
                best.center_x,
                best.center_y,
                best.radius,
                best.score,
            );
            let center = Point::new(best.center_x / small.scale, best.center_y / small.scale);
            let radius = best.radius / small.scale;
            DialDetection {
                rect: DialRect::square_around(center, radius * 2.0),
                center,
                radius,
                candidate: Some(best),
                scale: small.scale,
                confident: true,
            }
        }
        other => {
            log::warn!(
                "dial detection below confidence (best score {:?}), using centred fallback",
                other.map(|c| c.score),
            );
            let center = Point::new(f64::from(source.width) / 2.0, f64::from(source.height) / 2.0);
            let radius = source.shorter_dim() * config.fallback_fraction / 2.0;
            DialDetection {
                rect: DialRect::square_around(center, radius * 2.0),
                center,
                radius,
                candidate: other,
                scale: small.scale,
                confident: false,
            }
        }
    }
}

/// Sobel gradient magnitude of a grayscale image.
#[must_use]
pub fn gradient_magnitude(gray: &GrayImage) -> GradientMagnitude {
    let gx: Image<Luma<i16>> = filter_clamped(gray, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(gray, kernel::SOBEL_VERTICAL_3X3);
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let h = f32::from(gx.get_pixel(x, y).0[0]);
        let v = f32::from(gy.get_pixel(x, y).0[0]);
        Luma([h.hypot(v)])
    })
}

/// Grid-search `gray` for the highest-scoring circle.
///
/// Returns `None` only if the search space is empty (image too small for
/// any candidate).
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn find_best_circle(gray: &GrayImage, config: &DetectorConfig) -> Option<DetectionResult> {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let magnitude = gradient_magnitude(gray);
    let integral = IntegralImage::new(gray);

    let shorter = f64::from(w.min(h));
    let r_min = (shorter * config.min_radius_fraction).round().max(1.0) as u32;
    let r_max = (shorter * config.max_radius_fraction).round() as u32;
    let margin = (1.0 - config.search_fraction.clamp(0.0, 1.0)) / 2.0;
    let x_range = search_range(w, margin);
    let y_range = search_range(h, margin);
    let center_step = config.center_stride.max(1) as usize;
    let radius_step = config.radius_stride.max(1) as usize;

    let mut best: Option<DetectionResult> = None;
    for cy in y_range.clone().step_by(center_step) {
        for cx in x_range.clone().step_by(center_step) {
            for r in (r_min..=r_max).step_by(radius_step) {
                let Some(score) = score_candidate(
                    &magnitude,
                    &integral,
                    f64::from(cx),
                    f64::from(cy),
                    f64::from(r),
                    config,
                ) else {
                    continue;
                };
                if best.is_none_or(|b| score > b.score) {
                    best = Some(DetectionResult {
                        center_x: f64::from(cx),
                        center_y: f64::from(cy),
                        radius: f64::from(r),
                        score,
                    });
                }
            }
        }
    }
    best
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn search_range(len: u32, margin: f64) -> std::ops::RangeInclusive<u32> {
    let len_f = f64::from(len);
    let start = (len_f * margin).ceil() as u32;
    let end = ((len_f * (1.0 - margin)).floor() as u32).min(len - 1);
    start..=end
}

/// Score one candidate, or `None` if it has no ring samples or contrast
/// squares inside the image.
#[allow(clippy::cast_possible_truncation)]
fn score_candidate(
    magnitude: &GradientMagnitude,
    integral: &IntegralImage,
    cx: f64,
    cy: f64,
    r: f64,
    config: &DetectorConfig,
) -> Option<f64> {
    let samples = config.ring_samples.max(1);
    let mut ring_sum = 0.0;
    let mut ring_count = 0u32;
    for k in 0..samples {
        let angle = TAU * f64::from(k) / f64::from(samples);
        let sx = r.mul_add(angle.cos(), cx).round();
        let sy = r.mul_add(angle.sin(), cy).round();
        if sx < 0.0
            || sy < 0.0
            || sx >= f64::from(magnitude.width())
            || sy >= f64::from(magnitude.height())
        {
            continue;
        }
        #[allow(clippy::cast_sign_loss)]
        let value = magnitude.get_pixel(sx as u32, sy as u32).0[0];
        ring_sum += f64::from(value);
        ring_count += 1;
    }
    if ring_count == 0 {
        return None;
    }
    let ring_energy = ring_sum / f64::from(ring_count);

    let square_mean = |half: f64| {
        integral.mean(
            (cx - half).round() as i64,
            (cy - half).round() as i64,
            (cx + half).round() as i64,
            (cy + half).round() as i64,
        )
    };
    let inner = square_mean(r * config.inner_fraction)?;
    let outer = square_mean(r * config.outer_fraction)?;
    let contrast = (outer - inner).abs();

    Some(config.ring_weight.mul_add(ring_energy, config.contrast_weight * contrast))
}

/// Square crop around a detected dial, in source pixels.
///
/// Side is `radius * crop_radius_factor`, clamped between
/// `min(min_crop_side, shorter side)` and the shorter side, centred on the
/// dial and shifted to stay inside the image.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn crop_region(
    detection: &DialDetection,
    source: Dimensions,
    config: &DetectorConfig,
) -> PixelRect {
    let shorter = source.shorter_dim();
    let side = (detection.radius * config.crop_radius_factor)
        .clamp(config.min_crop_side.min(shorter), shorter)
        .round()
        .max(1.0);
    let place = |center: f64, len: u32| {
        let max_start = f64::from(len) - side;
        (center - side / 2.0).round().clamp(0.0, max_start.max(0.0)) as u32
    };
    let side_px = side as u32;
    PixelRect {
        x: place(detection.center.x, source.width),
        y: place(detection.center.y, source.height),
        width: side_px.min(source.width),
        height: side_px.min(source.height),
    }
}

/// Enhanced upload cleanup: detect the dial, crop around it, then mask
/// the backdrop with a radial fade centred on the dial.
///
/// Falls back to the flat corner-colour cleanup when detection is not
/// confident, since a fade around a guessed circle could cut into the
/// dial.
#[must_use = "returns the cleaned image"]
pub fn enhanced_clean(
    image: &PixelBuffer,
    segment_config: &SegmentConfig,
    detector: &DetectorConfig,
) -> PixelBuffer {
    let detection = detect_dial(image, detector);
    if !detection.confident {
        return segment(image, &MaskStrategy::Flat, segment_config);
    }

    let region = crop_region(&detection, Dimensions::of(image), detector);
    log::debug!(
        "enhanced cleanup crop {}x{} at ({}, {})",
        region.width,
        region.height,
        region.x,
        region.y,
    );
    let cropped = region.crop(image);
    let strategy = MaskStrategy::RadialFade {
        center: Point::new(
            detection.center.x - f64::from(region.x),
            detection.center.y - f64::from(region.y),
        ),
        radius: detection.radius,
        fade_start: detector.fade_start,
        fade_end: detector.fade_end,
    };
    segment(&cropped, &strategy, segment_config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const DARK: Rgba<u8> = Rgba([30, 30, 30, 255]);

    fn dial_photo(w: u32, h: u32, center: Point, radius: f64) -> PixelBuffer {
        PixelBuffer::from_fn(w, h, |x, y| {
            if Point::new(f64::from(x), f64::from(y)).distance(center) <= radius {
                DARK
            } else {
                WHITE
            }
        })
    }

    #[test]
    fn gradient_is_zero_on_flat_image() {
        let gray = GrayImage::from_pixel(12, 12, Luma([90]));
        let mag = gradient_magnitude(&gray);
        assert!(mag.pixels().all(|p| p.0[0].abs() < f32::EPSILON));
    }

    #[test]
    fn gradient_peaks_on_step_edge() {
        let gray = GrayImage::from_fn(10, 10, |x, _| Luma([if x < 5 { 0 } else { 200 }]));
        let mag = gradient_magnitude(&gray);
        assert!(mag.get_pixel(5, 5).0[0] > 100.0);
        assert!(mag.get_pixel(1, 5).0[0].abs() < f32::EPSILON);
    }

    #[test]
    fn finds_synthetic_circle() {
        let img = dial_photo(1000, 1000, Point::new(500.0, 500.0), 200.0);
        let detection = detect_dial(&img, &DetectorConfig::default());

        assert!(detection.confident);
        assert!(
            detection.center.distance(Point::new(500.0, 500.0)) < 50.0,
            "centre {:?}",
            detection.center,
        );
        let width = detection.rect.width;
        assert!(
            (width - 400.0).abs() <= 80.0,
            "detected width {width} not within 20% of 400",
        );
    }

    #[test]
    fn finds_off_centre_circle_in_landscape_photo() {
        let img = dial_photo(800, 500, Point::new(360.0, 260.0), 90.0);
        let detection = detect_dial(&img, &DetectorConfig::default());
        assert!(detection.confident);
        assert!(detection.center.distance(Point::new(360.0, 260.0)) < 0.05 * 800.0);
        assert!((detection.radius - 90.0).abs() <= 18.0);
    }

    #[test]
    fn blank_image_falls_back_to_centred_square() {
        let img = PixelBuffer::from_pixel(400, 300, WHITE);
        let detection = detect_dial(&img, &DetectorConfig::default());
        assert!(!detection.confident);
        assert_eq!(detection.center, Point::new(200.0, 150.0));
        assert!((detection.rect.width - 150.0).abs() < 1e-9);
        assert_eq!(detect(&img, &DetectorConfig::default()), detection.rect);
    }

    #[test]
    fn tiny_image_never_panics() {
        let img = PixelBuffer::from_pixel(3, 2, DARK);
        let detection = detect_dial(&img, &DetectorConfig::default());
        assert!(detection.radius >= 0.0);
    }

    #[test]
    fn detection_is_deterministic() {
        let img = dial_photo(300, 300, Point::new(150.0, 150.0), 50.0);
        let config = DetectorConfig::default();
        assert_eq!(detect_dial(&img, &config), detect_dial(&img, &config));
    }

    #[test]
    fn crop_region_respects_minimum_and_bounds() {
        let config = DetectorConfig::default();
        let detection = DialDetection {
            rect: DialRect::square_around(Point::new(50.0, 50.0), 40.0),
            center: Point::new(50.0, 50.0),
            radius: 20.0,
            candidate: None,
            scale: 1.0,
            confident: true,
        };
        // 20 * 4.8 = 96 is below the 380 minimum; clamped then shifted in.
        let rect = crop_region(&detection, Dimensions::new(1000, 800), &config);
        assert_eq!((rect.width, rect.height), (380, 380));
        assert_eq!((rect.x, rect.y), (0, 0));

        // Never larger than the shorter side.
        let big = DialDetection {
            radius: 400.0,
            center: Point::new(500.0, 300.0),
            ..detection
        };
        let rect = crop_region(&big, Dimensions::new(1000, 600), &config);
        assert_eq!((rect.width, rect.height), (600, 600));
        assert_eq!((rect.x, rect.y), (200, 0));
    }

    #[test]
    fn enhanced_clean_isolates_dial() {
        let img = dial_photo(900, 900, Point::new(450.0, 450.0), 150.0);
        let cleaned = enhanced_clean(
            &img,
            &SegmentConfig::default(),
            &DetectorConfig::default(),
        );
        let (w, h) = cleaned.dimensions();
        assert!(w < 900 && h < 900, "expected a crop, got {w}x{h}");
        assert!(w > 250, "dial should survive, got width {w}");
        assert_eq!(cleaned.get_pixel(0, 0).0[3], 0);
        assert_eq!(cleaned.get_pixel(w / 2, h / 2).0[3], 255);
    }

    #[test]
    fn enhanced_clean_without_dial_uses_flat_path() {
        let img = PixelBuffer::from_pixel(200, 200, WHITE);
        let cleaned = enhanced_clean(
            &img,
            &SegmentConfig::default(),
            &DetectorConfig::default(),
        );
        assert_eq!(cleaned, img);
    }
}
