//! Background segmentation: mask a roughly uniform backdrop, then crop to
//! what is left.
//!
//! The reference background colour is the mean RGB of four small patches
//! sampled at the image corners. A pixel is background if it lies within
//! [`SegmentConfig::threshold`] of that colour (Euclidean RGB distance) or
//! if every channel exceeds [`SegmentConfig::near_white`].
//!
//! # Strategy pattern
//!
//! Two masking strategies share that classification:
//!
//! - [`MaskStrategy::Flat`] hides every background pixel outright (the
//!   simple upload cleanup).
//! - [`MaskStrategy::RadialFade`] keeps everything inside a known dial
//!   circle, fades background-free pixels across a ring around it, and
//!   hides everything beyond (the enhanced cleanup driven by
//!   [`crate::detect`]).
//!
//! Masking only ever changes alpha; colour samples are kept so a second
//! pass sees the same reference colour as the first.

use image::Rgba;

use crate::types::{PixelBuffer, PixelRect, Point, SegmentConfig};

/// Selects how background pixels are removed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MaskStrategy {
    /// Colour-distance threshold applied uniformly across the image.
    #[default]
    Flat,
    /// Colour-distance masking modulated by distance from a dial circle.
    RadialFade {
        /// Dial centre in the coordinates of the buffer being masked.
        center: Point,
        /// Dial radius in the same coordinates.
        radius: f64,
        /// Fade begins at this multiple of `radius`.
        fade_start: f64,
        /// Fully transparent from this multiple of `radius` outwards.
        fade_end: f64,
    },
}

/// Trait for background masking strategies.
///
/// Input: the full image and a reference background colour.
/// Output: a new image of the same size with alpha adjusted.
pub trait BackgroundMask {
    /// Return a copy of `image` with background pixels made transparent.
    fn apply(
        &self,
        image: &PixelBuffer,
        reference: [f64; 3],
        config: &SegmentConfig,
    ) -> PixelBuffer;
}

impl BackgroundMask for MaskStrategy {
    fn apply(
        &self,
        image: &PixelBuffer,
        reference: [f64; 3],
        config: &SegmentConfig,
    ) -> PixelBuffer {
        match *self {
            Self::Flat => mask_flat(image, reference, config),
            Self::RadialFade {
                center,
                radius,
                fade_start,
                fade_end,
            } => mask_radial(
                image,
                reference,
                config,
                RadialFade {
                    center,
                    radius,
                    fade_start,
                    fade_end,
                },
            ),
        }
    }
}

/// Remove the background of `image` with `strategy` and crop to the
/// padded foreground.
///
/// If nothing survives masking (no pixel with alpha above
/// [`SegmentConfig::alpha_floor`]), the input is returned unmodified so
/// the caller always has something visible to show.
#[must_use = "returns the segmented image"]
pub fn segment(
    image: &PixelBuffer,
    strategy: &MaskStrategy,
    config: &SegmentConfig,
) -> PixelBuffer {
    let Some(reference) = reference_color(image, config) else {
        // Every corner is already transparent: the backdrop was removed
        // before, so only the crop remains to be done.
        log::debug!("corner patches fully transparent, skipping colour mask");
        return crop_to_foreground(image, image, config);
    };
    log::debug!(
        "reference background colour ({:.1}, {:.1}, {:.1})",
        reference[0],
        reference[1],
        reference[2],
    );

    let masked = strategy.apply(image, reference, config);
    crop_to_foreground(image, &masked, config)
}

fn crop_to_foreground(
    original: &PixelBuffer,
    masked: &PixelBuffer,
    config: &SegmentConfig,
) -> PixelBuffer {
    match foreground_crop(masked, config) {
        Some(rect) => {
            log::debug!(
                "foreground crop {}x{} at ({}, {})",
                rect.width,
                rect.height,
                rect.x,
                rect.y,
            );
            rect.crop(masked)
        }
        None => {
            log::debug!("no foreground found, keeping original image");
            original.clone()
        }
    }
}

/// Side of the square corner patch used for the reference colour.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn corner_patch_size(width: u32, height: u32, config: &SegmentConfig) -> u32 {
    let shorter = width.min(height);
    let proportional = (f64::from(shorter) * config.corner_fraction).floor() as u32;
    proportional.max(config.min_corner_patch).min(shorter)
}

/// Mean RGB of the four corner patches, counting only visible pixels.
///
/// Returns `None` if the image is empty or every corner pixel has alpha
/// at or below [`SegmentConfig::alpha_floor`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn reference_color(image: &PixelBuffer, config: &SegmentConfig) -> Option<[f64; 3]> {
    let (w, h) = image.dimensions();
    let patch = corner_patch_size(w, h, config);
    if patch == 0 {
        return None;
    }

    let corners = [(0, 0), (w - patch, 0), (0, h - patch), (w - patch, h - patch)];
    let mut sum = [0u64; 3];
    let mut count = 0u64;
    for (cx, cy) in corners {
        for y in cy..cy + patch {
            for x in cx..cx + patch {
                let [r, g, b, a] = image.get_pixel(x, y).0;
                if a <= config.alpha_floor {
                    continue;
                }
                sum[0] += u64::from(r);
                sum[1] += u64::from(g);
                sum[2] += u64::from(b);
                count += 1;
            }
        }
    }

    (count > 0).then(|| sum.map(|s| s as f64 / count as f64))
}

/// Whether a pixel's colour reads as backdrop.
#[must_use]
pub fn is_background(pixel: Rgba<u8>, reference: [f64; 3], config: &SegmentConfig) -> bool {
    let [r, g, b, _] = pixel.0;
    let near_white = r > config.near_white && g > config.near_white && b > config.near_white;
    near_white || color_distance([r, g, b], reference) < config.threshold
}

fn color_distance(rgb: [u8; 3], reference: [f64; 3]) -> f64 {
    let dr = f64::from(rgb[0]) - reference[0];
    let dg = f64::from(rgb[1]) - reference[1];
    let db = f64::from(rgb[2]) - reference[2];
    dr.mul_add(dr, dg.mul_add(dg, db * db)).sqrt()
}

fn mask_flat(image: &PixelBuffer, reference: [f64; 3], config: &SegmentConfig) -> PixelBuffer {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        if is_background(*pixel, reference, config) {
            pixel.0[3] = 0;
        }
    }
    out
}

#[derive(Debug, Clone, Copy)]
struct RadialFade {
    center: Point,
    radius: f64,
    fade_start: f64,
    fade_end: f64,
}

impl RadialFade {
    /// Alpha multiplier for a non-background pixel at `ratio` radii from
    /// the centre, or `None` if the pixel is kept unconditionally.
    fn falloff(&self, ratio: f64) -> Option<f64> {
        if ratio <= self.fade_start {
            None
        } else if ratio >= self.fade_end {
            Some(0.0)
        } else {
            Some((self.fade_end - ratio) / (self.fade_end - self.fade_start))
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn mask_radial(
    image: &PixelBuffer,
    reference: [f64; 3],
    config: &SegmentConfig,
    fade: RadialFade,
) -> PixelBuffer {
    if fade.radius <= 0.0 || fade.fade_end <= fade.fade_start {
        log::debug!("degenerate radial fade, using flat mask");
        return mask_flat(image, reference, config);
    }

    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let ratio = Point::new(f64::from(x), f64::from(y)).distance(fade.center) / fade.radius;
        let Some(factor) = fade.falloff(ratio) else {
            continue;
        };
        if factor <= 0.0 || is_background(*pixel, reference, config) {
            pixel.0[3] = 0;
        } else {
            let alpha = f64::from(pixel.0[3]) * factor;
            pixel.0[3] = alpha.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Padded bounding box of pixels with alpha above
/// [`SegmentConfig::alpha_floor`], clamped to the image.
///
/// Padding is [`SegmentConfig::padding_fraction`] of the larger side of
/// the tight box. Returns `None` if no pixel qualifies.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn foreground_crop(image: &PixelBuffer, config: &SegmentConfig) -> Option<PixelRect> {
    let (w, h) = image.dimensions();
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0[3] <= config.alpha_floor {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((min_x, min_y, max_x, max_y)) => {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            }
        });
    }
    let (min_x, min_y, max_x, max_y) = bounds?;

    let span = (max_x - min_x).max(max_y - min_y);
    let pad = (f64::from(span) * config.padding_fraction).round().max(0.0) as u32;
    Some(PixelRect::from_corners(
        min_x.saturating_sub(pad),
        min_y.saturating_sub(pad),
        max_x.saturating_add(pad).min(w - 1),
        max_y.saturating_add(pad).min(h - 1),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const GREY_BG: Rgba<u8> = Rgba([200, 200, 200, 255]);
    const DARK: Rgba<u8> = Rgba([30, 30, 40, 255]);

    /// A `w x h` canvas of `bg` with a filled disc of `fg`.
    fn disc(w: u32, h: u32, cx: f64, cy: f64, r: f64, bg: Rgba<u8>, fg: Rgba<u8>) -> PixelBuffer {
        PixelBuffer::from_fn(w, h, |x, y| {
            if Point::new(f64::from(x), f64::from(y)).distance(Point::new(cx, cy)) <= r {
                fg
            } else {
                bg
            }
        })
    }

    #[test]
    fn default_strategy_is_flat() {
        assert_eq!(MaskStrategy::default(), MaskStrategy::Flat);
    }

    #[test]
    fn corner_patch_has_floor_and_fraction() {
        let config = SegmentConfig::default();
        assert_eq!(corner_patch_size(100, 100, &config), 8);
        assert_eq!(corner_patch_size(1000, 600, &config), 18);
        assert_eq!(corner_patch_size(5, 40, &config), 5);
    }

    #[test]
    fn reference_color_averages_corners() {
        let img = disc(100, 100, 50.0, 50.0, 20.0, GREY_BG, DARK);
        let reference = reference_color(&img, &SegmentConfig::default()).unwrap();
        for channel in reference {
            assert!((channel - 200.0).abs() < 1e-9);
        }
    }

    #[test]
    fn transparent_corners_have_no_reference() {
        let img = PixelBuffer::from_pixel(20, 20, Rgba([10, 10, 10, 0]));
        assert!(reference_color(&img, &SegmentConfig::default()).is_none());
    }

    #[test]
    fn near_white_is_background_regardless_of_reference() {
        let config = SegmentConfig::default();
        assert!(is_background(
            Rgba([250, 250, 250, 255]),
            [0.0, 0.0, 0.0],
            &config
        ));
        assert!(!is_background(
            Rgba([250, 240, 250, 255]),
            [0.0, 0.0, 0.0],
            &config
        ));
    }

    #[test]
    fn flat_segment_crops_disc_with_padding() {
        let img = disc(200, 160, 100.0, 80.0, 25.0, WHITE, DARK);
        let out = segment(&img, &MaskStrategy::Flat, &SegmentConfig::default());

        // Tight box is 51 px wide (75..=125); pad = round(50 * 0.08) = 4.
        assert_eq!(out.dimensions(), (59, 59));
        assert_eq!(out.get_pixel(0, 0).0[3], 0);
        assert_eq!(*out.get_pixel(29, 29), DARK);
    }

    #[test]
    fn masking_keeps_colour_samples() {
        let img = disc(60, 60, 30.0, 30.0, 10.0, GREY_BG, DARK);
        let config = SegmentConfig::default();
        let reference = reference_color(&img, &config).unwrap();
        let masked = MaskStrategy::Flat.apply(&img, reference, &config);
        let corner = masked.get_pixel(0, 0).0;
        assert_eq!(corner, [200, 200, 200, 0]);
    }

    #[test]
    fn no_foreground_returns_original() {
        let img = PixelBuffer::from_pixel(40, 30, GREY_BG);
        let out = segment(&img, &MaskStrategy::Flat, &SegmentConfig::default());
        assert_eq!(out, img);
    }

    #[test]
    fn segmenting_twice_does_not_shrink_foreground() {
        let config = SegmentConfig::default();
        let img = disc(300, 240, 140.0, 120.0, 60.0, WHITE, DARK);
        let once = segment(&img, &MaskStrategy::Flat, &config);
        let twice = segment(&once, &MaskStrategy::Flat, &config);

        assert_eq!(twice.dimensions(), once.dimensions());
        assert_eq!(
            foreground_crop(&twice, &config),
            foreground_crop(&once, &config)
        );
    }

    #[test]
    fn foreground_crop_clamps_to_image() {
        let mut img = PixelBuffer::from_pixel(10, 10, Rgba([0, 0, 0, 0]));
        img.put_pixel(0, 0, DARK);
        img.put_pixel(9, 9, DARK);
        let rect = foreground_crop(&img, &SegmentConfig::default()).unwrap();
        assert_eq!(rect, PixelRect::from_corners(0, 0, 9, 9));
    }

    #[test]
    fn radial_fade_keeps_inside_and_clears_outside() {
        let config = SegmentConfig::default();
        // Mid-grey foreground everywhere, pure black backdrop reference.
        let img = PixelBuffer::from_pixel(100, 100, Rgba([120, 90, 60, 255]));
        let strategy = MaskStrategy::RadialFade {
            center: Point::new(50.0, 50.0),
            radius: 20.0,
            fade_start: 1.0,
            fade_end: 1.2,
        };
        let out = strategy.apply(&img, [0.0, 0.0, 0.0], &config);

        assert_eq!(out.get_pixel(50, 50).0[3], 255);
        assert_eq!(out.get_pixel(50, 70).0[3], 255);
        // 22 px out: halfway through the fade ring.
        let mid = out.get_pixel(72, 50).0[3];
        assert!(mid > 100 && mid < 160, "mid-ring alpha {mid}");
        assert_eq!(out.get_pixel(50, 75).0[3], 0);
        assert_eq!(out.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn radial_fade_keeps_backdrop_coloured_pixels_inside_dial() {
        let config = SegmentConfig::default();
        let img = PixelBuffer::from_pixel(40, 40, WHITE);
        let strategy = MaskStrategy::RadialFade {
            center: Point::new(20.0, 20.0),
            radius: 10.0,
            fade_start: 1.0,
            fade_end: 1.2,
        };
        let out = strategy.apply(&img, [255.0, 255.0, 255.0], &config);
        assert_eq!(out.get_pixel(20, 20).0[3], 255);
        assert_eq!(out.get_pixel(31, 20).0[3], 0);
    }

    #[test]
    fn degenerate_radial_fade_falls_back_to_flat() {
        let config = SegmentConfig::default();
        let img = disc(40, 40, 20.0, 20.0, 5.0, WHITE, DARK);
        let radial = MaskStrategy::RadialFade {
            center: Point::new(20.0, 20.0),
            radius: 0.0,
            fade_start: 1.0,
            fade_end: 1.2,
        };
        let reference = [255.0, 255.0, 255.0];
        assert_eq!(
            radial.apply(&img, reference, &config),
            MaskStrategy::Flat.apply(&img, reference, &config)
        );
    }
}
