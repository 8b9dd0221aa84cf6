//! Auto-placement: scale and position both strap parts so they emerge
//! from the top and bottom of the dial.
//!
//! The dial is first fitted into the canonical display square (longest
//! side at [`EngineConfig::dial_fit_fraction`] of the canvas, aspect
//! preserved). Each part is then scaled so its width is
//! [`PlacementConfig::strap_width_fraction`] of the fitted dial width,
//! and pushed against the dial's top or bottom edge with a fixed overlap
//! so the strap tucks under the lugs.
//!
//! Planning is a pure function of image sizes and configuration: the same
//! inputs always give the same transforms. Horizontal offset and rotation
//! are always zero at plan time.

use crate::types::{
    DialRect, Dimensions, EngineConfig, PartPair, PartSizes, PartTransform, PixelBuffer,
    PlacementConfig,
};

/// Fit a dial of native size `dial` into the canvas, centred.
///
/// The longest side becomes `canvas_size * fit_fraction`, then both sides
/// are multiplied by `dial_scale`. A zero-sized dial fits to an empty
/// rectangle at the canvas centre.
#[must_use]
pub fn fit_dial(
    dial: Dimensions,
    canvas_size: u32,
    fit_fraction: f64,
    dial_scale: f64,
) -> DialRect {
    let canvas = f64::from(canvas_size);
    let max = canvas * fit_fraction;
    let ratio = if dial.width == 0 || dial.height == 0 {
        0.0
    } else {
        (max / f64::from(dial.width)).min(max / f64::from(dial.height))
    };
    let w = f64::from(dial.width) * ratio * dial_scale;
    let h = f64::from(dial.height) * ratio * dial_scale;
    DialRect {
        x: canvas / 2.0 - w / 2.0,
        y: canvas / 2.0 - h / 2.0,
        width: w,
        height: h,
    }
}

/// Plan both part transforms from image sizes.
#[must_use]
pub fn plan_dimensions(dial: Dimensions, parts: PartSizes, config: &EngineConfig) -> PartPair {
    let fitted = fit_dial(dial, config.canvas_size, config.dial_fit_fraction, 1.0);
    let placement = &config.placement;
    let target_width = fitted.width * placement.strap_width_fraction;
    let overlap = placement
        .min_overlap
        .max(fitted.height * placement.overlap_fraction);

    let top_scale = part_scale(target_width, parts.top, placement);
    let bottom_scale = part_scale(target_width, parts.bottom, placement);
    let top_height = f64::from(parts.top.height) * top_scale / 100.0;
    let bottom_height = f64::from(parts.bottom.height) * bottom_scale / 100.0;

    let center = config.canvas_center();
    let top_edge = fitted.y - center;
    let bottom_edge = fitted.bottom() - center;

    let pair = PartPair::new(
        PartTransform::at(0.0, top_edge - top_height / 2.0 + overlap).with_scale(top_scale),
        PartTransform::at(0.0, bottom_edge + bottom_height / 2.0 - overlap)
            .with_scale(bottom_scale),
    );
    log::debug!(
        "planned parts: top scale {:.1} y {:.1}, bottom scale {:.1} y {:.1} (overlap {:.1})",
        pair.top.scale,
        pair.top.y,
        pair.bottom.scale,
        pair.bottom.y,
        overlap,
    );
    pair
}

/// Plan both part transforms from decoded images.
#[must_use]
pub fn plan(
    dial: &PixelBuffer,
    top: &PixelBuffer,
    bottom: &PixelBuffer,
    config: &EngineConfig,
) -> PartPair {
    plan_dimensions(
        Dimensions::of(dial),
        PartSizes {
            top: Dimensions::of(top),
            bottom: Dimensions::of(bottom),
        },
        config,
    )
}

/// Scale percent mapping `native.width` onto `target_width`, clamped.
fn part_scale(target_width: f64, native: Dimensions, placement: &PlacementConfig) -> f64 {
    if native.width == 0 {
        return placement.scale.max;
    }
    placement
        .scale
        .clamp(target_width / f64::from(native.width) * 100.0)
}
