//! Compositing: dial plus two transformed, tinted strap parts on a fixed
//! square canvas.
//!
//! Draw order is fixed:
//!
//! 1. Clear the canvas to opaque white.
//! 2. Apply the view zoom (uniform scale about the canvas centre) to
//!    every following draw.
//! 3. Draw the dial, fitted to [`EngineConfig::dial_fit_fraction`] of the
//!    canvas times the dial scale, centred.
//! 4. Draw the top part, then the bottom part. Each is translated to the
//!    canvas centre plus its offset, rotated, scaled and drawn at its
//!    opacity. A visible tint is then blended over the part's own
//!    non-transparent pixels only, at `opacity * tint.alpha`.
//!
//! Parts are drawn over the dial so a new strap covers whatever strap the
//! uploaded photo already showed.
//!
//! Rendering uses `tiny-skia` (premultiplied RGBA); buffers are converted
//! in and out at the boundary.

use tiny_skia::{
    BlendMode, Color, ColorU8, FilterQuality, Paint, Pixmap, PixmapPaint, Rect, Transform,
};

use crate::placement::fit_dial;
use crate::raster::RasterSource;
use crate::types::{
    Dimensions, EngineConfig, PartPair, PartTransform, PixelBuffer, RenderError, Tint,
};

/// Vertical gap between the two parts in a stacked parts image.
pub const STACK_GAP: u32 = 16;

/// Decoded images for one frame.
#[derive(Debug, Clone, Copy)]
pub struct Layers<'a> {
    /// The (usually cleaned) dial photo.
    pub dial: &'a PixelBuffer,
    /// The "12 o'clock" part.
    pub top: &'a PixelBuffer,
    /// The "6 o'clock" part.
    pub bottom: &'a PixelBuffer,
}

/// Encoded sources for one frame, resolved at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sources {
    /// Dial photo source.
    pub dial: RasterSource,
    /// Top part source.
    pub top: RasterSource,
    /// Bottom part source.
    pub bottom: RasterSource,
}

/// Everything about a frame other than its images.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    /// Part placement.
    pub parts: PartPair,
    /// Optional overlay colour.
    pub tint: Tint,
    /// Dial fit multiplier.
    pub dial_scale: f64,
    /// Whole-view zoom multiplier.
    pub view_zoom: f64,
}

impl View {
    /// View of `parts` with no tint, dial scale 1 and no zoom.
    #[must_use]
    pub const fn new(parts: PartPair) -> Self {
        Self {
            parts,
            tint: Tint::NONE,
            dial_scale: 1.0,
            view_zoom: 1.0,
        }
    }
}

/// Draws frames on a square canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compositor {
    canvas_size: u32,
    dial_fit_fraction: f64,
}

impl Compositor {
    /// Compositor using the canvas geometry of `config`.
    #[must_use]
    pub const fn new(config: &EngineConfig) -> Self {
        Self {
            canvas_size: config.canvas_size,
            dial_fit_fraction: config.dial_fit_fraction,
        }
    }

    /// Canvas side length.
    #[must_use]
    pub const fn canvas_size(&self) -> u32 {
        self.canvas_size
    }

    /// Render one frame from decoded images.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Surface`] if the canvas cannot be allocated
    /// (zero or absurd size).
    #[allow(clippy::cast_possible_truncation)]
    pub fn render(&self, layers: Layers<'_>, view: &View) -> Result<PixelBuffer, RenderError> {
        let size = self.canvas_size;
        let mut canvas = Pixmap::new(size, size).ok_or(RenderError::Surface {
            width: size,
            height: size,
        })?;
        canvas.fill(Color::WHITE);

        let base = self.view_transform(view.view_zoom);

        if let Some(dial) = to_pixmap(layers.dial) {
            let rect = fit_dial(
                Dimensions::of(layers.dial),
                size,
                self.dial_fit_fraction,
                view.dial_scale,
            );
            let transform = base.pre_translate(rect.x as f32, rect.y as f32).pre_scale(
                (rect.width / f64::from(dial.width())) as f32,
                (rect.height / f64::from(dial.height())) as f32,
            );
            canvas.draw_pixmap(
                0,
                0,
                dial.as_ref(),
                &PixmapPaint {
                    quality: FilterQuality::Bicubic,
                    ..PixmapPaint::default()
                },
                transform,
                None,
            );
        }

        for (image, transform) in [
            (layers.top, view.parts.top),
            (layers.bottom, view.parts.bottom),
        ] {
            self.draw_part(&mut canvas, image, &transform, &view.tint, base)?;
        }

        Ok(from_pixmap(&canvas))
    }

    /// Load all three sources, then render.
    ///
    /// Sources are resolved before anything is drawn: if any of them fails
    /// to load, no frame is produced.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Load`] if a source cannot be read or decoded,
    /// or [`RenderError::Surface`] as for [`Compositor::render`].
    pub fn render_sources(
        &self,
        sources: &Sources,
        view: &View,
    ) -> Result<PixelBuffer, RenderError> {
        let dial = sources.dial.load()?;
        let top = sources.top.load()?;
        let bottom = sources.bottom.load()?;
        self.render(
            Layers {
                dial: &dial,
                top: &top,
                bottom: &bottom,
            },
            view,
        )
    }

    #[allow(clippy::cast_possible_truncation)]
    fn view_transform(&self, zoom: f64) -> Transform {
        if !zoom.is_finite() || zoom <= 0.0 || (zoom - 1.0).abs() < f64::EPSILON {
            return Transform::identity();
        }
        let c = f64::from(self.canvas_size) as f32 / 2.0;
        let z = zoom as f32;
        Transform::from_translate(c, c)
            .pre_scale(z, z)
            .pre_translate(-c, -c)
    }

    /// Draw one part into its own layer, tint the layer, then composite it
    /// at the part's opacity.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn draw_part(
        &self,
        canvas: &mut Pixmap,
        image: &PixelBuffer,
        transform: &PartTransform,
        tint: &Tint,
        base: Transform,
    ) -> Result<(), RenderError> {
        let Some(part) = to_pixmap(image) else {
            log::debug!("skipping empty part image");
            return Ok(());
        };
        let size = self.canvas_size;
        let mut layer = Pixmap::new(size, size).ok_or(RenderError::Surface {
            width: size,
            height: size,
        })?;

        let center = f64::from(size) / 2.0;
        let scale = (transform.scale / 100.0) as f32;
        let placed = base
            .pre_translate(
                (center + transform.x) as f32,
                (center + transform.y) as f32,
            )
            .pre_rotate(transform.rotation as f32)
            .pre_scale(scale, scale)
            .pre_translate(
                -(part.width() as f32) / 2.0,
                -(part.height() as f32) / 2.0,
            );

        // Unzoomed, unrotated native-size draws map pixels one-to-one.
        let quality = if base.is_identity()
            && transform.rotation.abs() < f64::EPSILON
            && (transform.scale - 100.0).abs() < f64::EPSILON
        {
            FilterQuality::Nearest
        } else {
            FilterQuality::Bicubic
        };
        layer.draw_pixmap(
            0,
            0,
            part.as_ref(),
            &PixmapPaint {
                quality,
                ..PixmapPaint::default()
            },
            placed,
            None,
        );

        // The layer is composited at the part's opacity, so the tint ends
        // up weighted by `opacity * tint.alpha` on the canvas.
        if tint.is_visible() {
            let [r, g, b] = tint.color.0;
            let mut paint = Paint::default();
            paint.set_color_rgba8(r, g, b, 255);
            paint.shader.apply_opacity(tint.strength() as f32);
            paint.blend_mode = BlendMode::SourceAtop;
            if let Some(full) = Rect::from_xywh(0.0, 0.0, size as f32, size as f32) {
                layer.fill_rect(full, &paint, Transform::identity(), None);
            }
        }

        canvas.draw_pixmap(
            0,
            0,
            layer.as_ref(),
            &PixmapPaint {
                opacity: transform.opacity.clamp(0.0, 1.0) as f32,
                ..PixmapPaint::default()
            },
            Transform::identity(),
            None,
        );
        Ok(())
    }
}

/// Combine the two part images into one raster, top above bottom.
///
/// Both parts are scaled to the wider part's width (aspect preserved) and
/// separated by [`STACK_GAP`] pixels on a white background.
///
/// # Errors
///
/// Returns [`RenderError::Surface`] if either part is empty.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn stack_parts(top: &PixelBuffer, bottom: &PixelBuffer) -> Result<PixelBuffer, RenderError> {
    let width = top.width().max(bottom.width());
    let scaled_height = |part: &PixelBuffer| {
        if part.width() == 0 {
            0.0
        } else {
            f64::from(part.height()) * f64::from(width) / f64::from(part.width())
        }
    };
    let top_height = scaled_height(top);
    let bottom_height = scaled_height(bottom);
    let height = (top_height + bottom_height + f64::from(STACK_GAP)).round() as u32;

    let surface_error = RenderError::Surface { width, height };
    let (Some(top_px), Some(bottom_px)) = (to_pixmap(top), to_pixmap(bottom)) else {
        return Err(surface_error);
    };
    let mut out = Pixmap::new(width, height).ok_or(surface_error)?;
    out.fill(Color::WHITE);

    let paint = PixmapPaint {
        quality: FilterQuality::Bicubic,
        ..PixmapPaint::default()
    };
    let w = width as f32;
    out.draw_pixmap(
        0,
        0,
        top_px.as_ref(),
        &paint,
        Transform::from_scale(w / top.width() as f32, w / top.width() as f32),
        None,
    );
    out.draw_pixmap(
        0,
        0,
        bottom_px.as_ref(),
        &paint,
        Transform::from_translate(0.0, (top_height + f64::from(STACK_GAP)) as f32)
            .pre_scale(w / bottom.width() as f32, w / bottom.width() as f32),
        None,
    );
    Ok(from_pixmap(&out))
}

/// Convert straight RGBA into a premultiplied pixmap.
///
/// Returns `None` for an empty buffer.
#[must_use]
pub fn to_pixmap(buffer: &PixelBuffer) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(buffer.width(), buffer.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(buffer.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

/// Convert a premultiplied pixmap back to straight RGBA.
#[must_use]
pub fn from_pixmap(pixmap: &Pixmap) -> PixelBuffer {
    let mut out = PixelBuffer::new(pixmap.width(), pixmap.height());
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}

/// Ticket identifying one render request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameTicket(u64);

/// Holds the newest completed frame.
///
/// Every render request takes a ticket from [`FrameSlot::begin`]. When
/// renders overlap and finish out of order, a completion is only accepted
/// if its ticket is newer than the frame already shown, so a slow stale
/// render can never overwrite a faster later one. A render that fails
/// never calls [`FrameSlot::complete`], leaving the previous frame in
/// place.
#[derive(Debug, Clone, Default)]
pub struct FrameSlot {
    issued: u64,
    shown: Option<FrameTicket>,
    frame: Option<PixelBuffer>,
}

impl FrameSlot {
    /// Empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for a new render request.
    pub const fn begin(&mut self) -> FrameTicket {
        self.issued += 1;
        FrameTicket(self.issued)
    }

    /// Offer a finished frame. Returns `true` if it became the current
    /// frame, `false` if a newer frame is already shown.
    pub fn complete(&mut self, ticket: FrameTicket, frame: PixelBuffer) -> bool {
        if self.shown.is_some_and(|shown| ticket <= shown) {
            log::debug!(
                "discarding stale frame {} (showing {:?})",
                ticket.0,
                self.shown.map(|t| t.0),
            );
            return false;
        }
        self.shown = Some(ticket);
        self.frame = Some(frame);
        true
    }

    /// The newest accepted frame, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&PixelBuffer> {
        self.frame.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Point, Rgb};
    use image::Rgba;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    /// Channel-wise equality within resampling rounding.
    fn assert_close(actual: Rgba<u8>, expected: [u8; 4]) {
        for (a, e) in actual.0.iter().zip(expected) {
            assert!(a.abs_diff(e) <= 2, "{actual:?} != {expected:?}");
        }
    }

    fn compositor() -> Compositor {
        Compositor::new(&EngineConfig::default())
    }

    fn transparent_dial() -> PixelBuffer {
        PixelBuffer::from_pixel(10, 10, Rgba([0, 0, 0, 0]))
    }

    /// A 40x20 part with a distinct colour per quadrant.
    fn quadrant_part() -> PixelBuffer {
        PixelBuffer::from_fn(40, 20, |x, y| match (x < 20, y < 10) {
            (true, true) => Rgba([200, 30, 30, 255]),
            (false, true) => Rgba([30, 200, 30, 255]),
            (true, false) => Rgba([30, 30, 200, 255]),
            (false, false) => Rgba([120, 120, 20, 255]),
        })
    }

    fn default_pair() -> PartPair {
        PartPair::new(PartTransform::at(0.0, -240.0), PartTransform::at(0.0, 240.0))
    }

    /// Centroid of non-white pixels within rows `rows`.
    #[allow(clippy::cast_precision_loss)]
    fn ink_centroid(frame: &PixelBuffer, rows: std::ops::Range<u32>) -> Point {
        let (mut sx, mut sy, mut n) = (0.0, 0.0, 0.0);
        for (x, y, p) in frame.enumerate_pixels() {
            if rows.contains(&y) && *p != WHITE {
                sx += f64::from(x);
                sy += f64::from(y);
                n += 1.0;
            }
        }
        Point::new(sx / n + 0.5, sy / n + 0.5)
    }

    #[test]
    fn blank_scene_is_white() {
        let empty = transparent_dial();
        let frame = compositor()
            .render(
                Layers {
                    dial: &empty,
                    top: &empty,
                    bottom: &empty,
                },
                &View::new(default_pair()),
            )
            .unwrap();
        assert_eq!(frame.dimensions(), (900, 900));
        assert!(frame.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn parts_centred_at_expected_canvas_points() {
        let dial = transparent_dial();
        let part = quadrant_part();
        let frame = compositor()
            .render(
                Layers {
                    dial: &dial,
                    top: &part,
                    bottom: &part,
                },
                &View::new(default_pair()),
            )
            .unwrap();

        let top = ink_centroid(&frame, 0..450);
        let bottom = ink_centroid(&frame, 450..900);
        assert!(top.distance(Point::new(450.0, 210.0)) < 1e-9, "{top:?}");
        assert!(bottom.distance(Point::new(450.0, 690.0)) < 1e-9, "{bottom:?}");
    }

    #[test]
    fn untinted_native_part_pixels_are_unchanged() {
        let dial = transparent_dial();
        let part = quadrant_part();
        let frame = compositor()
            .render(
                Layers {
                    dial: &dial,
                    top: &part,
                    bottom: &part,
                },
                &View::new(default_pair()),
            )
            .unwrap();

        // Top part occupies (430..470, 200..220).
        for (x, y, p) in part.enumerate_pixels() {
            assert_eq!(frame.get_pixel(430 + x, 200 + y), p, "pixel ({x}, {y})");
        }
    }

    #[test]
    fn tint_only_touches_part_pixels() {
        let dial = transparent_dial();
        let part = PixelBuffer::from_fn(40, 20, |x, _| {
            if x < 20 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let mut view = View::new(default_pair());
        view.tint = Tint {
            color: Rgb([0, 0, 0]),
            alpha: 0.5,
        };
        let frame = compositor()
            .render(
                Layers {
                    dial: &dial,
                    top: &part,
                    bottom: &part,
                },
                &view,
            )
            .unwrap();

        let tinted = frame.get_pixel(435, 205).0;
        assert!(tinted[0] > 110 && tinted[0] < 145, "tinted {tinted:?}");
        // Transparent half of the part: background untouched.
        assert_eq!(*frame.get_pixel(460, 205), WHITE);
    }

    /// Render `part` as the top part only, with `top` as its transform.
    fn render_top(part: &PixelBuffer, top: PartTransform, tint: Tint, zoom: f64) -> PixelBuffer {
        let dial = transparent_dial();
        let empty = transparent_dial();
        let mut view = View::new(PartPair::new(top, PartTransform::at(0.0, 240.0)));
        view.tint = tint;
        view.view_zoom = zoom;
        compositor()
            .render(
                Layers {
                    dial: &dial,
                    top: part,
                    bottom: &empty,
                },
                &view,
            )
            .unwrap()
    }

    #[test]
    fn rotated_part_swaps_extent() {
        let part = PixelBuffer::from_pixel(100, 20, Rgba([0, 0, 0, 255]));
        let top = PartTransform {
            rotation: 90.0,
            ..PartTransform::at(0.0, -240.0)
        };
        let frame = render_top(&part, top, Tint::NONE, 1.0);
        // Centred on (450, 210): now 20 wide and 100 tall.
        assert_close(*frame.get_pixel(450, 170), [0, 0, 0, 255]);
        assert_close(*frame.get_pixel(450, 250), [0, 0, 0, 255]);
        assert_eq!(*frame.get_pixel(490, 210), WHITE);
        assert_eq!(*frame.get_pixel(410, 210), WHITE);
    }

    #[test]
    fn part_opacity_blends_with_background() {
        let part = PixelBuffer::from_pixel(40, 20, Rgba([0, 0, 0, 255]));
        let top = PartTransform {
            opacity: 0.5,
            ..PartTransform::at(0.0, -240.0)
        };
        let frame = render_top(&part, top, Tint::NONE, 1.0);
        assert_close(*frame.get_pixel(450, 210), [128, 128, 128, 255]);
        assert_eq!(*frame.get_pixel(450, 240), WHITE);
    }

    #[test]
    fn tint_weight_scales_once_with_opacity() {
        let part = PixelBuffer::from_pixel(40, 20, WHITE);
        let top = PartTransform {
            opacity: 0.5,
            ..PartTransform::at(0.0, -240.0)
        };
        let tint = Tint {
            color: Rgb([0, 0, 0]),
            alpha: 0.5,
        };
        let frame = render_top(&part, top, tint, 1.0);
        // Black at 0.5 * 0.5 over white: 255 * (1 - 0.25).
        let [r, g, b, a] = frame.get_pixel(450, 210).0;
        for channel in [r, g, b] {
            assert!(channel.abs_diff(191) <= 3, "got {channel}");
        }
        assert_eq!(a, 255);
    }

    #[test]
    fn zoomed_native_part_is_resampled_smoothly() {
        let part = quadrant_part();
        let frame = render_top(&part, PartTransform::at(0.0, -240.0), Tint::NONE, 0.8);
        let source: Vec<Rgba<u8>> = part.pixels().copied().collect();
        // Smooth sampling blends neighbouring quadrants; nearest would not.
        let blended = frame
            .enumerate_pixels()
            .filter(|&(_, y, p)| y < 450 && *p != WHITE && !source.contains(p))
            .count();
        assert!(blended > 0);
    }

    #[test]
    fn dial_is_fitted_and_centred() {
        let dial = PixelBuffer::from_pixel(100, 50, Rgba([10, 10, 10, 255]));
        let empty = transparent_dial();
        let frame = compositor()
            .render(
                Layers {
                    dial: &dial,
                    top: &empty,
                    bottom: &empty,
                },
                &View::new(default_pair()),
            )
            .unwrap();
        // Fitted to 612x306 at (144, 297).
        assert_close(*frame.get_pixel(450, 450), [10, 10, 10, 255]);
        assert_close(*frame.get_pixel(150, 300), [10, 10, 10, 255]);
        assert_eq!(*frame.get_pixel(140, 450), WHITE);
        assert_eq!(*frame.get_pixel(450, 290), WHITE);
    }

    #[test]
    fn view_zoom_shrinks_about_centre() {
        let dial = PixelBuffer::from_pixel(100, 100, Rgba([10, 10, 10, 255]));
        let empty = transparent_dial();
        let mut view = View::new(default_pair());
        view.view_zoom = 0.62;
        let frame = compositor()
            .render(
                Layers {
                    dial: &dial,
                    top: &empty,
                    bottom: &empty,
                },
                &view,
            )
            .unwrap();
        // Unzoomed dial starts at 144; zoomed it starts near 450 - 306*0.62.
        assert_eq!(*frame.get_pixel(200, 450), WHITE);
        assert_close(*frame.get_pixel(280, 450), [10, 10, 10, 255]);
    }

    #[test]
    fn missing_source_fails_without_frame() {
        let missing = RasterSource::Path(std::env::temp_dir().join("strapfit-no-such-dial.png"));
        let sources = Sources {
            dial: missing.clone(),
            top: missing.clone(),
            bottom: missing,
        };
        let result = compositor().render_sources(&sources, &View::new(default_pair()));
        assert!(matches!(result, Err(RenderError::Load(_))));
    }

    #[test]
    fn zero_canvas_is_surface_error() {
        let config = EngineConfig {
            canvas_size: 0,
            ..EngineConfig::default()
        };
        let empty = transparent_dial();
        let result = Compositor::new(&config).render(
            Layers {
                dial: &empty,
                top: &empty,
                bottom: &empty,
            },
            &View::new(default_pair()),
        );
        assert!(matches!(result, Err(RenderError::Surface { .. })));
    }

    #[test]
    fn pixmap_conversion_round_trips_opaque_and_clear() {
        let img = PixelBuffer::from_fn(3, 1, |x, _| match x {
            0 => Rgba([1, 2, 3, 255]),
            1 => Rgba([0, 0, 0, 0]),
            _ => Rgba([200, 100, 50, 255]),
        });
        assert_eq!(from_pixmap(&to_pixmap(&img).unwrap()), img);
        assert!(to_pixmap(&PixelBuffer::new(0, 4)).is_none());
    }

    #[test]
    fn stack_parts_matches_wider_part() {
        let top = PixelBuffer::from_pixel(100, 40, Rgba([255, 0, 0, 255]));
        let bottom = PixelBuffer::from_pixel(50, 50, Rgba([0, 0, 255, 255]));
        let stacked = stack_parts(&top, &bottom).unwrap();
        // 40 + 100 (bottom doubled) + 16 gap.
        assert_eq!(stacked.dimensions(), (100, 156));
        assert_close(*stacked.get_pixel(50, 20), [255, 0, 0, 255]);
        assert_eq!(*stacked.get_pixel(50, 48), WHITE);
        assert_close(*stacked.get_pixel(50, 100), [0, 0, 255, 255]);
    }

    #[test]
    fn stack_parts_rejects_empty() {
        let top = PixelBuffer::new(0, 0);
        let bottom = PixelBuffer::from_pixel(5, 5, WHITE);
        assert!(stack_parts(&top, &bottom).is_err());
    }

    #[test]
    fn frame_slot_latest_wins() {
        let mut slot = FrameSlot::new();
        let first = slot.begin();
        let second = slot.begin();
        assert!(second > first);

        assert!(slot.complete(second, PixelBuffer::from_pixel(1, 1, WHITE)));
        // The slower, older render finishes afterwards and is dropped.
        assert!(!slot.complete(first, PixelBuffer::new(1, 1)));
        assert_eq!(*slot.current().unwrap().get_pixel(0, 0), WHITE);
    }

    #[test]
    fn frame_slot_accepts_in_order_completions() {
        let mut slot = FrameSlot::new();
        assert!(slot.current().is_none());
        let a = slot.begin();
        assert!(slot.complete(a, PixelBuffer::new(1, 1)));
        let b = slot.begin();
        assert!(slot.complete(b, PixelBuffer::from_pixel(1, 1, WHITE)));
        assert_eq!(*slot.current().unwrap().get_pixel(0, 0), WHITE);
    }
}
