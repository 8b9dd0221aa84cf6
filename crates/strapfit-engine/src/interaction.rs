//! Pointer and wheel handling for direct manipulation of the strap parts.
//!
//! The controller is an explicit two-state machine:
//!
//! - [`Gesture::Idle`]: no pointer captured.
//! - [`Gesture::Dragging`]: a pointer is captured in [`DragMode::Move`] or
//!   [`DragMode::Resize`], together with a snapshot of where the pointer
//!   started and what both parts looked like at that moment.
//!
//! Pointer-down hit-tests against both parts' axis-aligned bounds
//! (rotation is ignored). A press within [`InteractionConfig::edge_band`]
//! of a part's left or right edge resizes; anything else moves. Moves
//! translate both parts as a rigid pair, and resizes add the same scale
//! delta to both parts.
//!
//! Pointer-move never mutates anything. It returns the replacement pair,
//! built from the caller's live transforms plus the drag snapshot, and the
//! caller stores it.

use std::time::Duration;

use web_time::Instant;

use crate::types::{Bounds, DialRect, EngineConfig, InteractionConfig, PartPair, PartSizes, Point};

/// What a drag does to the parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    /// Translate both parts together.
    Move,
    /// Change both parts' scale together.
    Resize,
}

/// Current gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    /// Nothing captured.
    #[default]
    Idle,
    /// A pointer is captured.
    Dragging {
        /// Pointer that owns the gesture; other pointers are ignored.
        pointer_id: u64,
        /// Move or resize.
        mode: DragMode,
        /// Canvas-space pointer position at pointer-down.
        origin: Point,
        /// Both part transforms at pointer-down.
        start: PartPair,
    },
}

/// Direction of a strap variant step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDirection {
    /// Towards the start of the list.
    Previous,
    /// Towards the end of the list.
    Next,
}

/// Step `index` one place in `direction` within `count` entries, wrapping
/// at both ends. Returns 0 when `count` is 0.
#[must_use]
pub const fn cycle(index: usize, count: usize, direction: CycleDirection) -> usize {
    if count == 0 {
        return 0;
    }
    let index = index % count;
    match direction {
        CycleDirection::Next => (index + 1) % count,
        CycleDirection::Previous => (index + count - 1) % count,
    }
}

/// Pointer position in surface (screen) pixels, relative to the displayed
/// surface's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Identifies the pointer (mouse, finger, pen).
    pub pointer_id: u64,
    /// Position on the displayed surface.
    pub position: Point,
}

/// How the square canvas is currently displayed.
///
/// The surface may be shown larger or smaller than its native size, and
/// the view zoom scales everything about the canvas centre. Both are
/// undone before hit-testing, so geometry computed by the compositor is
/// used unscaled here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMapping {
    /// Native canvas side length.
    pub canvas_size: u32,
    /// Displayed width in screen pixels.
    pub displayed_width: f64,
    /// Displayed height in screen pixels.
    pub displayed_height: f64,
    /// View zoom in effect.
    pub view_zoom: f64,
}

impl SurfaceMapping {
    /// Mapping for a surface displayed at its native size, unzoomed.
    #[must_use]
    pub fn native(canvas_size: u32) -> Self {
        Self {
            canvas_size,
            displayed_width: f64::from(canvas_size),
            displayed_height: f64::from(canvas_size),
            view_zoom: 1.0,
        }
    }

    fn ratios(&self) -> (f64, f64) {
        let canvas = f64::from(self.canvas_size);
        let ratio = |displayed: f64| {
            if displayed > 0.0 {
                canvas / displayed
            } else {
                1.0
            }
        };
        (ratio(self.displayed_width), ratio(self.displayed_height))
    }

    fn zoom(&self) -> f64 {
        if self.view_zoom.is_finite() && self.view_zoom > 0.0 {
            self.view_zoom
        } else {
            1.0
        }
    }

    /// Convert a surface position into unzoomed canvas coordinates.
    #[must_use]
    pub fn to_canvas(&self, screen: Point) -> Point {
        let (sx, sy) = self.ratios();
        let c = f64::from(self.canvas_size) / 2.0;
        let zoom = self.zoom();
        Point::new(
            c + (screen.x * sx - c) / zoom,
            c + (screen.y * sy - c) / zoom,
        )
    }
}

/// Translates pointer, wheel and arrow input into part edits and variant
/// steps.
#[derive(Debug, Clone)]
pub struct InteractionController {
    config: InteractionConfig,
    scale_range: Bounds,
    canvas_size: u32,
    gesture: Gesture,
    last_wheel_step: Option<Instant>,
}

impl InteractionController {
    /// Controller using the interaction settings and part scale range of
    /// `config`.
    #[must_use]
    pub const fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.interaction,
            scale_range: config.ranges.part_scale,
            canvas_size: config.canvas_size,
            gesture: Gesture::Idle,
            last_wheel_step: None,
        }
    }

    /// Current gesture state.
    #[must_use]
    pub const fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Begin a drag.
    ///
    /// `sizes` are the native sizes of the part images; when they are not
    /// known yet, the drag defaults to [`DragMode::Move`]. A press outside
    /// both parts also moves (the whole assembly pans).
    pub fn pointer_down(
        &mut self,
        event: PointerEvent,
        mapping: &SurfaceMapping,
        parts: &PartPair,
        sizes: Option<PartSizes>,
    ) -> DragMode {
        let origin = mapping.to_canvas(event.position);
        let mode = sizes.map_or(DragMode::Move, |sizes| self.hit_test(origin, parts, sizes));
        log::debug!(
            "pointer {} down at ({:.1}, {:.1}): {mode:?}",
            event.pointer_id,
            origin.x,
            origin.y,
        );
        self.gesture = Gesture::Dragging {
            pointer_id: event.pointer_id,
            mode,
            origin,
            start: *parts,
        };
        mode
    }

    /// Drag mode a press at canvas point `p` would start.
    #[must_use]
    pub fn hit_test(&self, p: Point, parts: &PartPair, sizes: PartSizes) -> DragMode {
        let rects = [
            parts.top.bounds(sizes.top, self.canvas_size),
            parts.bottom.bounds(sizes.bottom, self.canvas_size),
        ];
        if rects.iter().any(|r| self.near_side_edge(p, r)) {
            DragMode::Resize
        } else {
            DragMode::Move
        }
    }

    fn near_side_edge(&self, p: Point, rect: &DialRect) -> bool {
        let band = self.config.edge_band;
        p.y >= rect.y
            && p.y <= rect.bottom()
            && ((p.x - rect.x).abs() <= band || (p.x - rect.right()).abs() <= band)
    }

    /// Continue a drag.
    ///
    /// Returns the replacement pair, or `None` if no drag is active or the
    /// event comes from a different pointer. Fields the gesture does not
    /// control are taken from `live`, the transforms as they are now.
    #[must_use]
    pub fn pointer_move(
        &self,
        event: PointerEvent,
        mapping: &SurfaceMapping,
        live: &PartPair,
    ) -> Option<PartPair> {
        let Gesture::Dragging {
            pointer_id,
            mode,
            origin,
            start,
        } = self.gesture
        else {
            return None;
        };
        if pointer_id != event.pointer_id {
            return None;
        }

        let current = mapping.to_canvas(event.position);
        let dx = current.x - origin.x;
        let dy = current.y - origin.y;
        let next = match mode {
            DragMode::Move => PartPair::new(
                live.top.with_position(start.top.x + dx, start.top.y + dy),
                live.bottom
                    .with_position(start.bottom.x + dx, start.bottom.y + dy),
            ),
            DragMode::Resize => {
                let delta = dx * self.config.resize_sensitivity;
                PartPair::new(
                    live.top.with_scale(self.scale_range.clamp(start.top.scale + delta)),
                    live.bottom
                        .with_scale(self.scale_range.clamp(start.bottom.scale + delta)),
                )
            }
        };
        Some(next)
    }

    /// End a drag. Returns `true` if `pointer_id` owned the gesture (and
    /// its capture should be released).
    pub fn pointer_up(&mut self, pointer_id: u64) -> bool {
        match self.gesture {
            Gesture::Dragging { pointer_id: owner, .. } if owner == pointer_id => {
                self.gesture = Gesture::Idle;
                true
            }
            _ => false,
        }
    }

    /// Abort a drag; same as [`InteractionController::pointer_up`].
    pub fn pointer_cancel(&mut self, pointer_id: u64) -> bool {
        self.pointer_up(pointer_id)
    }

    /// Wheel input over the preview. Positive `delta_y` steps forward.
    ///
    /// Steps closer together than
    /// [`InteractionConfig::wheel_debounce_ms`] are dropped.
    pub fn wheel(&mut self, delta_y: f64, now: Instant) -> Option<CycleDirection> {
        if delta_y.is_nan() || delta_y.abs() < f64::EPSILON {
            return None;
        }
        let debounce = Duration::from_millis(self.config.wheel_debounce_ms);
        if let Some(last) = self.last_wheel_step
            && now.saturating_duration_since(last) < debounce
        {
            return None;
        }
        self.last_wheel_step = Some(now);
        Some(if delta_y > 0.0 {
            CycleDirection::Next
        } else {
            CycleDirection::Previous
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::{Dimensions, PartTransform};

    const EPS: f64 = 1e-9;

    fn controller() -> InteractionController {
        InteractionController::new(&EngineConfig::default())
    }

    fn pair() -> PartPair {
        PartPair::new(PartTransform::at(0.0, -240.0), PartTransform::at(0.0, 240.0))
    }

    /// 200x100 parts: top spans x 350..550, y 160..260.
    fn sizes() -> PartSizes {
        PartSizes {
            top: Dimensions::new(200, 100),
            bottom: Dimensions::new(200, 100),
        }
    }

    fn at(pointer_id: u64, x: f64, y: f64) -> PointerEvent {
        PointerEvent {
            pointer_id,
            position: Point::new(x, y),
        }
    }

    #[test]
    fn cycle_wraps_both_ways() {
        assert_eq!(cycle(4, 5, CycleDirection::Next), 0);
        assert_eq!(cycle(0, 5, CycleDirection::Previous), 4);
        assert_eq!(cycle(2, 5, CycleDirection::Next), 3);
        assert_eq!(cycle(0, 0, CycleDirection::Next), 0);
        assert_eq!(cycle(7, 3, CycleDirection::Previous), 0);
    }

    #[test]
    fn press_inside_part_moves_and_near_edge_resizes() {
        let c = controller();
        assert_eq!(
            c.hit_test(Point::new(450.0, 210.0), &pair(), sizes()),
            DragMode::Move
        );
        assert_eq!(
            c.hit_test(Point::new(360.0, 210.0), &pair(), sizes()),
            DragMode::Resize
        );
        // Just outside the right edge but inside the band.
        assert_eq!(
            c.hit_test(Point::new(570.0, 700.0), &pair(), sizes()),
            DragMode::Resize
        );
        // Outside everything.
        assert_eq!(
            c.hit_test(Point::new(50.0, 450.0), &pair(), sizes()),
            DragMode::Move
        );
        // Beside the edge but above the part.
        assert_eq!(
            c.hit_test(Point::new(350.0, 150.0), &pair(), sizes()),
            DragMode::Move
        );
    }

    #[test]
    fn unknown_sizes_default_to_move() {
        let mut c = controller();
        let mapping = SurfaceMapping::native(900);
        let mode = c.pointer_down(at(1, 360.0, 210.0), &mapping, &pair(), None);
        assert_eq!(mode, DragMode::Move);
    }

    #[test]
    fn move_drag_translates_pair_rigidly() {
        let mut c = controller();
        let mapping = SurfaceMapping::native(900);
        let mut live = pair();
        live.top.rotation = 12.0;
        live.bottom.opacity = 0.4;
        c.pointer_down(at(7, 450.0, 210.0), &mapping, &live, Some(sizes()));

        let next = c.pointer_move(at(7, 480.0, 190.0), &mapping, &live).unwrap();
        assert!((next.top.x - 30.0).abs() < EPS);
        assert!((next.top.y - -260.0).abs() < EPS);
        assert!((next.bottom.x - 30.0).abs() < EPS);
        assert!((next.bottom.y - 220.0).abs() < EPS);
        assert!((next.bottom.y - next.top.y - 480.0).abs() < EPS);
        assert!((next.top.scale - live.top.scale).abs() < EPS);
        assert!((next.top.rotation - 12.0).abs() < EPS);
        assert!((next.bottom.opacity - 0.4).abs() < EPS);
    }

    #[test]
    fn drag_delta_accounts_for_display_ratio() {
        let mut c = controller();
        // Canvas shown at half size.
        let mapping = SurfaceMapping {
            displayed_width: 450.0,
            displayed_height: 450.0,
            ..SurfaceMapping::native(900)
        };
        c.pointer_down(at(1, 225.0, 105.0), &mapping, &pair(), Some(sizes()));
        let next = c.pointer_move(at(1, 235.0, 105.0), &mapping, &pair()).unwrap();
        assert!((next.top.x - 20.0).abs() < EPS);
    }

    #[test]
    fn view_zoom_is_undone_before_hit_testing() {
        let mapping = SurfaceMapping {
            view_zoom: 0.5,
            ..SurfaceMapping::native(900)
        };
        // Screen (450, 330) sits 120 above centre; unzoomed that is 240.
        let p = mapping.to_canvas(Point::new(450.0, 330.0));
        assert!((p.y - 210.0).abs() < EPS);
    }

    #[test]
    fn resize_drag_changes_only_scale() {
        let mut c = controller();
        let mapping = SurfaceMapping::native(900);
        let live = PartPair::new(
            PartTransform::at(5.0, -240.0).with_scale(85.0),
            PartTransform::at(5.0, 240.0).with_scale(120.0),
        );
        // Left edge of the 170-wide top part is at 455 - 85 = 370.
        let mode = c.pointer_down(at(3, 372.0, 210.0), &mapping, &live, Some(sizes()));
        assert_eq!(mode, DragMode::Resize);

        let next = c.pointer_move(at(3, 472.0, 250.0), &mapping, &live).unwrap();
        assert!((next.top.scale - 94.0).abs() < EPS);
        assert!((next.bottom.scale - 129.0).abs() < EPS);
        assert_eq!(next.top.with_scale(85.0), live.top);
        assert_eq!(next.bottom.with_scale(120.0), live.bottom);
    }

    #[test]
    fn resize_is_clamped() {
        let mut c = controller();
        let mapping = SurfaceMapping::native(900);
        c.pointer_down(at(1, 352.0, 210.0), &mapping, &pair(), Some(sizes()));
        let next = c.pointer_move(at(1, 5000.0, 210.0), &mapping, &pair()).unwrap();
        assert!((next.top.scale - 250.0).abs() < EPS);
        let next = c.pointer_move(at(1, -5000.0, 210.0), &mapping, &pair()).unwrap();
        assert!((next.bottom.scale - 30.0).abs() < EPS);
    }

    #[test]
    fn other_pointers_are_ignored_and_up_releases() {
        let mut c = controller();
        let mapping = SurfaceMapping::native(900);
        assert!(c.pointer_move(at(1, 0.0, 0.0), &mapping, &pair()).is_none());

        c.pointer_down(at(1, 450.0, 210.0), &mapping, &pair(), Some(sizes()));
        assert!(c.pointer_move(at(2, 500.0, 210.0), &mapping, &pair()).is_none());
        assert!(!c.pointer_up(2));
        assert!(matches!(c.gesture(), Gesture::Dragging { .. }));
        assert!(c.pointer_cancel(1));
        assert_eq!(*c.gesture(), Gesture::Idle);
        assert!(c.pointer_move(at(1, 500.0, 210.0), &mapping, &pair()).is_none());
    }

    #[test]
    fn wheel_steps_are_debounced() {
        let mut c = controller();
        let t0 = Instant::now();
        assert_eq!(c.wheel(3.0, t0), Some(CycleDirection::Next));
        assert_eq!(c.wheel(3.0, t0 + Duration::from_millis(100)), None);
        assert_eq!(
            c.wheel(-3.0, t0 + Duration::from_millis(170)),
            Some(CycleDirection::Previous)
        );
        assert_eq!(c.wheel(0.0, t0 + Duration::from_secs(5)), None);
    }
}
