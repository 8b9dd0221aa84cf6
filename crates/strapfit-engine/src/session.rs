//! Session state: one dial, one selected strap variant, the two part
//! transforms and the view settings.
//!
//! A [`Session`] owns every piece of mutable preview state and routes
//! edits through the engine components. The part pair is replaced
//! wholesale on every edit, and rendering reads whatever the state is at
//! the time of the call.
//!
//! Two modes change how edits apply:
//!
//! - **Preserve adjustments**: switching variants swaps the part images
//!   but keeps the current transforms instead of re-planning.
//! - **Lock view**: pointer gestures and every transform-affecting control
//!   are ignored. View zoom, tint and variant browsing stay available;
//!   variant switches keep the current transforms.
//!
//! Defaults (part transforms, catalog, asset directory) come from
//! [`SessionConfig`], so independent sessions never share state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::catalog::{CategoryFilter, StrapCatalog, StrapVariant};
use crate::compose::{Compositor, FrameSlot, Layers, View};
use crate::detect::enhanced_clean;
use crate::interaction::{
    CycleDirection, DragMode, Gesture, InteractionController, PointerEvent, SurfaceMapping, cycle,
};
use crate::placement::plan;
use crate::raster::{RasterSource, load_path};
use crate::segment::{MaskStrategy, segment};
use crate::types::{
    Dimensions, EngineConfig, LoadError, PartId, PartPair, PartSizes, PartTransform, PixelBuffer,
    RenderError, Tint,
};

/// How an uploaded dial photo is cleaned before compositing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CleanupMode {
    /// Flat corner-colour mask and crop.
    #[default]
    Simple,
    /// Dial detection, crop around the dial and radial fade.
    Enhanced,
}

/// Everything a session starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Engine parameters.
    pub engine: EngineConfig,
    /// Part transforms before the first auto-placement, clamped to the
    /// engine's control ranges when a session starts.
    pub default_parts: PartPair,
    /// Strap variants available for browsing.
    pub catalog: StrapCatalog,
    /// Directory that variant image paths are resolved against.
    pub asset_root: PathBuf,
    /// Cleanup applied to uploaded dials.
    pub cleanup: CleanupMode,
}

impl SessionConfig {
    /// Default part scale in percent.
    pub const DEFAULT_PART_SCALE: f64 = 85.0;
    /// Default vertical distance of each part from the canvas centre.
    pub const DEFAULT_PART_OFFSET: f64 = 240.0;

    /// The initial part pair: both parts at [`Self::DEFAULT_PART_SCALE`],
    /// one above and one below the centre.
    #[must_use]
    pub const fn initial_parts() -> PartPair {
        let part = PartTransform::at(0.0, 0.0).with_scale(Self::DEFAULT_PART_SCALE);
        PartPair::new(
            part.with_position(0.0, -Self::DEFAULT_PART_OFFSET),
            part.with_position(0.0, Self::DEFAULT_PART_OFFSET),
        )
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            default_parts: Self::initial_parts(),
            catalog: StrapCatalog::sample(),
            asset_root: PathBuf::from("assets"),
            cleanup: CleanupMode::default(),
        }
    }
}

/// The decoded part images of the shown variant.
#[derive(Debug, Clone)]
struct PartImages {
    top: PixelBuffer,
    bottom: PixelBuffer,
}

impl PartImages {
    fn sizes(&self) -> PartSizes {
        PartSizes {
            top: Dimensions::of(&self.top),
            bottom: Dimensions::of(&self.bottom),
        }
    }
}

/// One preview session.
#[derive(Debug, Clone)]
pub struct Session {
    config: SessionConfig,
    compositor: Compositor,
    controller: InteractionController,
    dial: Option<PixelBuffer>,
    images: Option<PartImages>,
    parts: PartPair,
    placed: bool,
    filter: CategoryFilter,
    index: usize,
    tint_override: Option<Tint>,
    dial_scale: f64,
    view_zoom: f64,
    preserve_adjustments: bool,
    lock_view: bool,
    frames: FrameSlot,
}

impl Session {
    /// A fresh session with no dial and no variant loaded.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            compositor: Compositor::new(&config.engine),
            controller: InteractionController::new(&config.engine),
            dial: None,
            images: None,
            parts: config
                .default_parts
                .map(|part| config.engine.ranges.clamp_part(part)),
            placed: false,
            filter: CategoryFilter::default(),
            index: 0,
            tint_override: None,
            dial_scale: 1.0,
            view_zoom: 1.0,
            preserve_adjustments: false,
            lock_view: false,
            frames: FrameSlot::new(),
            config,
        }
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current part transforms.
    #[must_use]
    pub const fn parts(&self) -> PartPair {
        self.parts
    }

    /// The cleaned dial, if one has been ingested.
    #[must_use]
    pub const fn dial(&self) -> Option<&PixelBuffer> {
        self.dial.as_ref()
    }

    /// Native sizes of the loaded part images.
    #[must_use]
    pub fn part_sizes(&self) -> Option<PartSizes> {
        self.images.as_ref().map(PartImages::sizes)
    }

    /// Active category filter.
    #[must_use]
    pub const fn filter(&self) -> CategoryFilter {
        self.filter
    }

    /// Index of the shown variant within the active filter.
    #[must_use]
    pub const fn variant_index(&self) -> usize {
        self.index
    }

    /// The variant at the current index, if the filter has any.
    #[must_use]
    pub fn current_variant(&self) -> Option<&StrapVariant> {
        self.config
            .catalog
            .variants(self.filter)
            .get(self.index)
            .copied()
    }

    /// Tint in effect: the explicit override, else the variant's own.
    #[must_use]
    pub fn tint(&self) -> Tint {
        self.tint_override
            .or_else(|| self.current_variant().map(|v| v.tint))
            .unwrap_or(Tint::NONE)
    }

    /// Dial fit multiplier.
    #[must_use]
    pub const fn dial_scale(&self) -> f64 {
        self.dial_scale
    }

    /// Whole-view zoom multiplier.
    #[must_use]
    pub const fn view_zoom(&self) -> f64 {
        self.view_zoom
    }

    /// Whether variant switches keep the current transforms.
    #[must_use]
    pub const fn preserve_adjustments(&self) -> bool {
        self.preserve_adjustments
    }

    /// Whether transform-affecting input is ignored.
    #[must_use]
    pub const fn lock_view(&self) -> bool {
        self.lock_view
    }

    /// Everything the compositor needs besides the images.
    #[must_use]
    pub fn view(&self) -> View {
        View {
            parts: self.parts,
            tint: self.tint(),
            dial_scale: self.dial_scale,
            view_zoom: self.view_zoom,
        }
    }

    /// Mapping for the preview surface shown at the given size under the
    /// current view zoom.
    #[must_use]
    pub fn surface_mapping(&self, displayed_width: f64, displayed_height: f64) -> SurfaceMapping {
        SurfaceMapping {
            canvas_size: self.compositor.canvas_size(),
            displayed_width,
            displayed_height,
            view_zoom: self.view_zoom,
        }
    }

    // -----------------------------------------------------------------
    // Inputs
    // -----------------------------------------------------------------

    /// Load an uploaded dial photo, clean it with the configured
    /// [`CleanupMode`] and make it the session's dial.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the photo cannot be decoded; the previous
    /// dial stays in place.
    pub fn ingest_dial(&mut self, source: &RasterSource) -> Result<(), LoadError> {
        let photo = source.load()?;
        let cleaned = self.clean(&photo);
        log::info!(
            "ingested {}x{} dial, cleaned to {}x{} ({:?})",
            photo.width(),
            photo.height(),
            cleaned.width(),
            cleaned.height(),
            self.config.cleanup,
        );
        self.set_dial(cleaned);
        Ok(())
    }

    /// Clean a dial photo with the configured [`CleanupMode`].
    #[must_use]
    pub fn clean(&self, photo: &PixelBuffer) -> PixelBuffer {
        let engine = &self.config.engine;
        match self.config.cleanup {
            CleanupMode::Simple => segment(photo, &MaskStrategy::Flat, &engine.segment),
            CleanupMode::Enhanced => enhanced_clean(photo, &engine.segment, &engine.detector),
        }
    }

    /// Use an already-cleaned dial and re-plan the parts around it.
    ///
    /// While the view is locked the current transforms are kept.
    pub fn set_dial(&mut self, dial: PixelBuffer) {
        self.dial = Some(dial);
        if !self.placed || !self.lock_view {
            self.replan();
        }
    }

    /// Use explicit part images instead of a catalog variant.
    pub fn set_part_images(&mut self, top: PixelBuffer, bottom: PixelBuffer) {
        self.images = Some(PartImages { top, bottom });
        self.after_variant_change();
    }

    /// Load the images of the variant at the current index.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if either part image cannot be read.
    pub fn load_variant(&mut self) -> Result<(), LoadError> {
        self.show_variant(self.filter, self.index)
    }

    /// Switch category filter and show its first variant.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the variant's images cannot be read; the
    /// previous filter and variant stay selected. A filter with no variants
    /// is ignored the same way.
    pub fn select_filter(&mut self, filter: CategoryFilter) -> Result<(), LoadError> {
        self.show_variant(filter, 0)
    }

    /// Show the variant with `id`.
    ///
    /// Under [`CategoryFilter::All`] the filter is kept; otherwise it
    /// switches to the variant's category. Returns `false` if the catalog
    /// has no such variant.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the variant's images cannot be read; the
    /// previous selection stays in place.
    pub fn select_variant(&mut self, id: &str) -> Result<bool, LoadError> {
        let Some(variant) = self.config.catalog.find(id) else {
            return Ok(false);
        };
        let filter = match self.filter {
            CategoryFilter::All => CategoryFilter::All,
            CategoryFilter::Only(_) => CategoryFilter::Only(variant.category),
        };
        let index = self
            .config
            .catalog
            .variants(filter)
            .iter()
            .position(|v| v.id == id)
            .unwrap_or(0);
        self.show_variant(filter, index)?;
        Ok(true)
    }

    /// Step to the previous or next variant, wrapping around within the
    /// active filter.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the new variant's images cannot be read;
    /// the previous variant stays selected.
    pub fn cycle_variant(&mut self, direction: CycleDirection) -> Result<(), LoadError> {
        let count = self.config.catalog.variants(self.filter).len();
        self.show_variant(self.filter, cycle(self.index, count, direction))
    }

    /// Wheel input over the preview: a debounced variant step.
    ///
    /// Returns the step taken, if any.
    ///
    /// # Errors
    ///
    /// As for [`Session::cycle_variant`].
    pub fn wheel(
        &mut self,
        delta_y: f64,
        now: Instant,
    ) -> Result<Option<CycleDirection>, LoadError> {
        let Some(direction) = self.controller.wheel(delta_y, now) else {
            return Ok(None);
        };
        self.cycle_variant(direction)?;
        Ok(Some(direction))
    }

    fn show_variant(&mut self, filter: CategoryFilter, index: usize) -> Result<(), LoadError> {
        let variants = self.config.catalog.variants(filter);
        let Some(variant) = variants.get(index) else {
            log::warn!("no strap variants under {filter}, keeping {}", self.filter);
            return Ok(());
        };
        let top = load_path(&self.config.asset_root.join(&variant.top))?;
        let bottom = load_path(&self.config.asset_root.join(&variant.bottom))?;
        log::debug!("showing variant {:?} ({filter}, #{index})", variant.id);

        self.filter = filter;
        self.index = index;
        self.images = Some(PartImages { top, bottom });
        self.after_variant_change();
        Ok(())
    }

    fn after_variant_change(&mut self) {
        let keep = self.preserve_adjustments || self.lock_view;
        if !self.placed || !keep {
            self.replan();
        }
    }

    // -----------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------

    /// Re-run auto-placement for the current dial and parts.
    ///
    /// Returns `false` (and changes nothing) while the view is locked or
    /// before both the dial and the part images are available.
    pub fn auto_align(&mut self) -> bool {
        !self.lock_view && self.replan()
    }

    /// Re-run auto-placement and restore the dial size multiplier.
    ///
    /// Returns `false` under the same conditions as
    /// [`Session::auto_align`].
    pub fn reset(&mut self) -> bool {
        if !self.auto_align() {
            return false;
        }
        self.dial_scale = 1.0;
        true
    }

    fn replan(&mut self) -> bool {
        let (Some(dial), Some(images)) = (&self.dial, &self.images) else {
            return false;
        };
        self.parts = plan(dial, &images.top, &images.bottom, &self.config.engine);
        self.placed = true;
        true
    }

    // -----------------------------------------------------------------
    // Pointer gestures
    // -----------------------------------------------------------------

    /// Pointer pressed on the preview. Returns the drag mode started, or
    /// `None` while the view is locked.
    pub fn pointer_down(
        &mut self,
        event: PointerEvent,
        mapping: &SurfaceMapping,
    ) -> Option<DragMode> {
        if self.lock_view {
            return None;
        }
        let sizes = self.part_sizes();
        Some(
            self.controller
                .pointer_down(event, mapping, &self.parts, sizes),
        )
    }

    /// Pointer moved. Returns `true` if the parts changed.
    pub fn pointer_move(&mut self, event: PointerEvent, mapping: &SurfaceMapping) -> bool {
        if self.lock_view {
            return false;
        }
        match self.controller.pointer_move(event, mapping, &self.parts) {
            Some(next) => {
                self.parts = next;
                true
            }
            None => false,
        }
    }

    /// Pointer released. Returns `true` if it ended the active drag.
    pub fn pointer_up(&mut self, pointer_id: u64) -> bool {
        self.controller.pointer_up(pointer_id)
    }

    /// Pointer cancelled. Returns `true` if it ended the active drag.
    pub fn pointer_cancel(&mut self, pointer_id: u64) -> bool {
        self.controller.pointer_cancel(pointer_id)
    }

    // -----------------------------------------------------------------
    // Controls
    // -----------------------------------------------------------------

    /// Centre-to-centre vertical distance between the parts.
    #[must_use]
    pub fn gap(&self) -> f64 {
        self.parts.bottom.y - self.parts.top.y
    }

    /// Spread the parts to `gap` apart about their current midpoint.
    ///
    /// Returns `false` while the view is locked.
    pub fn set_gap(&mut self, gap: f64) -> bool {
        if self.lock_view {
            return false;
        }
        let gap = self.config.engine.ranges.gap.clamp(gap);
        let mid = (self.parts.top.y + self.parts.bottom.y) / 2.0;
        let PartPair { top, bottom } = self.parts;
        self.parts = PartPair::new(
            top.with_position(top.x, mid - gap / 2.0),
            bottom.with_position(bottom.x, mid + gap / 2.0),
        );
        true
    }

    /// Average scale of the two parts.
    #[must_use]
    pub fn strap_size(&self) -> f64 {
        (self.parts.top.scale + self.parts.bottom.scale) / 2.0
    }

    /// Shift both part scales by the same amount so their average becomes
    /// `size`, each clamped to the part scale range.
    ///
    /// Returns `false` while the view is locked.
    pub fn set_strap_size(&mut self, size: f64) -> bool {
        if self.lock_view {
            return false;
        }
        let range = self.config.engine.ranges.part_scale;
        let delta = range.clamp(size) - self.strap_size();
        self.parts = self
            .parts
            .map(|part| part.with_scale(range.clamp(part.scale + delta)));
        true
    }

    /// Set the dial fit multiplier. Returns `false` while the view is
    /// locked.
    pub fn set_dial_scale(&mut self, scale: f64) -> bool {
        if self.lock_view {
            return false;
        }
        self.dial_scale = self.config.engine.ranges.dial_scale.clamp(scale);
        true
    }

    /// Set the whole-view zoom. Always allowed.
    pub fn set_view_zoom(&mut self, zoom: f64) {
        self.view_zoom = self.config.engine.ranges.view_zoom.clamp(zoom);
    }

    /// Rotate one part. Returns `false` while the view is locked.
    pub fn set_rotation(&mut self, part: PartId, degrees: f64) -> bool {
        let rotation = self.config.engine.ranges.rotation.clamp(degrees);
        self.edit_part(part, |t| PartTransform { rotation, ..t })
    }

    /// Set one part's opacity. Returns `false` while the view is locked.
    pub fn set_opacity(&mut self, part: PartId, opacity: f64) -> bool {
        let opacity = self.config.engine.ranges.opacity.clamp(opacity);
        self.edit_part(part, |t| PartTransform { opacity, ..t })
    }

    fn edit_part(&mut self, part: PartId, f: impl FnOnce(PartTransform) -> PartTransform) -> bool {
        if self.lock_view {
            return false;
        }
        self.parts = self.parts.with(part, f(self.parts.get(part)));
        true
    }

    /// Override the variant's tint; `None` restores it.
    pub fn set_tint(&mut self, tint: Option<Tint>) {
        self.tint_override = tint.map(|t| Tint {
            alpha: t.alpha.clamp(0.0, 1.0),
            ..t
        });
    }

    /// Enable or disable preserve-adjustments mode.
    pub const fn set_preserve_adjustments(&mut self, preserve: bool) {
        self.preserve_adjustments = preserve;
    }

    /// Lock or unlock the view. Locking ends any drag in progress.
    pub fn set_lock_view(&mut self, lock: bool) {
        if lock && let Gesture::Dragging { pointer_id, .. } = *self.controller.gesture() {
            self.controller.pointer_cancel(pointer_id);
        }
        self.lock_view = lock;
    }

    // -----------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------

    /// Draw the current state without touching the frame slot.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::MissingLayer`] before a dial and a variant
    /// are loaded, or the compositor's errors.
    pub fn draw(&self) -> Result<PixelBuffer, RenderError> {
        let dial = self.dial.as_ref().ok_or(RenderError::MissingLayer("dial"))?;
        let images = self
            .images
            .as_ref()
            .ok_or(RenderError::MissingLayer("strap part"))?;
        self.compositor.render(
            Layers {
                dial,
                top: &images.top,
                bottom: &images.bottom,
            },
            &self.view(),
        )
    }

    /// Draw the current state and make it the shown frame.
    ///
    /// # Errors
    ///
    /// As for [`Session::draw`]; on failure the previous frame stays
    /// current.
    pub fn render(&mut self) -> Result<(), RenderError> {
        let ticket = self.frames.begin();
        let frame = self.draw()?;
        self.frames.complete(ticket, frame);
        Ok(())
    }

    /// The most recently rendered frame.
    #[must_use]
    pub const fn frame(&self) -> Option<&PixelBuffer> {
        self.frames.current()
    }
}
