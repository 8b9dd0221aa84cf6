//! strapfit-engine: Watch strap preview engine (sans-IO).
//!
//! Layers two strap-part images onto a watch dial photo:
//! load -> clean background -> detect dial -> plan part placement ->
//! composite under interactive transforms.
//!
//! Apart from reading a single raster file in [`raster`], this crate has
//! **no I/O** -- it operates on in-memory buffers and returns structured
//! data. Encoding the composite for download lives in `strapfit-export`.
//!
//! The one-shot entry points are [`segment`](segment::segment),
//! [`detect`](detect::detect), [`plan`](placement::plan) and
//! [`Compositor::render`]. [`Session`] wires them together with the
//! interaction controller and the strap catalog.

pub mod catalog;
pub mod compose;
pub mod detect;
pub mod downsample;
pub mod grayscale;
pub mod integral;
pub mod interaction;
pub mod placement;
pub mod raster;
pub mod segment;
pub mod session;
pub mod types;

pub use catalog::{CategoryFilter, StrapCatalog, StrapCategory, StrapVariant, TINT_PRESETS};
pub use compose::{Compositor, FrameSlot, Layers, Sources, View, stack_parts};
pub use detect::{DialDetection, detect, detect_dial, enhanced_clean};
pub use interaction::{
    CycleDirection, DragMode, InteractionController, PointerEvent, SurfaceMapping,
};
pub use placement::{fit_dial, plan};
pub use raster::{RasterSource, load};
pub use segment::{BackgroundMask, MaskStrategy, segment};
pub use session::{CleanupMode, Session, SessionConfig};
pub use types::{
    DetectionResult, DialRect, Dimensions, EngineConfig, LoadError, PartId, PartPair,
    PartTransform, PixelBuffer, Point, RenderError, Rgb, Tint,
};
