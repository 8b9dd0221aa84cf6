//! Shared types for the strapfit engine.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::downsample::DownsampleFilter;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference decoded
/// sources without depending on `image` directly.
pub use image::RgbaImage;

/// A decoded raster: width, height and 8-bit RGBA samples.
///
/// Buffers are never mutated after being handed to a consumer; masking,
/// cropping and compositing always produce a new buffer.
pub type PixelBuffer = RgbaImage;

/// A 2D point in pixel or canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create dimensions from a width and height.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of a decoded buffer.
    #[must_use]
    pub fn of(buffer: &PixelBuffer) -> Self {
        Self::new(buffer.width(), buffer.height())
    }

    /// The shorter side as `f64`.
    #[must_use]
    pub fn shorter_dim(self) -> f64 {
        f64::from(self.width.min(self.height))
    }
}

/// Axis-aligned rectangle in `f64` coordinates.
///
/// Used both for the detected dial box in source-image pixels and for the
/// fitted dial box on the canonical canvas; each producer documents which
/// space it returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DialRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl DialRect {
    /// Square of side `side` centred on `center`.
    #[must_use]
    pub fn square_around(center: Point, side: f64) -> Self {
        Self {
            x: center.x - side / 2.0,
            y: center.y - side / 2.0,
            width: side,
            height: side,
        }
    }

    /// Centre of the rectangle.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Bottom edge (`y + height`).
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Right edge (`x + width`).
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Whether `p` lies inside or on the border.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }
}

/// Integer pixel rectangle inside a [`PixelBuffer`], used for crops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Width in pixels (at least 1 for a usable crop).
    pub width: u32,
    /// Height in pixels (at least 1 for a usable crop).
    pub height: u32,
}

impl PixelRect {
    /// Rectangle from inclusive corner coordinates.
    #[must_use]
    pub const fn from_corners(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        }
    }

    /// Copy of `buffer` restricted to this rectangle.
    #[must_use]
    pub fn crop(&self, buffer: &PixelBuffer) -> PixelBuffer {
        image::imageops::crop_imm(buffer, self.x, self.y, self.width, self.height).to_image()
    }
}

/// Best circular candidate found by the dial detector, in detection-space
/// (downscaled) pixel coordinates.
///
/// `score` is a relative ranking value, not a probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Candidate centre, horizontal.
    pub center_x: f64,
    /// Candidate centre, vertical.
    pub center_y: f64,
    /// Candidate radius (never negative).
    pub radius: f64,
    /// `ring_weight * ring_energy + contrast_weight * contrast`.
    pub score: f64,
}

/// Placement of one strap part relative to the canvas centre.
///
/// Instances are replaced wholesale on every edit; nothing holds a
/// reference into a live transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartTransform {
    /// Draw size in percent of the part's native size (> 0).
    pub scale: f64,
    /// Horizontal offset from the canvas centre.
    pub x: f64,
    /// Vertical offset from the canvas centre.
    pub y: f64,
    /// Clockwise rotation in degrees, -180..=180.
    pub rotation: f64,
    /// 0.0 (invisible) to 1.0 (opaque).
    pub opacity: f64,
}

impl PartTransform {
    /// Transform at native size with no rotation, fully opaque.
    #[must_use]
    pub const fn at(x: f64, y: f64) -> Self {
        Self {
            scale: 100.0,
            x,
            y,
            rotation: 0.0,
            opacity: 1.0,
        }
    }

    /// Copy with a new position.
    #[must_use]
    pub const fn with_position(self, x: f64, y: f64) -> Self {
        Self { x, y, ..self }
    }

    /// Copy with a new scale.
    #[must_use]
    pub const fn with_scale(self, scale: f64) -> Self {
        Self { scale, ..self }
    }

    /// Native part size after applying `scale`.
    #[must_use]
    pub fn scaled_size(&self, native: Dimensions) -> (f64, f64) {
        let factor = self.scale / 100.0;
        (
            f64::from(native.width) * factor,
            f64::from(native.height) * factor,
        )
    }

    /// Axis-aligned on-canvas bounds of the part, ignoring rotation.
    #[must_use]
    pub fn bounds(&self, native: Dimensions, canvas_size: u32) -> DialRect {
        let (w, h) = self.scaled_size(native);
        let half = f64::from(canvas_size) / 2.0;
        DialRect {
            x: half + self.x - w / 2.0,
            y: half + self.y - h / 2.0,
            width: w,
            height: h,
        }
    }
}

/// Which of the two strap parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartId {
    /// The "12 o'clock" part above the dial.
    Top,
    /// The "6 o'clock" part below the dial.
    Bottom,
}

/// The two part transforms; they always exist together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartPair {
    /// Part drawn above the dial.
    pub top: PartTransform,
    /// Part drawn below the dial.
    pub bottom: PartTransform,
}

impl PartPair {
    /// Pair from two transforms.
    #[must_use]
    pub const fn new(top: PartTransform, bottom: PartTransform) -> Self {
        Self { top, bottom }
    }

    /// Transform of one part.
    #[must_use]
    pub const fn get(&self, id: PartId) -> PartTransform {
        match id {
            PartId::Top => self.top,
            PartId::Bottom => self.bottom,
        }
    }

    /// Copy with one part replaced.
    #[must_use]
    pub const fn with(self, id: PartId, transform: PartTransform) -> Self {
        match id {
            PartId::Top => Self {
                top: transform,
                ..self
            },
            PartId::Bottom => Self {
                bottom: transform,
                ..self
            },
        }
    }

    /// Copy with `f` applied to both parts.
    #[must_use]
    pub fn map(self, f: impl Fn(PartTransform) -> PartTransform) -> Self {
        Self {
            top: f(self.top),
            bottom: f(self.bottom),
        }
    }
}

/// Native sizes of the two loaded part images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSizes {
    /// Native size of the top part image.
    pub top: Dimensions,
    /// Native size of the bottom part image.
    pub bottom: Dimensions,
}

/// 8-bit RGB colour, serialized as a `#rrggbb` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub [u8; 3]);

/// A colour string could not be parsed as `#rgb` or `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex colour: {0:?}")]
pub struct ColorParseError(pub String);

impl FromStr for Rgb {
    type Err = ColorParseError;

    /// Parse `"#1a1a1a"`, `"#fff"` or either form with surrounding
    /// whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError(s.to_owned()))?;
        match hex.len() {
            3 => {
                // Short form: #rgb → #rrggbb
                let mut rgb = [0u8; 3];
                for (i, ch) in hex.chars().enumerate() {
                    let n = ch.to_digit(16).ok_or_else(|| ColorParseError(s.to_owned()))?;
                    #[expect(clippy::cast_possible_truncation)]
                    {
                        rgb[i] = (n * 17) as u8;
                    }
                }
                Ok(Self(rgb))
            }
            6 if hex.is_ascii() => {
                let r = u8::from_str_radix(&hex[0..2], 16);
                let g = u8::from_str_radix(&hex[2..4], 16);
                let b = u8::from_str_radix(&hex[4..6], 16);
                match (r, g, b) {
                    (Ok(r), Ok(g), Ok(b)) => Ok(Self([r, g, b])),
                    _ => Err(ColorParseError(s.to_owned())),
                }
            }
            _ => Err(ColorParseError(s.to_owned())),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

/// Optional flat colour overlay blended onto the strap parts.
///
/// `alpha == 0` means "no tint": parts are drawn from their source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tint {
    /// Overlay colour.
    pub color: Rgb,
    /// Overlay strength, 0.0 to 1.0.
    pub alpha: f64,
}

impl Tint {
    /// The "no tint" value.
    pub const NONE: Self = Self {
        color: Rgb([0, 0, 0]),
        alpha: 0.0,
    };

    /// Whether the tint changes any pixel.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.alpha > 0.0
    }

    /// Overlay strength clamped to 0..=1, before the part's opacity.
    #[must_use]
    pub fn strength(&self) -> f64 {
        self.alpha.clamp(0.0, 1.0)
    }
}

impl Default for Tint {
    fn default() -> Self {
        Self::NONE
    }
}

/// Inclusive numeric range used to clamp externally supplied values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl Bounds {
    /// Create a range.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp `value` into the range. `NaN` maps to `min`.
    ///
    /// Never panics, even for an inverted range loaded from config.
    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    /// Whether `value` lies inside the range.
    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Ranges for every parameter the surrounding UI can set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlRanges {
    /// Centre-to-centre distance between the two parts, canvas units.
    pub gap: Bounds,
    /// Part scale in percent (interactive edits).
    pub part_scale: Bounds,
    /// Dial fit multiplier.
    pub dial_scale: Bounds,
    /// Whole-view zoom multiplier.
    pub view_zoom: Bounds,
    /// Part rotation in degrees.
    pub rotation: Bounds,
    /// Part opacity.
    pub opacity: Bounds,
}

impl Default for ControlRanges {
    fn default() -> Self {
        Self {
            gap: Bounds::new(250.0, 900.0),
            part_scale: Bounds::new(30.0, 250.0),
            dial_scale: Bounds::new(0.7, 1.35),
            view_zoom: Bounds::new(0.62, 1.05),
            rotation: Bounds::new(-180.0, 180.0),
            opacity: Bounds::new(0.05, 1.0),
        }
    }
}

impl ControlRanges {
    /// `part` with scale, rotation and opacity clamped to their ranges.
    #[must_use]
    pub fn clamp_part(&self, part: PartTransform) -> PartTransform {
        PartTransform {
            scale: self.part_scale.clamp(part.scale),
            rotation: self.rotation.clamp(part.rotation),
            opacity: self.opacity.clamp(part.opacity),
            ..part
        }
    }
}

/// Parameters of the corner-sampled background segmenter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Euclidean RGB distance below which a pixel counts as background.
    pub threshold: f64,
    /// Pixels with every channel above this value count as background.
    pub near_white: u8,
    /// Alpha above which a pixel counts as foreground for cropping.
    pub alpha_floor: u8,
    /// Crop padding as a fraction of the larger foreground dimension.
    pub padding_fraction: f64,
    /// Corner patch side as a fraction of the shorter image side.
    pub corner_fraction: f64,
    /// Minimum corner patch side in pixels.
    pub min_corner_patch: u32,
}

impl SegmentConfig {
    /// Default colour distance threshold.
    pub const DEFAULT_THRESHOLD: f64 = 42.0;
    /// Default near-white channel cutoff.
    pub const DEFAULT_NEAR_WHITE: u8 = 245;
    /// Default foreground alpha floor.
    pub const DEFAULT_ALPHA_FLOOR: u8 = 20;
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            near_white: Self::DEFAULT_NEAR_WHITE,
            alpha_floor: Self::DEFAULT_ALPHA_FLOOR,
            padding_fraction: 0.08,
            corner_fraction: 0.03,
            min_corner_patch: 8,
        }
    }
}

/// Parameters of the circular dial detector and the enhanced cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Longest side of the detection-space copy.
    pub max_dimension: u32,
    /// Resampling filter used to build the detection-space copy.
    pub downsample_filter: DownsampleFilter,
    /// Grid stride for candidate centres, detection pixels.
    pub center_stride: u32,
    /// Grid stride for candidate radii, detection pixels.
    pub radius_stride: u32,
    /// Smallest radius as a fraction of the shorter detection side.
    pub min_radius_fraction: f64,
    /// Largest radius as a fraction of the shorter detection side.
    pub max_radius_fraction: f64,
    /// Centres are searched inside this central fraction of the image.
    pub search_fraction: f64,
    /// Gradient samples taken around each candidate circle.
    pub ring_samples: u32,
    /// Inner square half-width as a fraction of the radius.
    pub inner_fraction: f64,
    /// Outer square half-width as a fraction of the radius.
    pub outer_fraction: f64,
    /// Weight of the mean gradient magnitude on the ring.
    pub ring_weight: f64,
    /// Weight of the inner/outer mean intensity difference.
    pub contrast_weight: f64,
    /// Best scores at or below this fall back to the default rectangle.
    pub min_score: f64,
    /// Crop side as a multiple of the detected radius.
    pub crop_radius_factor: f64,
    /// Smallest crop side in source pixels.
    pub min_crop_side: f64,
    /// Radial fade begins at this multiple of the radius.
    pub fade_start: f64,
    /// Pixels beyond this multiple of the radius become transparent.
    pub fade_end: f64,
    /// Fallback dial diameter as a fraction of the shorter source side.
    pub fallback_fraction: f64,
}

impl DetectorConfig {
    /// Default longest side of the detection-space image.
    pub const DEFAULT_MAX_DIMENSION: u32 = 560;
    /// Default minimum usable score.
    pub const DEFAULT_MIN_SCORE: f64 = 8.0;
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_dimension: Self::DEFAULT_MAX_DIMENSION,
            downsample_filter: DownsampleFilter::default(),
            center_stride: 8,
            radius_stride: 3,
            min_radius_fraction: 0.08,
            max_radius_fraction: 0.24,
            search_fraction: 0.68,
            ring_samples: 36,
            inner_fraction: 0.55,
            outer_fraction: 1.18,
            ring_weight: 0.75,
            contrast_weight: 0.9,
            min_score: Self::DEFAULT_MIN_SCORE,
            crop_radius_factor: 4.8,
            min_crop_side: 380.0,
            fade_start: 1.0,
            fade_end: 1.2,
            fallback_fraction: 0.5,
        }
    }
}

/// Parameters of the auto-placement planner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Target strap width as a fraction of the fitted dial width.
    pub strap_width_fraction: f64,
    /// Planned scale range in percent.
    pub scale: Bounds,
    /// Vertical overlap as a fraction of the fitted dial height.
    pub overlap_fraction: f64,
    /// Minimum vertical overlap in canvas units.
    pub min_overlap: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            strap_width_fraction: 0.42,
            scale: Bounds::new(30.0, 230.0),
            overlap_fraction: 0.075,
            min_overlap: 12.0,
        }
    }
}

/// Parameters of the pointer/wheel interaction controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Width of the resize band around a part's left/right edges.
    pub edge_band: f64,
    /// Scale percent added per canvas unit of horizontal resize drag.
    pub resize_sensitivity: f64,
    /// Minimum interval between wheel-triggered variant steps.
    pub wheel_debounce_ms: u64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            edge_band: 28.0,
            resize_sensitivity: 0.09,
            wheel_debounce_ms: 160,
        }
    }
}

/// Complete engine configuration.
///
/// All parameters have defaults matching the tuned values of the
/// preview tool; any subset can be overridden from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Side length of the square output canvas.
    pub canvas_size: u32,
    /// Largest dial dimension as a fraction of the canvas side.
    pub dial_fit_fraction: f64,
    /// Background segmenter parameters.
    pub segment: SegmentConfig,
    /// Dial detector parameters.
    pub detector: DetectorConfig,
    /// Auto-placement parameters.
    pub placement: PlacementConfig,
    /// Pointer and wheel handling parameters.
    pub interaction: InteractionConfig,
    /// Ranges for UI-supplied values.
    pub ranges: ControlRanges,
}

impl EngineConfig {
    /// Default canvas side length.
    pub const DEFAULT_CANVAS_SIZE: u32 = 900;
    /// Default dial fit fraction.
    pub const DEFAULT_DIAL_FIT_FRACTION: f64 = 0.68;

    /// Canvas centre coordinate (same on both axes).
    #[must_use]
    pub fn canvas_center(&self) -> f64 {
        f64::from(self.canvas_size) / 2.0
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            canvas_size: Self::DEFAULT_CANVAS_SIZE,
            dial_fit_fraction: Self::DEFAULT_DIAL_FIT_FRACTION,
            segment: SegmentConfig::default(),
            detector: DetectorConfig::default(),
            placement: PlacementConfig::default(),
            interaction: InteractionConfig::default(),
            ranges: ControlRanges::default(),
        }
    }
}

/// Errors raised while turning an encoded source into a [`PixelBuffer`].
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The input bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The source file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),
}

/// Errors raised by the compositor.
///
/// A failed render draws nothing; the previous frame stays current.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A required source could not be loaded at render time.
    #[error("could not load render source: {0}")]
    Load(#[from] LoadError),

    /// A layer the frame needs has not been provided yet.
    #[error("nothing to render yet: {0} image not loaded")]
    MissingLayer(&'static str),

    /// The output surface could not be allocated.
    #[error("output surface of {width}x{height} is unavailable")]
    Surface {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}
