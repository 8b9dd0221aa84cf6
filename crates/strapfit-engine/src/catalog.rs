//! Strap variants, grouped by material category, and the tint presets.
//!
//! A catalog is plain data: each variant names its two part images by
//! path and carries an optional tint. Catalogs are loaded from JSON or
//! built with [`StrapCatalog::sample`]; nothing here touches the image
//! files themselves.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{ColorParseError, Rgb, Tint};

/// Material category of a strap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrapCategory {
    /// Leather straps.
    Leather,
    /// Rubber and silicone straps.
    Rubber,
    /// Fabric straps (NATO and similar).
    Fabric,
    /// Metal bracelets.
    Metal,
}

impl StrapCategory {
    /// Every category, in display order.
    pub const ALL: [Self; 4] = [Self::Leather, Self::Rubber, Self::Fabric, Self::Metal];
}

impl fmt::Display for StrapCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leather => f.write_str("Leather"),
            Self::Rubber => f.write_str("Rubber"),
            Self::Fabric => f.write_str("Fabric"),
            Self::Metal => f.write_str("Metal"),
        }
    }
}

/// Which variants are browsable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryFilter {
    /// Every category concatenated in [`StrapCategory::ALL`] order.
    All,
    /// A single category.
    Only(StrapCategory),
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self::Only(StrapCategory::Leather)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All categories"),
            Self::Only(category) => write!(f, "{category}"),
        }
    }
}

/// A named tint offered by the style picker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TintPreset {
    /// Display name.
    pub name: &'static str,
    /// Overlay colour and strength.
    pub tint: Tint,
}

const fn preset(name: &'static str, rgb: [u8; 3], alpha: f64) -> TintPreset {
    TintPreset {
        name,
        tint: Tint {
            color: Rgb(rgb),
            alpha,
        },
    }
}

/// Built-in material tints. The first entry leaves parts untouched.
pub const TINT_PRESETS: [TintPreset; 7] = [
    preset("Original", [0x00, 0x00, 0x00], 0.0),
    preset("Black Leather", [0x11, 0x11, 0x11], 0.3),
    preset("Brown Leather", [0x6f, 0x4a, 0x2f], 0.28),
    preset("Olive NATO", [0x5f, 0x6b, 0x42], 0.3),
    preset("Steel", [0x8b, 0x93, 0x9d], 0.22),
    preset("Rubber", [0x1f, 0x1f, 0x1f], 0.36),
    preset("Suede", [0x8e, 0x6c, 0x55], 0.25),
];

/// Look up a tint preset by name, ignoring ASCII case.
#[must_use]
pub fn tint_preset(name: &str) -> Option<Tint> {
    TINT_PRESETS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
        .map(|p| p.tint)
}

/// One strap option: a pair of part images plus an optional tint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrapVariant {
    /// Stable identifier, unique within a catalog.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Material category.
    pub category: StrapCategory,
    /// Image drawn above the dial.
    pub top: PathBuf,
    /// Image drawn below the dial.
    pub bottom: PathBuf,
    /// Tint applied when this variant is shown.
    #[serde(default)]
    pub tint: Tint,
}

/// Errors raised while loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The JSON could not be parsed.
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A tint colour was not a hex colour.
    #[error("variant {id:?}: {source}")]
    InvalidColor {
        /// Variant carrying the bad colour.
        id: String,
        /// Parse failure.
        source: ColorParseError,
    },

    /// Two variants share an id.
    #[error("duplicate variant id {0:?}")]
    DuplicateId(String),

    /// The catalog has no variants.
    #[error("catalog contains no variants")]
    Empty,
}

/// On-disk form of a variant: colours stay strings until validated so a
/// bad colour can be reported against its variant.
#[derive(Deserialize)]
struct RawVariant {
    id: String,
    label: String,
    category: StrapCategory,
    top: PathBuf,
    bottom: PathBuf,
    #[serde(default)]
    tint: Option<RawTint>,
}

#[derive(Deserialize)]
struct RawTint {
    color: String,
    alpha: f64,
}

#[derive(Deserialize)]
struct RawCatalog {
    variants: Vec<RawVariant>,
}

/// All strap variants, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrapCatalog {
    variants: Vec<StrapVariant>,
}

impl StrapCatalog {
    /// Catalog from already-validated variants.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Empty`] for an empty list and
    /// [`CatalogError::DuplicateId`] if two variants share an id.
    pub fn new(variants: Vec<StrapVariant>) -> Result<Self, CatalogError> {
        if variants.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (i, variant) in variants.iter().enumerate() {
            if variants[..i].iter().any(|v| v.id == variant.id) {
                return Err(CatalogError::DuplicateId(variant.id.clone()));
            }
        }
        Ok(Self { variants })
    }

    /// Parse a catalog of the form
    /// `{ "variants": [{ "id", "label", "category", "top", "bottom", "tint"? }] }`
    /// where `tint` is `{ "color": "#rrggbb", "alpha": 0.3 }`.
    ///
    /// Tint alpha is clamped to `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Json`] for malformed JSON,
    /// [`CatalogError::InvalidColor`] for a bad tint colour, and the
    /// errors of [`StrapCatalog::new`].
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(json)?;
        let variants = raw
            .variants
            .into_iter()
            .map(|v| {
                let tint = match v.tint {
                    None => Tint::NONE,
                    Some(t) => Tint {
                        color: t.color.parse().map_err(|source| CatalogError::InvalidColor {
                            id: v.id.clone(),
                            source,
                        })?,
                        alpha: t.alpha.clamp(0.0, 1.0),
                    },
                };
                Ok(StrapVariant {
                    id: v.id,
                    label: v.label,
                    category: v.category,
                    top: v.top,
                    bottom: v.bottom,
                    tint,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;
        let catalog = Self::new(variants)?;
        log::debug!("loaded catalog with {} variants", catalog.len());
        Ok(catalog)
    }

    /// The built-in demo catalog.
    ///
    /// Part images are referenced relative to an asset directory:
    /// `sample-strap-{a,b}.png` for textile and leather straps and
    /// `metal-strap-{a,b}.png` for bracelets.
    #[must_use]
    pub fn sample() -> Self {
        let variant = |id: &str, label: &str, category: StrapCategory, tint: Tint| {
            let stem = if category == StrapCategory::Metal {
                "metal-strap"
            } else {
                "sample-strap"
            };
            StrapVariant {
                id: id.to_owned(),
                label: label.to_owned(),
                category,
                top: PathBuf::from(format!("{stem}-a.png")),
                bottom: PathBuf::from(format!("{stem}-b.png")),
                tint,
            }
        };
        let [original, black, brown, olive, steel, rubber, suede] = TINT_PRESETS.map(|p| p.tint);
        Self {
            variants: vec![
                variant("leather-classic", "Classic Leather", StrapCategory::Leather, original),
                variant("leather-black", "Black Leather", StrapCategory::Leather, black),
                variant("leather-brown", "Brown Leather", StrapCategory::Leather, brown),
                variant("leather-suede", "Suede", StrapCategory::Leather, suede),
                variant("rubber-sport", "Sport Rubber", StrapCategory::Rubber, rubber),
                variant("fabric-nato", "NATO Fabric", StrapCategory::Fabric, olive),
                variant("metal-bracelet", "Steel Bracelet", StrapCategory::Metal, original),
                variant("metal-brushed", "Brushed Steel", StrapCategory::Metal, steel),
            ],
        }
    }

    /// Number of variants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Whether the catalog is empty (never true for a constructed catalog).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Variants visible under `filter`, in browsing order.
    #[must_use]
    pub fn variants(&self, filter: CategoryFilter) -> Vec<&StrapVariant> {
        match filter {
            CategoryFilter::Only(category) => self
                .variants
                .iter()
                .filter(|v| v.category == category)
                .collect(),
            CategoryFilter::All => StrapCategory::ALL
                .iter()
                .flat_map(|&category| self.variants.iter().filter(move |v| v.category == category))
                .collect(),
        }
    }

    /// Variant by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&StrapVariant> {
        self.variants.iter().find(|v| v.id == id)
    }
}
