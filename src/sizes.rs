//! Named image sizes and size resolution.
//!
//! The host registers logical sizes (`thumbnail`, `medium`, `large`, plus any
//! theme-defined extras). A request for an image names one of those sizes or
//! asks for an explicit box, and [`resolve`] turns that request plus the
//! original's dimensions (when known) into the width, height and crop flag
//! sent to the resizing proxy.
//!
//! ## Resolution rules
//!
//! | Request | Original known | Result |
//! |---|---|---|
//! | named, not `full` | yes | fit into the size's box (exact box when cropping); declared box if the fit would upscale |
//! | named, not `full` | no | declared box |
//! | `full` | yes | original size, not intermediate |
//! | `full` | no | no size, not intermediate |
//! | explicit | yes | fit into the requested box, original size if the fit would upscale |
//! | explicit | no | requested box |
//!
//! Every result is then clamped to the size's display maximum. `large` is
//! additionally capped at the page content width when one is configured.
//!
//! ## Registry lifetime
//!
//! Building the registry reads settings, so callers keep it in a
//! [`RegistryCell`]: populated on first use and immutable afterwards. A reset
//! is explicit.

use crate::imaging::{constrain_dimensions, resize_dimensions};
use crate::types::{Dimensions, ResolvedTarget, SizeSpec, non_zero};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Name of the size that always means "the original".
pub const FULL: &str = "full";

/// Horizontal crop anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropX {
    Left,
    Center,
    Right,
}

/// Vertical crop anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropY {
    Top,
    Center,
    Bottom,
}

/// Cropping policy of a size.
///
/// Config files write it as `crop = true`/`false` or as an anchor pair such
/// as `crop = ["left", "top"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "CropRepr", into = "CropRepr")]
pub enum Crop {
    #[default]
    None,
    Center,
    At(CropX, CropY),
}

impl Crop {
    /// Whether the output is cropped to the exact box.
    pub fn is_crop(self) -> bool {
        !matches!(self, Crop::None)
    }

    /// Crop anchor, `None` when not cropping.
    pub fn anchor(self) -> Option<(CropX, CropY)> {
        match self {
            Crop::None => None,
            Crop::Center => Some((CropX::Center, CropY::Center)),
            Crop::At(x, y) => Some((x, y)),
        }
    }
}

impl From<bool> for Crop {
    fn from(crop: bool) -> Self {
        if crop { Crop::Center } else { Crop::None }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum CropRepr {
    Flag(bool),
    Anchor(CropX, CropY),
}

impl From<CropRepr> for Crop {
    fn from(repr: CropRepr) -> Self {
        match repr {
            CropRepr::Flag(flag) => flag.into(),
            CropRepr::Anchor(x, y) => Crop::At(x, y),
        }
    }
}

impl From<Crop> for CropRepr {
    fn from(crop: Crop) -> Self {
        match crop {
            Crop::None => CropRepr::Flag(false),
            Crop::Center => CropRepr::Flag(true),
            Crop::At(x, y) => CropRepr::Anchor(x, y),
        }
    }
}

/// Declared box of a named size. `0` means unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizeDefinition {
    pub width: u32,
    pub height: u32,
    pub crop: Crop,
}

impl SizeDefinition {
    pub fn new(width: u32, height: u32, crop: impl Into<Crop>) -> Self {
        Self {
            width,
            height,
            crop: crop.into(),
        }
    }
}

/// Ordered mapping of size name → definition.
///
/// Always holds `thumb`, `medium`, `large`, `full` and `thumbnail` (an alias
/// of `thumb`), in that order, followed by registered extras.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeRegistry {
    entries: Vec<(String, SizeDefinition)>,
    content_width: Option<u32>,
}

impl SizeRegistry {
    pub fn new(thumbnail: SizeDefinition, medium: SizeDefinition, large: SizeDefinition) -> Self {
        // medium and large never crop
        let medium = SizeDefinition {
            crop: Crop::None,
            ..medium
        };
        let large = SizeDefinition {
            crop: Crop::None,
            ..large
        };
        Self {
            entries: vec![
                ("thumb".to_string(), thumbnail),
                ("medium".to_string(), medium),
                ("large".to_string(), large),
                (FULL.to_string(), SizeDefinition::default()),
                ("thumbnail".to_string(), thumbnail),
            ],
            content_width: None,
        }
    }

    /// Cap the display width of `large` at the page content width.
    pub fn with_content_width(mut self, content_width: Option<u32>) -> Self {
        self.content_width = content_width.and_then(non_zero);
        self
    }

    /// Add or replace a named size. Replacing keeps the original position.
    pub fn register(&mut self, name: impl Into<String>, definition: SizeDefinition) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = definition,
            None => self.entries.push((name, definition)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SizeDefinition> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, def)| def)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SizeDefinition)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Maximum display box for a request. `(0, 0)` leaves sizes untouched.
    fn display_max(&self, spec: &SizeSpec, current: (u32, u32)) -> (u32, u32) {
        match spec {
            SizeSpec::Named(name) => match self.get(name) {
                Some(def) if name == "large" => {
                    let width = match self.content_width {
                        Some(cw) => cw.min(def.width),
                        None => def.width,
                    };
                    (width, def.height)
                }
                Some(def) => (def.width, def.height),
                None => current,
            },
            SizeSpec::Explicit { width, height } => (width.unwrap_or(0), height.unwrap_or(0)),
        }
    }
}

/// Lazily populated, then immutable, size registry.
#[derive(Debug, Default)]
pub struct RegistryCell {
    cell: OnceLock<SizeRegistry>,
}

impl RegistryCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the registry, building it with `init` on first use only.
    pub fn get_or_init(&self, init: impl FnOnce() -> SizeRegistry) -> &SizeRegistry {
        self.cell.get_or_init(init)
    }

    pub fn is_populated(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Drop the cached registry so the next access rebuilds it.
    pub fn reset(&mut self) {
        self.cell.take();
    }
}

/// Resolve a size request against the registry.
///
/// Returns `None` for a named size the registry does not know.
pub fn resolve(
    spec: &SizeSpec,
    original: Option<Dimensions>,
    registry: &SizeRegistry,
) -> Option<ResolvedTarget> {
    let original = original.map(|d| (d.width, d.height));

    let (width, height, crop, is_intermediate) = match spec {
        SizeSpec::Named(name) => {
            let def = registry.get(name)?;
            let (mut width, mut height) = (def.width, def.height);
            let mut is_intermediate = true;

            if name == FULL {
                is_intermediate = false;
                if let Some(orig) = original {
                    (width, height) = orig;
                }
            } else if let Some(orig) = original
                && let Some(resized) = resize_dimensions(orig, (width, height), def.crop)
            {
                width = resized.width;
                height = resized.height;
            }

            (width, height, def.crop.is_crop(), is_intermediate)
        }
        SizeSpec::Explicit {
            width: req_w,
            height: req_h,
        } => {
            let requested = (req_w.unwrap_or(0), req_h.unwrap_or(0));
            let is_intermediate = requested != (0, 0);

            let (width, height) = match original {
                Some(orig) => resize_dimensions(orig, requested, Crop::None)
                    .map(|r| (r.width, r.height))
                    .unwrap_or(orig),
                None => requested,
            };

            (width, height, false, is_intermediate)
        }
    };

    let max = registry.display_max(spec, (width, height));
    let (width, height) = constrain_dimensions((width, height), max);

    Some(ResolvedTarget {
        width: non_zero(width),
        height: non_zero(height),
        crop,
        is_intermediate,
    })
}
