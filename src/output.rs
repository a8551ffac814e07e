//! CLI output formatting for all commands.
//!
//! # Output Format
//!
//! ## Resolve
//!
//! ```text
//! medium → http://site/up/a.jpg?w=300&h=150
//!     Size: 300×150
//!     Intermediate: yes
//! ```
//!
//! ## Srcset
//!
//! ```text
//! 300w → http://site/up/a.jpg?w=300&h=200&crop=1
//! 2x → http://site/safe_image?url=...&crop=1
//! ```
//!
//! ## Dimensions
//!
//! ```text
//! https://cdn.test/og.png → 1200×630
//! ```
//!
//! ## Sizes
//!
//! ```text
//! thumb       150×150  crop center/center
//! medium      300×300
//! full        original
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::sizes::{Crop, CropX, CropY, FULL, SizeDefinition, SizeRegistry};
use crate::srcset::SrcsetCandidate;
use crate::types::{Dimensions, DownsizedImage, SizeSpec};

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn format_side(side: Option<u32>) -> String {
    side.map_or_else(|| "auto".to_string(), |px| px.to_string())
}

fn size_label(spec: &SizeSpec) -> String {
    match spec {
        SizeSpec::Named(name) => name.clone(),
        SizeSpec::Explicit { width, height } => {
            format!("{}×{}", format_side(*width), format_side(*height))
        }
    }
}

fn crop_label(crop: Crop) -> Option<String> {
    let (x, y) = crop.anchor()?;
    let x = match x {
        CropX::Left => "left",
        CropX::Center => "center",
        CropX::Right => "right",
    };
    let y = match y {
        CropY::Top => "top",
        CropY::Center => "center",
        CropY::Bottom => "bottom",
    };
    Some(format!("crop {x}/{y}"))
}

// ============================================================================
// Resolve
// ============================================================================

pub fn format_resolved(spec: &SizeSpec, image: &DownsizedImage) -> Vec<String> {
    vec![
        format!("{} → {}", size_label(spec), image.url),
        format!(
            "{}Size: {}×{}",
            indent(1),
            format_side(image.width),
            format_side(image.height)
        ),
        format!(
            "{}Intermediate: {}",
            indent(1),
            if image.is_intermediate { "yes" } else { "no" }
        ),
    ]
}

pub fn print_resolved(spec: &SizeSpec, image: &DownsizedImage) {
    for line in format_resolved(spec, image) {
        println!("{}", line);
    }
}

// ============================================================================
// Srcset
// ============================================================================

pub fn format_srcset_output(candidates: &[SrcsetCandidate]) -> Vec<String> {
    candidates
        .iter()
        .map(|c| format!("{}{} → {}", c.value, c.descriptor.suffix(), c.url))
        .collect()
}

pub fn print_srcset_output(candidates: &[SrcsetCandidate]) {
    for line in format_srcset_output(candidates) {
        println!("{}", line);
    }
}

// ============================================================================
// Dimensions
// ============================================================================

pub fn format_dimensions(url: &str, dims: Dimensions) -> String {
    format!("{url} → {}×{}", dims.width, dims.height)
}

// ============================================================================
// Sizes
// ============================================================================

fn size_line(name: &str, def: &SizeDefinition, width: usize) -> String {
    if name == FULL {
        return format!("{name:<width$}  original");
    }
    let mut line = format!(
        "{name:<width$}  {}×{}",
        format_side(Some(def.width).filter(|&w| w > 0)),
        format_side(Some(def.height).filter(|&h| h > 0))
    );
    if let Some(crop) = crop_label(def.crop) {
        line.push_str("  ");
        line.push_str(&crop);
    }
    line
}

pub fn format_sizes(registry: &SizeRegistry) -> Vec<String> {
    let width = registry.names().iter().map(|n| n.len()).max().unwrap_or(0);
    registry
        .iter()
        .map(|(name, def)| size_line(name, def, width))
        .collect()
}

pub fn print_sizes(registry: &SizeRegistry) {
    for line in format_sizes(registry) {
        println!("{}", line);
    }
}
