//! Filename dimension hints.
//!
//! The host writes intermediate sizes next to the original with a `-WxH`
//! suffix before the extension:
//! - `photo.jpg` → original
//! - `photo-300x200.jpg` → 300×200 derivative
//!
//! Content often references those derivatives directly. Parsing the suffix
//! recovers the intended display size, and stripping it recovers the
//! original so the proxy resizes from full resolution.

use crate::secure_url::{image_is_local, strip_http_scheme};
use crate::types::Dimensions;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static SIZE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(-(\d+)x(\d+))\.(?:gif|jpg|jpeg|png)$").expect("size suffix pattern")
});

/// Dimensions encoded in a `-WxH.ext` suffix, when both are non-zero.
///
/// - `"a-300x200.jpg"` → `Some(300×200)`
/// - `"a-0x200.jpg"` → `None`
/// - `"a-300x200.webp"` → `None`
pub fn parse_dimensions_from_filename(src: &str) -> Option<Dimensions> {
    let caps = SIZE_SUFFIX.captures(src)?;
    let width: u32 = caps[2].parse().ok()?;
    let height: u32 = caps[3].parse().ok()?;
    (width > 0 && height > 0).then(|| Dimensions::new(width, height))
}

/// Remove a `-WxH` suffix from a local image URL when the undecorated file
/// exists under `base_dir`.
///
/// Remote URLs, URLs without a suffix and URLs whose original is missing on
/// disk are returned unchanged. Without a `base_dir` nothing can be checked,
/// so nothing is stripped.
pub fn strip_image_dimensions(src: &str, base_url: &str, base_dir: Option<&Path>) -> String {
    let Some(base_dir) = base_dir else {
        return src.to_string();
    };
    if !image_is_local(src, base_url) {
        return src.to_string();
    }
    let Some(suffix) = SIZE_SUFFIX.captures(src).and_then(|c| c.get(1)) else {
        return src.to_string();
    };

    // Every occurrence goes, matching how the host builds derivative names.
    let stripped = src.replace(suffix.as_str(), "");
    let base = strip_http_scheme(base_url);
    let relative = stripped
        .find(base)
        .map_or("", |at| &stripped[at + base.len()..]);
    let candidate = base_dir.join(relative.trim_start_matches('/'));

    if candidate.is_file() {
        stripped
    } else {
        src.to_string()
    }
}
