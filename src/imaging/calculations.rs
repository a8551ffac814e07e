//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images. They
//! use `0` for "no constraint on this side", matching how sizes are stored by
//! the host.

use crate::sizes::{Crop, CropX, CropY};

/// Round half away from zero and convert to pixels.
fn round_px(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

/// Fit `current` inside a `max` box, scaling down only.
///
/// A zero max side is unconstrained. If both max sides are zero the input is
/// returned unchanged. Zero input sides stay zero.
///
/// # Examples
/// ```
/// # use ngx_resizer::imaging::constrain_dimensions;
/// // 1200x600 into a 300x300 box → 300x150
/// assert_eq!(constrain_dimensions((1200, 600), (300, 300)), (300, 150));
///
/// // Never scales up
/// assert_eq!(constrain_dimensions((200, 100), (300, 300)), (200, 100));
/// ```
pub fn constrain_dimensions(current: (u32, u32), max: (u32, u32)) -> (u32, u32) {
    let (cur_w, cur_h) = current;
    let (max_w, max_h) = max;

    if max_w == 0 && max_h == 0 {
        return current;
    }

    let mut width_ratio = 1.0;
    let mut height_ratio = 1.0;
    let mut did_width = false;
    let mut did_height = false;

    if max_w > 0 && cur_w > 0 && cur_w > max_w {
        width_ratio = max_w as f64 / cur_w as f64;
        did_width = true;
    }
    if max_h > 0 && cur_h > 0 && cur_h > max_h {
        height_ratio = max_h as f64 / cur_h as f64;
        did_height = true;
    }

    let smaller = f64::min(width_ratio, height_ratio);
    let larger = f64::max(width_ratio, height_ratio);

    // The larger ratio only wins if it keeps both sides inside the box.
    let overflows = |ratio: f64, cur: u32, max: u32| max > 0 && round_px(cur as f64 * ratio) > max;
    let ratio = if overflows(larger, cur_w, max_w) || overflows(larger, cur_h, max_h) {
        smaller
    } else {
        larger
    };

    let scale = |cur: u32| {
        if cur == 0 {
            0
        } else {
            round_px(cur as f64 * ratio).max(1)
        }
    };
    let mut w = scale(cur_w);
    let mut h = scale(cur_h);

    // Float rounding can land one pixel short of the box edge.
    if did_width && w + 1 == max_w {
        w = max_w;
    }
    if did_height && h + 1 == max_h {
        h = max_h;
    }

    (w, h)
}

/// Source region and output size for a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeBox {
    /// Top-left corner of the region taken from the original.
    pub src_x: u32,
    pub src_y: u32,
    /// Size of the region taken from the original.
    pub crop_width: u32,
    pub crop_height: u32,
    /// Output size.
    pub width: u32,
    pub height: u32,
}

/// Compute the output size for resizing `original` to a `dest` box.
///
/// Without crop the image is fitted inside the box. With crop the output is
/// the exact box (each side capped at the original), and the source region is
/// placed according to the crop anchor.
///
/// Returns `None` when the resize is inapplicable: zero-sized original, no
/// destination constraint, or a result that would not be smaller than the
/// original.
pub fn resize_dimensions(original: (u32, u32), dest: (u32, u32), crop: Crop) -> Option<ResizeBox> {
    let (orig_w, orig_h) = original;
    let (dest_w, dest_h) = dest;

    if orig_w == 0 || orig_h == 0 {
        return None;
    }
    if dest_w == 0 && dest_h == 0 {
        return None;
    }

    let resized = match crop.anchor() {
        Some((anchor_x, anchor_y)) => {
            let aspect = orig_w as f64 / orig_h as f64;
            let mut new_w = dest_w.min(orig_w);
            let mut new_h = dest_h.min(orig_h);
            if new_w == 0 {
                new_w = round_px(new_h as f64 * aspect);
            }
            if new_h == 0 {
                new_h = round_px(new_w as f64 / aspect);
            }

            let size_ratio = f64::max(
                new_w as f64 / orig_w as f64,
                new_h as f64 / orig_h as f64,
            );
            let crop_w = round_px(new_w as f64 / size_ratio);
            let crop_h = round_px(new_h as f64 / size_ratio);

            let src_x = match anchor_x {
                CropX::Left => 0,
                CropX::Right => orig_w.saturating_sub(crop_w),
                CropX::Center => orig_w.saturating_sub(crop_w) / 2,
            };
            let src_y = match anchor_y {
                CropY::Top => 0,
                CropY::Bottom => orig_h.saturating_sub(crop_h),
                CropY::Center => orig_h.saturating_sub(crop_h) / 2,
            };

            ResizeBox {
                src_x,
                src_y,
                crop_width: crop_w,
                crop_height: crop_h,
                width: new_w,
                height: new_h,
            }
        }
        None => {
            let (new_w, new_h) = constrain_dimensions(original, dest);
            ResizeBox {
                src_x: 0,
                src_y: 0,
                crop_width: orig_w,
                crop_height: orig_h,
                width: new_w,
                height: new_h,
            }
        }
    };

    // Same size or larger is not a resize, unless one side asks for exactly
    // the original size.
    if resized.width >= orig_w && resized.height >= orig_h && dest_w != orig_w && dest_h != orig_h {
        return None;
    }

    Some(resized)
}

/// Scale `height` by the factor that takes `width` to `new_width`.
///
/// # Examples
/// ```
/// # use ngx_resizer::imaging::scale_to_width;
/// assert_eq!(scale_to_width(1000, 501, 640), 321);
/// ```
pub fn scale_to_width(width: u32, height: u32, new_width: u32) -> u32 {
    if width == 0 {
        return height;
    }
    round_px(new_width as f64 * height as f64 / width as f64)
}
