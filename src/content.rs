//! `<img>` rewriting inside HTML bodies.
//!
//! Images are found with a single pattern, optionally wrapped in an `<a>`
//! link, and handled one at a time in document order. For each image the
//! display size is derived from, in order of precedence:
//!
//! 1. `width=`/`height=` attributes on the tag
//! 2. a `size-<name>` class naming a registered size
//! 3. the natural size of the `wp-image-<id>` attachment
//! 4. the page content width
//!
//! The `src` is then pointed at the resizing proxy and numeric
//! `width`/`height` attributes are rewritten to match. The whole matched text
//! is replaced wherever it occurs, so identical tags are rewritten identically.
//!
//! Images that fail URL validation are left alone; nothing here aborts the
//! rewrite of the remaining document.

use crate::host::MediaLibrary;
use crate::imaging::scale_to_width;
use crate::naming::strip_image_dimensions;
use crate::secure_url::{SecureUrlBuilder, validate_image_url};
use crate::sizes::{FULL, SizeRegistry};
use crate::types::non_zero;
use log::debug;
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;

static IMAGE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?is)(?:<a[^>]+?href=["'](?P<link_url>[^\s]+?)["'][^>]*?>\s*)?"#,
        r#"(?P<img_tag><img[^>]*?\s+?src=["'](?P<img_url>[^\s]+?)["'].*?>)"#,
        r#"(?:\s*</a>)?"#,
    ))
    .expect("image tag pattern")
});

static WIDTH_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)width=["']?([\d%]+)["']?"#).expect("width pattern"));

static HEIGHT_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)height=["']?([\d%]+)["']?"#).expect("height pattern"));

static SIZE_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)class=["']?[^"']*size-([^"'\s]+)[^"']*["']?"#).expect("size class pattern")
});

static ATTACHMENT_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)class=["']?[^"']*wp-image-(\d+)[^"']*["']?"#).expect("attachment pattern")
});

// The leading whitespace is captured and written back.
static WIDTH_REWRITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\s)(width=["']?)[\d%]+(["']?)\s?"#).expect("width rewrite pattern")
});

static HEIGHT_REWRITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\s)(height=["']?)[\d%]+(["']?)\s?"#).expect("height rewrite pattern")
});

/// One image found in HTML, with its optional wrapping link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTagMatch {
    /// Entire matched text, including the `<a>` wrapper when present.
    pub full_match: String,
    pub link_url: Option<String>,
    pub img_tag: String,
    pub img_url: String,
}

/// Every `<img>` (with wrapping `<a>`, if any) in document order.
/// Identical tags are reported once per occurrence.
pub fn parse_images_from_html(html: &str) -> Vec<ImageTagMatch> {
    IMAGE_TAG
        .captures_iter(html)
        .filter_map(|caps| {
            Some(ImageTagMatch {
                full_match: caps.get(0)?.as_str().to_string(),
                link_url: caps.name("link_url").map(|m| m.as_str().to_string()),
                img_tag: caps.name("img_tag")?.as_str().to_string(),
                img_url: caps.name("img_url")?.as_str().to_string(),
            })
        })
        .collect()
}

/// A width or height as written on a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Extent {
    Pixels(u32),
    /// Relative value such as `50%`, kept verbatim.
    Percent(String),
}

impl Extent {
    fn parse(value: &str) -> Option<Self> {
        if value.contains('%') {
            Some(Extent::Percent(value.to_string()))
        } else {
            value.parse().ok().filter(|&px| px > 0).map(Extent::Pixels)
        }
    }

    fn pixels(&self) -> Option<u32> {
        match self {
            Extent::Pixels(px) => Some(*px),
            Extent::Percent(_) => None,
        }
    }
}

/// Rewrites image tags in HTML so they load through the resizing proxy.
pub struct ContentRewriter<'a> {
    urls: &'a SecureUrlBuilder,
    registry: &'a SizeRegistry,
    media: &'a dyn MediaLibrary,
    base_dir: Option<&'a Path>,
}

impl<'a> ContentRewriter<'a> {
    pub fn new(
        urls: &'a SecureUrlBuilder,
        registry: &'a SizeRegistry,
        media: &'a dyn MediaLibrary,
    ) -> Self {
        Self {
            urls,
            registry,
            media,
            base_dir: None,
        }
    }

    /// Uploads directory used to map `-WxH` derivatives back to originals.
    pub fn with_base_dir(mut self, base_dir: Option<&'a Path>) -> Self {
        self.base_dir = base_dir;
        self
    }

    pub fn rewrite(&self, html: &str, content_width: Option<u32>) -> String {
        let content_width = content_width.filter(|&cw| cw > 0);
        let mut content = html.to_string();

        for image in parse_images_from_html(html) {
            let Some(new_tag) = self.rewrite_tag(&image, content_width) else {
                continue;
            };
            let new_full = image.full_match.replacen(&image.img_tag, &new_tag, 1);
            content = content.replace(&image.full_match, &new_full);
        }

        content
    }

    /// Rewritten `<img>` tag, `None` when the image is skipped.
    fn rewrite_tag(&self, image: &ImageTagMatch, content_width: Option<u32>) -> Option<String> {
        let tag = image.img_tag.as_str();
        let mut src = image.img_url.clone();

        if !validate_image_url(&src) {
            debug!("skipping image with unusable URL {src:?}");
            return None;
        }

        let mut width = first_capture(&WIDTH_ATTR, tag).and_then(|v| Extent::parse(&v));
        let mut height = first_capture(&HEIGHT_ATTR, tag).and_then(|v| Extent::parse(&v));
        let mut crop = false;
        let mut fullsize_url = false;

        // Two relative values can't both be honoured, keep the layout instead.
        if matches!(width, Some(Extent::Percent(_))) && matches!(height, Some(Extent::Percent(_)))
        {
            width = None;
            height = None;
        }

        let size_name = first_capture(&SIZE_CLASS, tag);
        if let Some(name) = size_name.as_deref()
            && width.is_none()
            && height.is_none()
            && name != FULL
            && let Some(def) = self.registry.get(name)
        {
            width = non_zero(def.width).map(Extent::Pixels);
            height = non_zero(def.height).map(Extent::Pixels);
            crop = def.crop.is_crop();
        }

        if let Some(id) = first_capture(&ATTACHMENT_CLASS, tag).and_then(|id| id.parse().ok())
            && self.urls.is_local(&src)
            && let Some(attachment) = self.media.attachment(id)
        {
            src = attachment.url.clone();
            fullsize_url = true;

            if let Some(natural) = attachment.dimensions() {
                // Never ask for more than the original has.
                if let Some(Extent::Pixels(w)) = &mut width {
                    *w = (*w).min(natural.width);
                }
                if let Some(Extent::Pixels(h)) = &mut height {
                    *h = (*h).min(natural.height);
                }
                if width.is_none() && height.is_none() {
                    width = Some(Extent::Pixels(natural.width));
                    height = Some(Extent::Pixels(natural.height));
                } else if let Some(def) = size_name.as_deref().and_then(|n| self.registry.get(n)) {
                    crop = def.crop.is_crop();
                }
            } else if let Some(def) = size_name.as_deref().and_then(|n| self.registry.get(n))
                && (width.is_some() || height.is_some())
            {
                crop = def.crop.is_crop();
            }
        }

        if let Some(cw) = content_width {
            let height_px = height.as_ref().and_then(Extent::pixels);
            match (width.as_ref().and_then(Extent::pixels), height_px) {
                (Some(w), Some(h)) if w > cw => {
                    height = non_zero(scale_to_width(w, h, cw)).map(Extent::Pixels);
                    width = Some(Extent::Pixels(cw));
                }
                (Some(w), _) if w > cw => width = Some(Extent::Pixels(cw)),
                _ => {}
            }

            if width.is_none() {
                width = Some(Extent::Pixels(cw));
                height = None;
            }
        }

        if !fullsize_url {
            src = strip_image_dimensions(&src, self.urls.base_url(), self.base_dir);
        }

        let new_url = self.urls.build(
            &src,
            width.as_ref().and_then(Extent::pixels),
            height.as_ref().and_then(Extent::pixels),
            crop,
        );

        let mut new_tag = tag.replace(&image.img_url, &new_url);
        if let Some(Extent::Pixels(w)) = width {
            new_tag = rewrite_attribute(&WIDTH_REWRITE, &new_tag, w);
        }
        if let Some(Extent::Pixels(h)) = height {
            new_tag = rewrite_attribute(&HEIGHT_REWRITE, &new_tag, h);
        }

        Some(new_tag)
    }
}

fn first_capture(pattern: &Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn rewrite_attribute(pattern: &Regex, tag: &str, value: u32) -> String {
    pattern
        .replace_all(tag, |caps: &Captures| {
            format!("{}{}{value}{} ", &caps[1], &caps[2], &caps[3])
        })
        .into_owned()
}
