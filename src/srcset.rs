//! Responsive image attributes.
//!
//! Each `srcset` candidate is pointed at the resizing proxy. The size comes
//! from the `-WxH` suffix of the candidate's filename, corrected by its `w`
//! descriptor, and candidates are always cropped to the exact box. The
//! matching `sizes` attribute is widened to the page content width while
//! content is being rewritten.

use crate::host::MediaLibrary;
use crate::naming::{parse_dimensions_from_filename, strip_image_dimensions};
use crate::secure_url::{SecureUrlBuilder, validate_image_url};
use std::fmt;
use std::path::Path;

/// Content width assumed by [`rewrite_sizes_attribute`] when none is configured.
pub const DEFAULT_CONTENT_WIDTH: u32 = 1000;

/// Kind of a `srcset` descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descriptor {
    /// `300w`
    Width,
    /// `2x`
    Density,
}

impl Descriptor {
    pub fn suffix(self) -> char {
        match self {
            Descriptor::Width => 'w',
            Descriptor::Density => 'x',
        }
    }
}

/// One `url descriptor` entry of a `srcset` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct SrcsetCandidate {
    pub url: String,
    pub descriptor: Descriptor,
    pub value: f64,
}

impl SrcsetCandidate {
    pub fn width(url: impl Into<String>, value: u32) -> Self {
        Self {
            url: url.into(),
            descriptor: Descriptor::Width,
            value: f64::from(value),
        }
    }

    pub fn density(url: impl Into<String>, value: f64) -> Self {
        Self {
            url: url.into(),
            descriptor: Descriptor::Density,
            value,
        }
    }

    /// The descriptor value in whole pixels, for `w` candidates.
    fn pixel_width(&self) -> Option<u32> {
        (self.descriptor == Descriptor::Width && self.value >= 1.0).then(|| self.value as u32)
    }
}

impl fmt::Display for SrcsetCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.url, self.value, self.descriptor.suffix())
    }
}

/// Parse a `srcset` attribute value.
///
/// Entries without a descriptor count as `1x`; entries with an unreadable
/// descriptor are dropped.
pub fn parse_srcset(attr: &str) -> Vec<SrcsetCandidate> {
    attr.split(',')
        .filter_map(|entry| {
            let mut parts = entry.split_whitespace();
            let url = parts.next()?;
            let Some(descriptor) = parts.next() else {
                return Some(SrcsetCandidate::density(url, 1.0));
            };
            if let Some(w) = descriptor.strip_suffix('w') {
                w.parse().ok().map(|w| SrcsetCandidate::width(url, w))
            } else if let Some(x) = descriptor.strip_suffix('x') {
                x.parse().ok().map(|x| SrcsetCandidate::density(url, x))
            } else {
                None
            }
        })
        .collect()
}

/// Join candidates back into a `srcset` attribute value.
pub fn format_srcset(candidates: &[SrcsetCandidate]) -> String {
    candidates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rewrites `srcset` candidates to proxy URLs.
pub struct SrcsetRewriter<'a> {
    urls: &'a SecureUrlBuilder,
    media: &'a dyn MediaLibrary,
    base_dir: Option<&'a Path>,
}

impl<'a> SrcsetRewriter<'a> {
    pub fn new(urls: &'a SecureUrlBuilder, media: &'a dyn MediaLibrary) -> Self {
        Self {
            urls,
            media,
            base_dir: None,
        }
    }

    pub fn with_base_dir(mut self, base_dir: Option<&'a Path>) -> Self {
        self.base_dir = base_dir;
        self
    }

    /// Rewrite every candidate with a usable URL.
    ///
    /// When the candidates belong to a known attachment its full-size URL is
    /// used as the source, otherwise `-WxH` derivatives are mapped back to
    /// their originals where possible.
    pub fn rewrite(
        &self,
        candidates: &[SrcsetCandidate],
        attachment: Option<u64>,
    ) -> Vec<SrcsetCandidate> {
        let full_url = attachment
            .and_then(|id| self.media.attachment(id))
            .map(|a| a.url);

        candidates
            .iter()
            .map(|candidate| {
                if !validate_image_url(&candidate.url) {
                    return candidate.clone();
                }

                let hint = parse_dimensions_from_filename(&candidate.url);
                let mut width = hint.map(|d| d.width);
                let height = hint.map(|d| d.height);

                let source = match &full_url {
                    Some(url) => url.clone(),
                    None => {
                        strip_image_dimensions(&candidate.url, self.urls.base_url(), self.base_dir)
                    }
                };

                if let Some(declared) = candidate.pixel_width()
                    && (height.is_none() || width != Some(declared))
                {
                    width = Some(declared);
                }

                SrcsetCandidate {
                    url: self.urls.build(&source, width, height, true),
                    ..candidate.clone()
                }
            })
            .collect()
    }
}

/// Widen a `sizes` attribute to the page content width.
///
/// Only applies while content is being rewritten; elsewhere, or when the
/// requested width is narrower than the content width, `sizes` is returned
/// unchanged.
pub fn rewrite_sizes_attribute(
    sizes: &str,
    requested_width: Option<u32>,
    content_width: Option<u32>,
    in_content: bool,
) -> String {
    if !in_content {
        return sizes.to_string();
    }
    let content_width = content_width
        .filter(|&cw| cw > 0)
        .unwrap_or(DEFAULT_CONTENT_WIDTH);
    if requested_width.is_some_and(|w| w < content_width) {
        return sizes.to_string();
    }
    format!("(max-width: {content_width}px) 100vw, {content_width}px")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NoMedia;
    use crate::test_helpers::test_media;
    use std::fs;
    use tempfile::TempDir;

    const BASE: &str = "http://site/up";

    fn urls() -> SecureUrlBuilder {
        SecureUrlBuilder::new(BASE, "")
    }

    // =========================================================================
    // Attribute parsing
    // =========================================================================

    #[test]
    fn parses_width_and_density_candidates() {
        let parsed = parse_srcset("a-300x200.jpg 300w, a-600x400.jpg 600w,a.jpg 1.5x");
        assert_eq!(
            parsed,
            vec![
                SrcsetCandidate::width("a-300x200.jpg", 300),
                SrcsetCandidate::width("a-600x400.jpg", 600),
                SrcsetCandidate::density("a.jpg", 1.5),
            ]
        );
    }

    #[test]
    fn bare_url_is_one_x_and_junk_is_dropped() {
        let parsed = parse_srcset("a.jpg, b.jpg 300q, ");
        assert_eq!(parsed, vec![SrcsetCandidate::density("a.jpg", 1.0)]);
    }

    #[test]
    fn formats_candidates() {
        let candidates = vec![
            SrcsetCandidate::width("a.jpg", 300),
            SrcsetCandidate::density("b.jpg", 2.0),
            SrcsetCandidate::density("c.jpg", 1.5),
        ];
        assert_eq!(format_srcset(&candidates), "a.jpg 300w, b.jpg 2x, c.jpg 1.5x");
    }

    // =========================================================================
    // Candidate rewriting
    // =========================================================================

    #[test]
    fn width_candidates_use_filename_hint() {
        let urls = urls();
        let out = SrcsetRewriter::new(&urls, &NoMedia)
            .rewrite(&[SrcsetCandidate::width("http://site/up/a-300x200.jpg", 300)], None);
        assert_eq!(out[0].url, "http://site/up/a-300x200.jpg?w=300&h=200&crop=1");
        assert_eq!(out[0].descriptor, Descriptor::Width);
        assert_eq!(out[0].value, 300.0);
    }

    #[test]
    fn declared_width_wins_when_hint_disagrees() {
        let urls = urls();
        let out = SrcsetRewriter::new(&urls, &NoMedia)
            .rewrite(&[SrcsetCandidate::width("http://site/up/a-300x200.jpg", 768)], None);
        assert_eq!(out[0].url, "http://site/up/a-300x200.jpg?w=768&h=200&crop=1");
    }

    #[test]
    fn declared_width_used_without_hint() {
        let urls = urls();
        let out = SrcsetRewriter::new(&urls, &NoMedia)
            .rewrite(&[SrcsetCandidate::width("http://site/up/a.jpg", 1024)], None);
        assert_eq!(out[0].url, "http://site/up/a.jpg?w=1024&crop=1");
    }

    #[test]
    fn density_candidates_only_use_hint() {
        let urls = urls();
        let out = SrcsetRewriter::new(&urls, &NoMedia).rewrite(
            &[
                SrcsetCandidate::density("http://site/up/a-640x480.png", 2.0),
                SrcsetCandidate::density("http://site/up/a.png", 1.0),
            ],
            None,
        );
        assert_eq!(out[0].url, "http://site/up/a-640x480.png?w=640&h=480&crop=1");
        assert_eq!(out[1].url, "http://site/up/a.png?crop=1");
    }

    #[test]
    fn attachment_url_replaces_derivative() {
        let urls = urls();
        let media = test_media();
        let out = SrcsetRewriter::new(&urls, &media)
            .rewrite(&[SrcsetCandidate::width("http://site/up/a-300x150.jpg", 300)], Some(7));
        assert_eq!(out[0].url, "http://site/up/a.jpg?w=300&h=150&crop=1");
    }

    #[test]
    fn derivative_is_stripped_when_original_exists() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.jpg"), b"").unwrap();
        let urls = urls();
        let out = SrcsetRewriter::new(&urls, &NoMedia)
            .with_base_dir(Some(tmp.path()))
            .rewrite(&[SrcsetCandidate::width("http://site/up/a-300x200.jpg", 300)], None);
        assert_eq!(out[0].url, "http://site/up/a.jpg?w=300&h=200&crop=1");
    }

    #[test]
    fn invalid_candidates_are_kept() {
        let urls = urls();
        let input = [SrcsetCandidate::width("/up/a-300x200.jpg", 300)];
        let out = SrcsetRewriter::new(&urls, &NoMedia).rewrite(&input, None);
        assert_eq!(out, input);
    }

    #[test]
    fn remote_candidates_go_through_safe_image() {
        let urls = urls();
        let out = SrcsetRewriter::new(&urls, &NoMedia)
            .rewrite(&[SrcsetCandidate::width("https://cdn.test/a.jpg", 480)], None);
        assert_eq!(
            out[0].url,
            "http://site/safe_image?url=https%3A%2F%2Fcdn.test%2Fa.jpg&w=480&crop=1"
        );
    }

    // =========================================================================
    // sizes attribute
    // =========================================================================

    #[test]
    fn sizes_untouched_outside_content() {
        let sizes = "(max-width: 300px) 100vw, 300px";
        assert_eq!(rewrite_sizes_attribute(sizes, Some(2000), Some(640), false), sizes);
    }

    #[test]
    fn sizes_widened_to_content_width() {
        assert_eq!(
            rewrite_sizes_attribute("x", Some(2000), Some(640), true),
            "(max-width: 640px) 100vw, 640px"
        );
        assert_eq!(
            rewrite_sizes_attribute("x", Some(640), Some(640), true),
            "(max-width: 640px) 100vw, 640px"
        );
    }

    #[test]
    fn narrow_images_keep_their_sizes() {
        assert_eq!(rewrite_sizes_attribute("x", Some(300), Some(640), true), "x");
    }

    #[test]
    fn content_width_defaults_to_a_thousand() {
        assert_eq!(
            rewrite_sizes_attribute("x", Some(1200), None, true),
            "(max-width: 1000px) 100vw, 1000px"
        );
        assert_eq!(rewrite_sizes_attribute("x", Some(999), None, true), "x");
        assert_eq!(
            rewrite_sizes_attribute("x", None, None, true),
            "(max-width: 1000px) 100vw, 1000px"
        );
    }
}
