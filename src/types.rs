//! Shared value types passed between the resolver, the URL builder and the
//! rewriters.
//!
//! Everything here is request-scoped: built per call, never cached.

use serde::{Deserialize, Serialize};

/// Pixel dimensions of an original image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A logical size request.
///
/// - `Named("medium")` looks the size up in the [`SizeRegistry`](crate::sizes::SizeRegistry).
/// - `Explicit { width, height }` asks for a box; either side may be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeSpec {
    Named(String),
    Explicit {
        width: Option<u32>,
        height: Option<u32>,
    },
}

impl SizeSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn explicit(width: Option<u32>, height: Option<u32>) -> Self {
        Self::Explicit { width, height }
    }
}

/// Output of size resolution.
///
/// When `is_intermediate` is false the proxy is asked for the untouched
/// original; `width`/`height` are then only used for layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub crop: bool,
    pub is_intermediate: bool,
}

/// A resolved downsized image as handed back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownsizedImage {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub is_intermediate: bool,
}

/// A media library entry: authoritative full-size URL plus natural size when
/// the host has it on record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl Attachment {
    /// Natural size, only when both sides are on record.
    pub fn dimensions(&self) -> Option<Dimensions> {
        match (self.width.and_then(non_zero), self.height.and_then(non_zero)) {
            (Some(w), Some(h)) => Some(Dimensions::new(w, h)),
            _ => None,
        }
    }
}

/// Externally hosted thumbnail attached to a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalThumbnail {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
}

/// Where the image being resolved comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// An attachment in the host's media library.
    LocalAttachment(u64),
    /// A thumbnail URL stored on a content item, optionally with cached size.
    ExternalThumbnail {
        url: String,
        dimensions: Option<Dimensions>,
    },
}

impl From<ExternalThumbnail> for ImageSource {
    fn from(thumb: ExternalThumbnail) -> Self {
        Self::ExternalThumbnail {
            url: thumb.url,
            dimensions: thumb.dimensions,
        }
    }
}

/// Treat zero as "not set", the way the host stores absent sizes.
pub(crate) fn non_zero(value: u32) -> Option<u32> {
    (value > 0).then_some(value)
}
