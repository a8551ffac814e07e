//! # ngx-resizer
//!
//! Image URL rewriting for an on-the-fly resizing proxy (nginx
//! `image_filter` behind `secure_link`). Nothing is resized here: every image
//! reference is rewritten to ask the proxy for the right size, and display
//! dimensions are computed so the markup matches what the proxy will return.
//!
//! # Architecture: Resolve → Build → Substitute
//!
//! ```text
//! 1. Resolve     size request + original size  →  width, height, crop
//! 2. Build       image URL + width/height/crop →  signed proxy URL
//! 3. Substitute  HTML / srcset                 →  rewritten markup
//! ```
//!
//! Stage 1 is pure arithmetic over the size registry. Stage 2 only needs the
//! uploads base URL and the secure-link template. Stage 3 scans markup with
//! regular expressions and calls the first two per image. Original sizes come
//! from the host's media library, or from the remote image itself: the first
//! bytes are fetched with an HTTP range request and the PNG, GIF or JPEG header
//! is parsed.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`resizer`] | [`ImageResizer`] facade: one method per host hook |
//! | [`sizes`] | Size registry, crop policy, size resolution |
//! | [`secure_url`] | Proxy URL assembly, `safe_image` routing, MD5 secure links |
//! | [`content`] | `<img>` rewriting in HTML bodies |
//! | [`srcset`] | `srcset` candidates and the `sizes` attribute |
//! | [`naming`] | `-WxH` filename hints and mapping derivatives to originals |
//! | [`imaging`] | Fit/crop arithmetic, header parsing, ranged dimension fetch |
//! | [`host`] | Media library and thumbnail store boundaries |
//! | [`config`] | `config.toml` loading, merging and validation |
//! | [`types`] | Shared value types |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Explicit Attributes Win
//!
//! A tag's own `width`/`height` attributes take precedence over its
//! `size-<name>` class. The class only fills in missing dimensions and supplies
//! the crop policy. Authors resize images in the editor and expect what they
//! typed to be honoured.
//!
//! ## Relative Sizes Stay Relative
//!
//! A `width="50%"` is kept in the markup as written and never sent to the
//! proxy, which only understands pixels.
//!
//! ## Registry Built Once
//!
//! Building the size registry reads configuration, so [`ImageResizer`] builds it
//! on first use and keeps it. [`ImageResizer::reset_registry`] forces a rebuild.

pub mod config;
pub mod content;
pub mod host;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod resizer;
pub mod secure_url;
pub mod sizes;
pub mod srcset;
pub mod types;

pub use resizer::{ImageResizer, ResolveError, ThumbnailError};

#[cfg(test)]
pub(crate) mod test_helpers;
