//! Entry points used by the host.
//!
//! [`ImageResizer`] owns the configuration, the URL builder and the lazily
//! built size registry, and exposes one method per host hook:
//!
//! | Host hook | Method |
//! |---|---|
//! | image downsize | [`resolve_downsized_image`](ImageResizer::resolve_downsized_image) |
//! | post content | [`rewrite_content`](ImageResizer::rewrite_content) |
//! | galleries | [`rewrite_galleries`](ImageResizer::rewrite_galleries) |
//! | `srcset` | [`rewrite_srcset`](ImageResizer::rewrite_srcset) |
//! | `sizes` | [`rewrite_sizes_attribute`](ImageResizer::rewrite_sizes_attribute) |
//! | upload sizes | [`intermediate_sizes`](ImageResizer::intermediate_sizes) |
//! | thumbnail URL field | [`set_external_thumbnail`](ImageResizer::set_external_thumbnail) |
//!
//! Host data (attachments, thumbnail records) is passed in per call.

use crate::config::SiteConfig;
use crate::content::ContentRewriter;
use crate::host::{MediaLibrary, ThumbnailStore};
use crate::imaging::{DimensionFetcher, HttpClient};
use crate::secure_url::SecureUrlBuilder;
use crate::sizes::{self, RegistryCell, SizeRegistry};
use crate::srcset::{self, SrcsetCandidate, SrcsetRewriter};
use crate::types::{Dimensions, DownsizedImage, ExternalThumbnail, ImageSource, SizeSpec};
use log::{debug, warn};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no image for this source and size")]
    NotFound,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailError {
    #[error("external thumbnails are disabled")]
    Disabled,
}

pub struct ImageResizer {
    config: SiteConfig,
    urls: SecureUrlBuilder,
    registry: RegistryCell,
}

impl ImageResizer {
    pub fn new(config: SiteConfig) -> Self {
        let urls = SecureUrlBuilder::from_config(&config);
        Self {
            config,
            urls,
            registry: RegistryCell::new(),
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn urls(&self) -> &SecureUrlBuilder {
        &self.urls
    }

    /// The size registry, built from the config on first use.
    pub fn registry(&self) -> &SizeRegistry {
        self.registry.get_or_init(|| self.config.size_registry())
    }

    /// Forget the built registry; the next call rebuilds it.
    pub fn reset_registry(&mut self) {
        self.registry.reset();
    }

    /// URL and display size of `source` at `size`.
    pub fn resolve_downsized_image(
        &self,
        source: &ImageSource,
        size: &SizeSpec,
        media: &impl MediaLibrary,
    ) -> Result<DownsizedImage, ResolveError> {
        let (url, original) = match source {
            ImageSource::LocalAttachment(id) => {
                let attachment = media.attachment(*id).ok_or(ResolveError::NotFound)?;
                let original = attachment.dimensions();
                (attachment.url, original)
            }
            ImageSource::ExternalThumbnail { url, dimensions } => (url.clone(), *dimensions),
        };
        if url.is_empty() {
            return Err(ResolveError::NotFound);
        }

        let target = sizes::resolve(size, original, self.registry()).ok_or(ResolveError::NotFound)?;
        let resized = if target.is_intermediate {
            self.urls.build(&url, target.width, target.height, target.crop)
        } else {
            self.urls.build(&url, None, None, false)
        };

        Ok(DownsizedImage {
            url: resized,
            width: target.width,
            height: target.height,
            is_intermediate: target.is_intermediate,
        })
    }

    /// Rewrite images in a post body, using the configured content width.
    pub fn rewrite_content(&self, html: &str, media: &impl MediaLibrary) -> String {
        self.rewrite_content_with_width(html, self.config.content_width, media)
    }

    pub fn rewrite_content_with_width(
        &self,
        html: &str,
        content_width: Option<u32>,
        media: &impl MediaLibrary,
    ) -> String {
        ContentRewriter::new(&self.urls, self.registry(), media)
            .with_base_dir(self.config.uploads.base_dir.as_deref())
            .rewrite(html, content_width)
    }

    /// Rewrite each gallery's HTML like post content.
    pub fn rewrite_galleries(&self, galleries: &[String], media: &impl MediaLibrary) -> Vec<String> {
        galleries
            .iter()
            .map(|gallery| self.rewrite_content(gallery, media))
            .collect()
    }

    /// Rewrite `srcset` candidates, optionally of a known attachment.
    pub fn rewrite_srcset(
        &self,
        candidates: &[SrcsetCandidate],
        attachment: Option<u64>,
        media: &impl MediaLibrary,
    ) -> Vec<SrcsetCandidate> {
        SrcsetRewriter::new(&self.urls, media)
            .with_base_dir(self.config.uploads.base_dir.as_deref())
            .rewrite(candidates, attachment)
    }

    pub fn rewrite_sizes_attribute(
        &self,
        sizes: &str,
        requested_width: Option<u32>,
        in_content: bool,
    ) -> String {
        srcset::rewrite_sizes_attribute(
            sizes,
            requested_width,
            self.config.content_width,
            in_content,
        )
    }

    /// Sizes the host should generate on upload: none when the proxy makes
    /// them on demand.
    pub fn intermediate_sizes(&self, requested: Vec<String>) -> Vec<String> {
        if self.config.disable_intermediate_sizes {
            Vec::new()
        } else {
            requested
        }
    }

    /// Set or clear the external thumbnail of `item`.
    ///
    /// An empty `url` clears the record. Otherwise the URL is stored together
    /// with its dimensions: the given ones, or those read from the remote
    /// header. Dimensions are kept only when both sides are non-zero.
    /// Returns the stored dimensions.
    pub fn set_external_thumbnail<C: HttpClient>(
        &self,
        store: &mut impl ThumbnailStore,
        item: u64,
        url: &str,
        dimensions: Option<Dimensions>,
        fetcher: &DimensionFetcher<C>,
    ) -> Result<Option<Dimensions>, ThumbnailError> {
        if !self.config.enable_external_thumbnail {
            return Err(ThumbnailError::Disabled);
        }

        let url = url.trim();
        if url.is_empty() {
            debug!("clearing external thumbnail of item {item}");
            store.clear_external_thumbnail(item);
            return Ok(None);
        }

        let dimensions = match dimensions {
            Some(dims) => Some(dims),
            None => match fetcher.fetch(url) {
                Ok(dims) => Some(dims),
                Err(e) => {
                    warn!("dimensions of {url} unavailable: {e}");
                    None
                }
            },
        }
        .filter(|d| d.width > 0 && d.height > 0);

        store.store_external_thumbnail(
            item,
            ExternalThumbnail {
                url: url.to_string(),
                dimensions,
            },
        );
        Ok(dimensions)
    }
}
