//! Resizer configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! overridden by the user's file, key by key, so a config only needs the
//! values that differ from the defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! secure_link = ""                   # nginx secure_link_md5 template, empty = unsigned
//! disable_intermediate_sizes = true  # host skips writing derivative files
//! enable_external_thumbnail = false  # host accepts external thumbnail URLs
//! # content_width = 640              # page content width in pixels
//!
//! [uploads]
//! base_url = "http://localhost/wp-content/uploads"
//! # base_dir = "/var/www/html/wp-content/uploads"
//!
//! [request]
//! # scheme = "https"                 # force the scheme of generated URLs
//!
//! [sizes.thumbnail]                  # also answers to `thumb`
//! width = 150
//! height = 150
//! crop = true
//!
//! [sizes.medium]
//! width = 300
//! height = 300
//!
//! [sizes.large]
//! width = 1024
//! height = 1024
//!
//! [sizes.extra.hero]                 # theme-registered sizes
//! width = 1600
//! height = 900
//! crop = ["center", "top"]
//!
//! [fetch]
//! timeout_secs = 10                  # remote header fetch timeout
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::sizes::{SizeDefinition, SizeRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Size names the registry always defines.
const BUILTIN_SIZES: &[&str] = &["thumb", "thumbnail", "medium", "large", "full"];

/// Resizer configuration loaded from `config.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Secure link template with `%uri%`, `%w%`, `%h%`, `%crop%`, `%url%`
    /// placeholders. Empty disables signing.
    pub secure_link: String,
    /// Tell the host not to generate intermediate size files on upload.
    pub disable_intermediate_sizes: bool,
    /// Allow external thumbnail URLs on content items.
    pub enable_external_thumbnail: bool,
    /// Page content width, used to cap image widths in content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_width: Option<u32>,
    /// Where uploads live, as URL and on disk.
    pub uploads: UploadsConfig,
    /// Properties of the current request.
    pub request: RequestConfig,
    /// Registered image sizes.
    pub sizes: SizesConfig,
    /// Remote dimension fetch settings.
    pub fetch: FetchConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            secure_link: String::new(),
            disable_intermediate_sizes: true,
            enable_external_thumbnail: false,
            content_width: None,
            uploads: UploadsConfig::default(),
            request: RequestConfig::default(),
            sizes: SizesConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.uploads.base_url) {
            Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => {}
            _ => {
                return Err(ConfigError::Validation(format!(
                    "uploads.base_url must be an absolute URL with a host, got {:?}",
                    self.uploads.base_url
                )));
            }
        }
        if self.content_width == Some(0) {
            return Err(ConfigError::Validation(
                "content_width must be greater than 0".into(),
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fetch.timeout_secs must be greater than 0".into(),
            ));
        }
        if let Some(name) = self
            .sizes
            .extra
            .keys()
            .find(|name| BUILTIN_SIZES.contains(&name.as_str()))
        {
            return Err(ConfigError::Validation(format!(
                "sizes.extra.{name} shadows a built-in size"
            )));
        }
        Ok(())
    }

    /// Build the size registry described by `[sizes]` and `content_width`.
    pub fn size_registry(&self) -> SizeRegistry {
        let mut registry =
            SizeRegistry::new(self.sizes.thumbnail, self.sizes.medium, self.sizes.large)
                .with_content_width(self.content_width);
        for (name, definition) in &self.sizes.extra {
            registry.register(name.clone(), *definition);
        }
        registry
    }
}

/// Upload location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadsConfig {
    /// Public URL of the uploads directory. Images under it are local.
    pub base_url: String,
    /// Filesystem path of the uploads directory. When absent, resized
    /// `-WxH` filenames are never mapped back to their originals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost/wp-content/uploads".to_string(),
            base_dir: None,
        }
    }
}

/// URL scheme of the request being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Request settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequestConfig {
    /// Scheme forced onto generated URLs. When absent, URLs keep theirs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<Scheme>,
}

/// Registered image sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizesConfig {
    pub thumbnail: SizeDefinition,
    pub medium: SizeDefinition,
    pub large: SizeDefinition,
    /// Additional named sizes.
    pub extra: BTreeMap<String, SizeDefinition>,
}

impl Default for SizesConfig {
    fn default() -> Self {
        Self {
            thumbnail: SizeDefinition::new(150, 150, true),
            medium: SizeDefinition::new(300, 300, false),
            large: SizeDefinition::new(1024, 1024, false),
            extra: BTreeMap::new(),
        }
    }
}

/// Remote dimension fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Timeout for each ranged GET, in seconds.
    pub timeout_secs: u64,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# ngx-resizer Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# nginx secure_link_md5 template. Placeholders:
#   %uri%  request path (image path, or /safe_image for remote images)
#   %w%    requested width       %h%  requested height
#   %crop% 1 when cropping       %url% encoded remote URL
# Leave empty to generate unsigned URLs.
secure_link = ""

# Ask the host not to write intermediate size files on upload; the proxy
# produces every size on demand.
disable_intermediate_sizes = true

# Allow content items to use an external image URL as their thumbnail.
enable_external_thumbnail = false

# Width of the page content column in pixels. Images in content are capped
# to it, and images without a width default to it.
# content_width = 640

# ---------------------------------------------------------------------------
# Uploads
# ---------------------------------------------------------------------------
[uploads]
# Public URL of the uploads directory. Images under this URL are local and
# addressed directly; everything else goes through /safe_image.
base_url = "http://localhost/wp-content/uploads"

# Filesystem path of the uploads directory. Needed to map resized
# "photo-300x200.jpg" URLs back to "photo.jpg".
# base_dir = "/var/www/html/wp-content/uploads"

# ---------------------------------------------------------------------------
# Request
# ---------------------------------------------------------------------------
[request]
# Force "http" or "https" on generated URLs.
# scheme = "https"

# ---------------------------------------------------------------------------
# Image sizes
# ---------------------------------------------------------------------------
# crop = true crops to the exact box from the center; an anchor pair such as
# ["left", "top"] picks the crop origin. medium and large never crop.
[sizes.thumbnail]
width = 150
height = 150
crop = true

[sizes.medium]
width = 300
height = 300
crop = false

[sizes.large]
width = 1024
height = 1024
crop = false

# Additional named sizes, as registered by a theme.
[sizes.extra]
# [sizes.extra.hero]
# width = 1600
# height = 900
# crop = ["center", "top"]

# ---------------------------------------------------------------------------
# Remote dimension fetch
# ---------------------------------------------------------------------------
[fetch]
# Timeout of each ranged GET used to read a remote image header.
timeout_secs = 10
"##
}
