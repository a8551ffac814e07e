//! Proxy URL assembly and nginx secure-link signing.
//!
//! Local images (anything under the uploads base URL) are addressed directly
//! and the proxy reads the size from the query string. Remote images go
//! through `<site origin>/safe_image?url=...` instead.
//!
//! ## Query arguments
//!
//! | Arg | Value | Present when |
//! |---|---|---|
//! | `url` | percent-encoded original | remote image |
//! | `w` | target width | non-zero |
//! | `h` | target height | non-zero |
//! | `crop` | `1` | cropping |
//! | `d` | secure-link digest | template configured |
//!
//! ## Signing
//!
//! The template is a plain string with `%uri%`, `%w%`, `%h%`, `%crop%` and
//! `%url%` placeholders, the same expression nginx's `secure_link_md5` is
//! configured with. After substitution it is MD5-hashed, base64-encoded and
//! made URL-safe (`+` → `-`, `/` → `_`, padding stripped).

use crate::config::{Scheme, SiteConfig};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use md5::{Digest, Md5};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::{Position, Url};

/// RFC 3986 unreserved characters stay literal, everything else is encoded.
const RAW_URL_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Path of the proxy endpoint for remote images, relative to the site origin.
pub const SAFE_IMAGE_PATH: &str = "/safe_image";

/// Builds resized image URLs for one site.
#[derive(Debug, Clone)]
pub struct SecureUrlBuilder {
    base_url: String,
    secure_link: String,
    scheme: Option<Scheme>,
}

impl SecureUrlBuilder {
    pub fn new(base_url: impl Into<String>, secure_link: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            secure_link: secure_link.into(),
            scheme: None,
        }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(&config.uploads.base_url, &config.secure_link).with_scheme(config.request.scheme)
    }

    /// Rewrite the scheme of every generated URL.
    pub fn with_scheme(mut self, scheme: Option<Scheme>) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_local(&self, url: &str) -> bool {
        image_is_local(url, &self.base_url)
    }

    /// Origin of the uploads base URL plus [`SAFE_IMAGE_PATH`].
    pub fn safe_image_url(&self) -> String {
        match Url::parse(&self.base_url) {
            Ok(base) => format!("{}{SAFE_IMAGE_PATH}", &base[..Position::BeforePath]),
            Err(_) => SAFE_IMAGE_PATH.to_string(),
        }
    }

    /// URL asking the proxy for `url` at the given size.
    ///
    /// Missing or zero sides are left for the proxy to derive.
    pub fn build(&self, url: &str, width: Option<u32>, height: Option<u32>, crop: bool) -> String {
        let is_local = self.is_local(url);
        let target = if is_local {
            url.to_string()
        } else {
            self.safe_image_url()
        };

        let encoded_url = if is_local {
            String::new()
        } else {
            utf8_percent_encode(url, RAW_URL_ENCODE).to_string()
        };
        let w = width.filter(|&w| w > 0).map(|w| w.to_string()).unwrap_or_default();
        let h = height.filter(|&h| h > 0).map(|h| h.to_string()).unwrap_or_default();
        let crop = if crop { "1".to_string() } else { String::new() };

        let mut args = vec![("url", encoded_url), ("w", w), ("h", h), ("crop", crop)];

        if !self.secure_link.is_empty() {
            let uri = url_path(&target);
            let link = self
                .secure_link
                .replace("%uri%", &uri)
                .replace("%w%", &args[1].1)
                .replace("%h%", &args[2].1)
                .replace("%crop%", &args[3].1)
                .replace("%url%", &args[0].1);
            args.push(("d", sign(&link)));
        }

        args.retain(|(_, value)| !value.is_empty());
        let resized = add_query_args(&target, &args);
        match self.scheme {
            Some(scheme) => set_url_scheme(&resized, scheme),
            None => resized,
        }
    }
}

/// `base64(md5(link))`, made URL-safe and unpadded.
pub fn sign(link: &str) -> String {
    let digest = Md5::digest(link.as_bytes());
    STANDARD
        .encode(digest)
        .replace('+', "-")
        .replace('/', "_")
        .trim_end_matches('=')
        .to_string()
}

/// Whether `url` lives under `base_url`, ignoring an `http:`/`https:` prefix
/// on either side.
pub fn image_is_local(url: &str, base_url: &str) -> bool {
    let base = strip_http_scheme(base_url);
    !base.is_empty() && strip_http_scheme(url).contains(base)
}

/// A usable image URL has a host and a path.
///
/// Protocol-relative URLs (`//host/path`) are accepted.
pub fn validate_image_url(url: &str) -> bool {
    let Some(parsed) = parse_lenient(url) else {
        return false;
    };
    if parsed.host_str().is_none_or(str::is_empty) {
        return false;
    }
    // `Url` always reports at least "/", so look at the raw text for a path
    let Some((_, rest)) = url.split_once("//") else {
        return false;
    };
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    rest[authority_end..].starts_with('/')
}

/// Parse an absolute or protocol-relative URL.
pub(crate) fn parse_lenient(url: &str) -> Option<Url> {
    if url.starts_with("//") {
        Url::parse(&format!("http:{url}")).ok()
    } else {
        Url::parse(url).ok()
    }
}

pub(crate) fn strip_http_scheme(url: &str) -> &str {
    let lower = url.get(..6).map(str::to_ascii_lowercase).unwrap_or_default();
    if lower.starts_with("https:") {
        &url[6..]
    } else if lower.starts_with("http:") {
        &url[5..]
    } else {
        url
    }
}

fn url_path(url: &str) -> String {
    parse_lenient(url)
        .map(|u| u.path().to_string())
        .unwrap_or_default()
}

/// Append `args` to the query of `url`, replacing existing keys of the same
/// name. Fragments stay at the end.
fn add_query_args(url: &str, args: &[(&str, String)]) -> String {
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, frag)) => (head, Some(frag)),
        None => (url, None),
    };
    let (base, query) = match without_fragment.split_once('?') {
        Some((base, query)) => (base, query),
        None => (without_fragment, ""),
    };

    let mut pairs: Vec<String> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or("");
            !args.iter().any(|(k, _)| *k == key)
        })
        .map(str::to_string)
        .collect();
    pairs.extend(args.iter().map(|(k, v)| format!("{k}={v}")));

    let mut out = base.to_string();
    if !pairs.is_empty() {
        out.push('?');
        out.push_str(&pairs.join("&"));
    }
    if let Some(frag) = fragment {
        out.push('#');
        out.push_str(frag);
    }
    out
}

/// Force `scheme` onto an absolute or protocol-relative URL.
fn set_url_scheme(url: &str, scheme: Scheme) -> String {
    if let Some(rest) = url.strip_prefix("//") {
        return format!("{}://{rest}", scheme.as_str());
    }
    match url.split_once("://") {
        Some((old, rest))
            if !old.is_empty() && old.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
        {
            format!("{}://{rest}", scheme.as_str())
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/wp-content/uploads";

    fn builder() -> SecureUrlBuilder {
        SecureUrlBuilder::new(BASE, "")
    }

    // =========================================================================
    // Locality and validation
    // =========================================================================

    #[test]
    fn local_check_ignores_scheme() {
        assert!(image_is_local("http://example.com/wp-content/uploads/a.jpg", BASE));
        assert!(image_is_local("https://example.com/wp-content/uploads/a.jpg", BASE));
        assert!(image_is_local("//example.com/wp-content/uploads/a.jpg", BASE));
        assert!(image_is_local(
            "HTTPS://example.com/wp-content/uploads/a.jpg",
            BASE
        ));
    }

    #[test]
    fn local_check_rejects_other_hosts() {
        assert!(!image_is_local("https://cdn.example.org/a.jpg", BASE));
        assert!(!image_is_local("https://example.com/other/a.jpg", BASE));
    }

    #[test]
    fn local_check_is_case_sensitive_past_the_scheme() {
        assert!(!image_is_local(
            "https://example.com/WP-content/uploads/a.jpg",
            BASE
        ));
    }

    #[test]
    fn validate_requires_host() {
        assert!(!validate_image_url("/images/a.jpg"));
        assert!(!validate_image_url("a.jpg"));
        assert!(!validate_image_url(""));
    }

    #[test]
    fn validate_requires_path() {
        assert!(!validate_image_url("https://example.com"));
        assert!(!validate_image_url("https://example.com?x=1"));
    }

    #[test]
    fn validate_accepts_absolute_and_protocol_relative() {
        assert!(validate_image_url("https://example.com/a.jpg"));
        assert!(validate_image_url("//example.com/a.jpg"));
        assert!(validate_image_url("http://example.com:8080/x/y.png?v=2"));
    }

    // =========================================================================
    // URL building
    // =========================================================================

    #[test]
    fn local_url_gets_size_args() {
        let url = builder().build(
            "https://example.com/wp-content/uploads/2024/01/a.jpg",
            Some(300),
            Some(200),
            false,
        );
        assert_eq!(
            url,
            "https://example.com/wp-content/uploads/2024/01/a.jpg?w=300&h=200"
        );
    }

    #[test]
    fn zero_and_missing_sides_are_dropped() {
        let b = builder();
        let src = "https://example.com/wp-content/uploads/a.jpg";
        assert_eq!(b.build(src, Some(300), Some(0), false), format!("{src}?w=300"));
        assert_eq!(b.build(src, None, None, false), src);
    }

    #[test]
    fn crop_flag_is_one() {
        let src = "https://example.com/wp-content/uploads/a.jpg";
        assert_eq!(
            builder().build(src, Some(150), Some(150), true),
            format!("{src}?w=150&h=150&crop=1")
        );
    }

    #[test]
    fn remote_url_goes_through_safe_image() {
        let url = builder().build("https://cdn.example.org/p/a b.jpg", Some(100), None, false);
        assert_eq!(
            url,
            "https://example.com/safe_image?url=https%3A%2F%2Fcdn.example.org%2Fp%2Fa%20b.jpg&w=100"
        );
    }

    #[test]
    fn safe_image_keeps_port() {
        let b = SecureUrlBuilder::new("http://localhost:8080/wp-content/uploads", "");
        assert_eq!(b.safe_image_url(), "http://localhost:8080/safe_image");
    }

    #[test]
    fn existing_query_and_fragment_are_kept() {
        let src = "https://example.com/wp-content/uploads/a.jpg?ver=3&w=10#top";
        assert_eq!(
            builder().build(src, Some(40), None, false),
            "https://example.com/wp-content/uploads/a.jpg?ver=3&w=40#top"
        );
    }

    #[test]
    fn scheme_is_normalized_when_configured() {
        let b = builder().with_scheme(Some(Scheme::Http));
        let src = "https://example.com/wp-content/uploads/a.jpg";
        assert_eq!(
            b.build(src, Some(10), None, false),
            "http://example.com/wp-content/uploads/a.jpg?w=10"
        );
        assert_eq!(
            b.build("//example.com/wp-content/uploads/a.jpg", None, None, false),
            "http://example.com/wp-content/uploads/a.jpg"
        );
    }

    // =========================================================================
    // Signing
    // =========================================================================

    #[test]
    fn sign_is_url_safe_md5() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(sign(""), "1B2M2Y8AsgTpgAmY7PhCfg");
        let digest = sign("/wp-content/uploads/a.jpg300200 secret");
        assert_eq!(digest.len(), 22);
        assert!(!digest.contains(['+', '/', '=']));
    }

    #[test]
    fn signed_url_is_deterministic() {
        let b = SecureUrlBuilder::new(BASE, "%uri%%w%%h%%crop% secret");
        let src = "https://example.com/wp-content/uploads/a.jpg";
        let first = b.build(src, Some(300), Some(200), true);
        let second = b.build(src, Some(300), Some(200), true);
        assert_eq!(first, second);

        let expected = sign("/wp-content/uploads/a.jpg3002001 secret");
        assert_eq!(first, format!("{src}?w=300&h=200&crop=1&d={expected}"));
    }

    #[test]
    fn signature_changes_with_width() {
        let b = SecureUrlBuilder::new(BASE, "%uri%%w%%h% secret");
        let src = "https://example.com/wp-content/uploads/a.jpg";
        let a = b.build(src, Some(300), Some(200), false);
        let c = b.build(src, Some(301), Some(200), false);
        let digest = |u: &str| u.rsplit_once("d=").map(|(_, d)| d.to_string());
        assert_ne!(digest(&a), digest(&c));
    }

    #[test]
    fn remote_signature_uses_safe_image_path_and_encoded_url() {
        let b = SecureUrlBuilder::new(BASE, "%uri%|%url%|%w%");
        let url = b.build("https://cdn.example.org/a.jpg", Some(50), None, false);
        let expected = sign("/safe_image|https%3A%2F%2Fcdn.example.org%2Fa.jpg|50");
        assert!(url.ends_with(&format!("&d={expected}")));
    }

    #[test]
    fn empty_template_does_not_sign() {
        let url = builder().build(
            "https://example.com/wp-content/uploads/a.jpg",
            Some(1),
            None,
            false,
        );
        assert!(!url.contains("d="));
    }
}
