//! Remote dimension discovery over HTTP byte ranges.
//!
//! Only the first bytes of a remote image are requested: enough for the
//! header parser to read the size. The initial range depends on the URL's
//! extension (24 bytes for PNG, 10 for GIF, 2 KiB for JPEG and anything
//! unknown). JPEG headers can sit behind large EXIF/ICC segments, so an
//! [`Incomplete`](HeaderError::Incomplete) parse is retried once with a
//! 32 KiB range.
//!
//! The HTTP transport is the [`HttpClient`] trait. [`ReqwestClient`] is the
//! production implementation; tests use a recording mock.

use super::header::{HeaderError, ImageFormat, parse_any};
use crate::types::Dimensions;
use log::debug;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;

/// Largest range requested, used for the single retry.
pub const MAX_RANGE: usize = 32768;

/// Browser user agent; some origins refuse range requests from anything else.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.12; rv:55.0) Gecko/20100101 Firefox/55.0";

/// Every variant means the dimensions are unavailable.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid image URL: {0}")]
    InvalidUrl(String),
    #[error("HTTP transport failed: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("empty response body")]
    EmptyBody,
    #[error("unreadable image header: {0}")]
    Header(#[from] HeaderError),
}

/// Status code and body of a GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Blocking HTTP GET capability.
pub trait HttpClient {
    fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<HttpResponse, FetchError>;
}

/// [`HttpClient`] over a blocking `reqwest` client.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<HttpResponse, FetchError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }
        let response = request
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = response.status().as_u16();

        // Origins that ignore Range send the whole file; read no more than we can use.
        let mut body = Vec::new();
        response
            .take(MAX_RANGE as u64)
            .read_to_end(&mut body)
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

/// Reads remote image dimensions with at most two ranged GETs.
pub struct DimensionFetcher<C> {
    client: C,
}

impl<C: HttpClient> DimensionFetcher<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn fetch(&self, url: &str) -> Result<Dimensions, FetchError> {
        let format = format_from_url(url)?;
        let mut range = format.map_or(ImageFormat::Jpeg.initial_range(), ImageFormat::initial_range);

        loop {
            let headers = [
                ("Accept", "*/*".to_string()),
                ("Range", format!("bytes=0-{}", range - 1)),
                ("User-Agent", USER_AGENT.to_string()),
            ];
            let response = self.client.get(url, &headers)?;

            if response.status != 200 && response.status != 206 {
                return Err(FetchError::Status(response.status));
            }
            if response.body.is_empty() {
                return Err(FetchError::EmptyBody);
            }

            let parsed = match format {
                Some(format) => format.parse(&response.body),
                None => parse_any(&response.body),
            };

            match parsed {
                Ok(dims) => return Ok(dims),
                Err(HeaderError::Incomplete) if range < MAX_RANGE => {
                    debug!("header of {url} not within {range} bytes, retrying with {MAX_RANGE}");
                    range = MAX_RANGE;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Format implied by the URL path's extension, `None` when unknown.
fn format_from_url(url: &str) -> Result<Option<ImageFormat>, FetchError> {
    let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
    let file_name = parsed.path().rsplit('/').next().unwrap_or("");
    Ok(file_name
        .rsplit_once('.')
        .and_then(|(_, ext)| ImageFormat::from_extension(ext)))
}
