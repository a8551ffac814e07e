//! Minimal header parser for PNG, GIF and JPEG.
//!
//! Recovers pixel dimensions from the first bytes of a file, typically a
//! byte range fetched over HTTP:
//! - PNG: IHDR width/height (big-endian u32) at offset 16, needs 24 bytes.
//! - GIF: logical screen width/height (little-endian u16) at offset 6, needs 10 bytes.
//! - JPEG: walks marker segments until a baseline (`FFC0`) or progressive
//!   (`FFC2`) start-of-frame, whose payload is `precision(1) height(2) width(2)`.
//!
//! JPEG is the only format whose header can sit arbitrarily deep in the file
//! (EXIF and ICC segments come first), so it is the only parser that reports
//! [`HeaderError::Incomplete`] to ask for a larger range.

use crate::types::Dimensions;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    #[error("not a recognized image header")]
    NotRecognized,
    #[error("image header truncated before the size was found")]
    Incomplete,
}

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const GIF87_SIGNATURE: &[u8] = b"GIF87a";
const GIF89_SIGNATURE: &[u8] = b"GIF89a";
const JPEG_SOI: &[u8] = &[0xFF, 0xD8];

const SOF_BASELINE: u8 = 0xC0;
const SOF_PROGRESSIVE: u8 = 0xC2;

/// Image formats the header parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Gif,
    Jpeg,
}

impl ImageFormat {
    /// Format from a file extension, case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "jpg" | "jpeg" | "jpe" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Format from the leading signature bytes.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(PNG_SIGNATURE) {
            Some(Self::Png)
        } else if data.starts_with(GIF87_SIGNATURE) || data.starts_with(GIF89_SIGNATURE) {
            Some(Self::Gif)
        } else if data.starts_with(JPEG_SOI) {
            Some(Self::Jpeg)
        } else {
            None
        }
    }

    /// Bytes needed to read the dimensions, on the first attempt.
    pub fn initial_range(self) -> usize {
        match self {
            Self::Png => 24,
            Self::Gif => 10,
            Self::Jpeg => 2048,
        }
    }

    pub fn parse(self, data: &[u8]) -> Result<Dimensions, HeaderError> {
        match self {
            Self::Png => parse_png(data),
            Self::Gif => parse_gif(data),
            Self::Jpeg => parse_jpeg(data),
        }
    }
}

/// Parse whatever supported format the bytes start with.
pub fn parse_any(data: &[u8]) -> Result<Dimensions, HeaderError> {
    ImageFormat::sniff(data)
        .ok_or(HeaderError::NotRecognized)?
        .parse(data)
}

pub fn parse_png(data: &[u8]) -> Result<Dimensions, HeaderError> {
    if !data.starts_with(PNG_SIGNATURE) || data.len() < 24 {
        return Err(HeaderError::NotRecognized);
    }
    Ok(Dimensions::new(be_u32(&data[16..20]), be_u32(&data[20..24])))
}

pub fn parse_gif(data: &[u8]) -> Result<Dimensions, HeaderError> {
    let signed = data.starts_with(GIF87_SIGNATURE) || data.starts_with(GIF89_SIGNATURE);
    if !signed || data.len() < 10 {
        return Err(HeaderError::NotRecognized);
    }
    let width = u16::from_le_bytes([data[6], data[7]]);
    let height = u16::from_le_bytes([data[8], data[9]]);
    Ok(Dimensions::new(width.into(), height.into()))
}

/// Walk JPEG segments until a start-of-frame marker.
///
/// Segment layout:
///   Bytes 0-1: marker (`FF xx`)
///   Bytes 2-3: length (big-endian u16, counts itself but not the marker)
///   Bytes 4+:  payload
pub fn parse_jpeg(data: &[u8]) -> Result<Dimensions, HeaderError> {
    if !data.starts_with(JPEG_SOI) {
        return Err(HeaderError::NotRecognized);
    }

    // First segment after SOI (APPn) is skipped without inspecting its type.
    let first_len = be_u16_at(data, 4).ok_or(HeaderError::Incomplete)?;
    let mut pos = 4 + usize::from(first_len);

    loop {
        let header = data.get(pos..pos + 4).ok_or(HeaderError::Incomplete)?;
        if header[0] != 0xFF {
            return Err(HeaderError::NotRecognized);
        }
        let marker = header[1];
        let length = usize::from(u16::from_be_bytes([header[2], header[3]]));

        if marker == SOF_BASELINE || marker == SOF_PROGRESSIVE {
            // Skip marker, length and the 1-byte precision.
            let frame = data.get(pos + 5..pos + 9).ok_or(HeaderError::Incomplete)?;
            let height = u16::from_be_bytes([frame[0], frame[1]]);
            let width = u16::from_be_bytes([frame[2], frame[3]]);
            return Ok(Dimensions::new(width.into(), height.into()));
        }

        if length < 2 {
            return Err(HeaderError::NotRecognized);
        }
        pos += 2 + length;
    }
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn be_u16_at(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}
