//! Shared test utilities for the ngx-resizer test suite.
//!
//! Provides fixture builders for configs, registries and the media library,
//! plus byte-level image header builders for the header parser and fetcher.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let registry = test_registry();
//! let media = test_media(); // attachment 7: http://site/up/a.jpg, 2000×1000
//! let jpeg = jpeg_header(&[(0xE1, vec![0; 300])], 0xC0, 640, 480);
//! ```

use crate::config::SiteConfig;
use crate::host::InMemoryMediaLibrary;
use crate::sizes::{SizeDefinition, SizeRegistry};
use crate::types::Attachment;

// =========================================================================
// Config and registry
// =========================================================================

/// Stock config with uploads at `http://site/up`.
pub fn test_config() -> SiteConfig {
    let mut config = SiteConfig::default();
    config.uploads.base_url = "http://site/up".to_string();
    config
}

/// Registry with the stock sizes: thumbnail 150×150 cropped, medium 300×300,
/// large 1024×1024.
pub fn test_registry() -> SizeRegistry {
    SizeRegistry::new(
        SizeDefinition::new(150, 150, true),
        SizeDefinition::new(300, 300, false),
        SizeDefinition::new(1024, 1024, false),
    )
}

/// Media library holding attachment 7 at `http://site/up/a.jpg`, 2000×1000.
pub fn test_media() -> InMemoryMediaLibrary {
    let mut media = InMemoryMediaLibrary::new();
    media.insert(
        7,
        Attachment {
            url: "http://site/up/a.jpg".to_string(),
            width: Some(2000),
            height: Some(1000),
        },
    );
    media
}

// =========================================================================
// Image headers
// =========================================================================

/// PNG signature plus an IHDR chunk for `width`×`height`.
pub fn png_header(width: u32, height: u32) -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    // bit depth, colour type, compression, filter, interlace, CRC
    data.extend_from_slice(&[8, 6, 0, 0, 0, 0, 0, 0, 0]);
    data
}

/// GIF header with the given 6-byte signature and logical screen size.
pub fn gif_header(signature: &[u8], width: u16, height: u16) -> Vec<u8> {
    let mut data = signature.to_vec();
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&height.to_le_bytes());
    // packed fields, background colour, aspect ratio
    data.extend_from_slice(&[0xF7, 0, 0]);
    data
}

/// JPEG stream: SOI, a 16-byte JFIF APP0, the `extra` segments, a frame
/// header with marker `sof`, then a scan header.
///
/// With no extras the frame marker sits at byte 20.
pub fn jpeg_header(extra: &[(u8, Vec<u8>)], sof: u8, width: u16, height: u16) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];

    push_segment(&mut data, 0xE0, b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0");
    for (marker, payload) in extra {
        push_segment(&mut data, *marker, payload);
    }

    let mut frame = vec![8];
    frame.extend_from_slice(&height.to_be_bytes());
    frame.extend_from_slice(&width.to_be_bytes());
    frame.push(3);
    frame.extend_from_slice(&[1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
    push_segment(&mut data, sof, &frame);

    push_segment(&mut data, 0xDA, &[3, 1, 0, 2, 0x11, 3, 0x11, 0, 0x3F, 0]);
    data
}

fn push_segment(data: &mut Vec<u8>, marker: u8, payload: &[u8]) {
    let length = u16::try_from(payload.len() + 2).unwrap();
    data.extend_from_slice(&[0xFF, marker]);
    data.extend_from_slice(&length.to_be_bytes());
    data.extend_from_slice(payload);
}
