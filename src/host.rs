//! Boundary to the host CMS.
//!
//! The resizer never owns content. It reads attachments from a
//! [`MediaLibrary`] and reads or writes external thumbnails through a
//! [`ThumbnailStore`]. The in-memory implementations back the CLI (loaded
//! from a JSON file) and the tests.
//!
//! ## Media library file
//!
//! ```json
//! {
//!   "7": { "url": "https://example.com/wp-content/uploads/a.jpg", "width": 1200, "height": 800 },
//!   "9": { "url": "https://example.com/wp-content/uploads/b.png" }
//! }
//! ```

use crate::types::{Attachment, ExternalThumbnail};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read access to the host's attachments.
pub trait MediaLibrary {
    /// The attachment with this id, `None` when it does not exist.
    fn attachment(&self, id: u64) -> Option<Attachment>;
}

/// Per-item external thumbnail records.
pub trait ThumbnailStore {
    fn external_thumbnail(&self, item: u64) -> Option<ExternalThumbnail>;
    /// Replace the record of `item`.
    fn store_external_thumbnail(&mut self, item: u64, thumbnail: ExternalThumbnail);
    /// Remove the URL and cached dimensions of `item`.
    fn clear_external_thumbnail(&mut self, item: u64);
}

/// A media library with no attachments.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMedia;

impl MediaLibrary for NoMedia {
    fn attachment(&self, _id: u64) -> Option<Attachment> {
        None
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryMediaLibrary {
    attachments: BTreeMap<u64, Attachment>,
}

impl InMemoryMediaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u64, attachment: Attachment) {
        self.attachments.insert(id, attachment);
    }

    pub fn from_json(json: &str) -> Result<Self, HostError> {
        let attachments = serde_json::from_str(json)?;
        Ok(Self { attachments })
    }

    pub fn load(path: &Path) -> Result<Self, HostError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }
}

impl MediaLibrary for InMemoryMediaLibrary {
    fn attachment(&self, id: u64) -> Option<Attachment> {
        self.attachments.get(&id).cloned()
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryThumbnailStore {
    records: HashMap<u64, ExternalThumbnail>,
}

impl InMemoryThumbnailStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThumbnailStore for InMemoryThumbnailStore {
    fn external_thumbnail(&self, item: u64) -> Option<ExternalThumbnail> {
        self.records.get(&item).cloned()
    }

    fn store_external_thumbnail(&mut self, item: u64, thumbnail: ExternalThumbnail) {
        self.records.insert(item, thumbnail);
    }

    fn clear_external_thumbnail(&mut self, item: u64) {
        self.records.remove(&item);
    }
}
