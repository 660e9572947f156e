//! Artwork retrieval and in-memory image handles

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::lock;
use crate::error::Result;

/// Artwork resolution requested from the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSizing {
    Small,
    Large,
}

impl ImageSizing {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSizing::Small => "small",
            ImageSizing::Large => "large",
        }
    }
}

/// Source of embedded artwork for library records
#[async_trait]
pub trait ArtworkSource: Send + Sync {
    async fn artwork(&self, id: &str, sizing: ImageSizing) -> Result<Bytes>;
}

/// Handle to image bytes held by a [`BlobRegistry`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default)]
struct Blobs {
    next: u64,
    entries: HashMap<ObjectUrl, Bytes>,
}

/// Registry of decoded artwork handed out as object URLs
///
/// Every URL must be revoked once its image is no longer displayed.
#[derive(Clone, Default)]
pub struct BlobRegistry {
    blobs: Arc<Mutex<Blobs>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, data: Bytes) -> ObjectUrl {
        let mut blobs = lock(&self.blobs);
        blobs.next += 1;
        let url = ObjectUrl(format!("blob:compactd/{}", blobs.next));
        blobs.entries.insert(url.clone(), data);
        url
    }

    pub fn resolve(&self, url: &ObjectUrl) -> Option<Bytes> {
        lock(&self.blobs).entries.get(url).cloned()
    }

    /// Release a URL; false if it was already revoked or never issued
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        let released = lock(&self.blobs).entries.remove(url).is_some();
        if released {
            debug!("Revoked {}", url);
        }
        released
    }

    pub fn live_count(&self) -> usize {
        lock(&self.blobs).entries.len()
    }
}
