//! Shared fixtures for row tests

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{ItemContext, ItemLifecycle};
use crate::error::{Error, Result};
use crate::library::{ArtworkSource, BlobRegistry, ImageSizing, LibraryProvider};
use crate::store::{DocumentStore, MemoryStore};

/// Artwork source that records requests and serves fixed bytes
#[derive(Default)]
pub struct RecordingArtwork {
    requests: Mutex<Vec<String>>,
}

impl RecordingArtwork {
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtworkSource for RecordingArtwork {
    async fn artwork(&self, id: &str, sizing: ImageSizing) -> Result<Bytes> {
        self.requests
            .lock()
            .unwrap()
            .push(format!("{}:{}", id, sizing.as_str()));
        if id.contains("missing") {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(Bytes::from_static(b"artwork"))
    }
}

/// Two artists, three albums and a handful of tracks
pub async fn fixture() -> (ItemContext, Arc<RecordingArtwork>) {
    let store = Arc::new(MemoryStore::new());
    let docs = [
        ("artists", json!({"_id": "library/radiohead", "name": "Radiohead"})),
        ("artists", json!({"_id": "library/muse", "name": "Muse"})),
        (
            "albums",
            json!({"_id": "library/radiohead/ok-computer", "name": "OK Computer", "artist": "library/radiohead"}),
        ),
        (
            "albums",
            json!({"_id": "library/radiohead/kid-a", "name": "Kid A", "artist": "library/radiohead"}),
        ),
        (
            "albums",
            json!({"_id": "library/muse/absolution", "name": "Absolution", "artist": "library/muse"}),
        ),
        ("tracks", json!({"_id": "library/radiohead/ok-computer/01/airbag"})),
        (
            "tracks",
            json!({"_id": "library/radiohead/ok-computer/02/paranoid-android"}),
        ),
        (
            "tracks",
            json!({"_id": "library/radiohead/kid-a/01/everything-in-its-right-place"}),
        ),
    ];
    for (collection, doc) in docs {
        store.put(collection, doc).await.unwrap();
    }

    let artwork = Arc::new(RecordingArtwork::default());
    let ctx = ItemContext {
        provider: LibraryProvider::new(store, Duration::from_secs(60)),
        artwork: artwork.clone(),
        blobs: BlobRegistry::new(),
    };
    (ctx, artwork)
}

/// Let background tasks run and poll `row` until `done` holds
pub async fn drive(row: &mut ItemLifecycle, done: impl Fn(&ItemLifecycle) -> bool) {
    for _ in 0..100 {
        tokio::task::yield_now().await;
        row.poll();
        if done(row) {
            return;
        }
    }
    panic!("row {} never settled", row.id());
}
