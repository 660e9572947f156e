//! Live document feeds and aggregate counters over the library store

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::lock;
use crate::error::Result;
use crate::models::{Album, RecordKind};
use crate::store::DocumentStore;

/// Identifies one open live feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedToken(u64);

/// An open subscription to one document
pub struct LiveFeed<T> {
    pub token: FeedToken,
    pub updates: mpsc::UnboundedReceiver<T>,
}

#[derive(Debug, Clone, Copy)]
struct CachedCounters<T> {
    value: T,
    fetched_at: Instant,
}

struct ProviderInner {
    store: Arc<dyn DocumentStore>,
    feeds: Mutex<HashMap<FeedToken, JoinHandle<()>>>,
    next_token: AtomicU64,
    counters_ttl: Duration,
    artist_counters: Mutex<HashMap<String, CachedCounters<(usize, usize)>>>,
    album_counters: Mutex<HashMap<String, CachedCounters<usize>>>,
}

/// Shared access to the library database
///
/// Cheap to clone; clones share feeds and cached counters.
#[derive(Clone)]
pub struct LibraryProvider {
    inner: Arc<ProviderInner>,
}

impl LibraryProvider {
    pub fn new(store: Arc<dyn DocumentStore>, counters_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                store,
                feeds: Mutex::new(HashMap::new()),
                next_token: AtomicU64::new(1),
                counters_ttl,
                artist_counters: Mutex::new(HashMap::new()),
                album_counters: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.store
    }

    /// Subscribe to one document
    ///
    /// The current document is delivered first when it exists, followed by
    /// every later write to the same id in the order the store applied them.
    /// Documents that do not deserialize as `T` are skipped. When the change
    /// stream overflows, the document is read again and delivered as is.
    pub fn live_feed<T>(&self, collection: &str, id: &str) -> LiveFeed<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let token = FeedToken(self.inner.next_token.fetch_add(1, Ordering::Relaxed));
        let (tx, updates) = mpsc::unbounded_channel();

        // Subscribe before reading so no write between the two is lost
        let mut changes = self.inner.store.changes();
        let store = Arc::clone(&self.inner.store);
        let collection = collection.to_string();
        let id = id.to_string();
        debug!("Opening feed {:?} on {}/{}", token, collection, id);

        let handle = tokio::spawn(async move {
            match store.get(&collection, &id).await {
                Ok(Some(doc)) => {
                    if !deliver(&tx, doc, &id) {
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Initial read of {}/{} failed: {}", collection, id, e),
            }

            loop {
                match changes.recv().await {
                    Ok(change) if change.collection == collection && change.id == id => {
                        if let Some(doc) = change.doc
                            && !deliver(&tx, doc, &id)
                        {
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        // The skipped changes may include this document; resync from the store
                        warn!("Feed on {} lagged, {} changes skipped", id, skipped);
                        match store.get(&collection, &id).await {
                            Ok(Some(doc)) => {
                                if !deliver(&tx, doc, &id) {
                                    return;
                                }
                            }
                            Ok(None) => {}
                            Err(e) => warn!("Resync of {}/{} failed: {}", collection, id, e),
                        }
                    }
                    Err(RecvError::Closed) => return,
                }
            }
        });

        lock(&self.inner.feeds).insert(token, handle);
        LiveFeed { token, updates }
    }

    /// Close feeds; unknown or already closed tokens are ignored
    pub fn cancel_feeds(&self, tokens: &[FeedToken]) {
        let mut feeds = lock(&self.inner.feeds);
        for token in tokens {
            if let Some(handle) = feeds.remove(token) {
                debug!("Cancelling feed {:?}", token);
                handle.abort();
            }
        }
    }

    /// Number of feeds currently open
    pub fn open_feeds(&self) -> usize {
        lock(&self.inner.feeds).len()
    }

    /// Album and track counts below an artist URI
    ///
    /// Served from a cache for the configured TTL, so counts may briefly lag
    /// behind the store.
    pub async fn get_artist_counters(&self, id: &str) -> Result<(usize, usize)> {
        if let Some(cached) = fresh(&self.inner.artist_counters, id, self.inner.counters_ttl) {
            return Ok(cached);
        }

        let prefix = format!("{}/", id);
        let albums = self
            .inner
            .store
            .all_docs(RecordKind::Album.collection(), &prefix)
            .await?
            .len();
        let tracks = self.count_tracks(&prefix).await?;
        debug!("Counters for {}: {} albums, {} tracks", id, albums, tracks);

        remember(&self.inner.artist_counters, id, (albums, tracks));
        Ok((albums, tracks))
    }

    /// Track count below an album URI
    pub async fn get_album_counters(&self, id: &str) -> Result<usize> {
        if let Some(cached) = fresh(&self.inner.album_counters, id, self.inner.counters_ttl) {
            return Ok(cached);
        }

        let tracks = self.count_tracks(&format!("{}/", id)).await?;
        remember(&self.inner.album_counters, id, tracks);
        Ok(tracks)
    }

    async fn count_tracks(&self, prefix: &str) -> Result<usize> {
        let tracks = self
            .inner
            .store
            .all_docs(RecordKind::Track.collection(), prefix)
            .await?;
        Ok(tracks
            .iter()
            .filter(|t| !t.get("hidden").and_then(Value::as_bool).unwrap_or(false))
            .count())
    }

    /// Fetch and deserialize one document
    pub async fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        match self.inner.store.get(collection, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    /// Every album in the library, ordered by URI
    pub async fn all_albums(&self) -> Result<Vec<Album>> {
        self.albums_under("library/").await
    }

    /// Albums of one artist, ordered by URI
    pub async fn artist_albums(&self, artist_id: &str) -> Result<Vec<Album>> {
        self.albums_under(&format!("{}/", artist_id)).await
    }

    async fn albums_under(&self, prefix: &str) -> Result<Vec<Album>> {
        let docs = self
            .inner
            .store
            .all_docs(RecordKind::Album.collection(), prefix)
            .await?;
        Ok(docs
            .into_iter()
            .filter_map(|doc| match serde_json::from_value::<Album>(doc) {
                Ok(album) => Some(album),
                Err(e) => {
                    warn!("Skipping malformed album document: {}", e);
                    None
                }
            })
            .collect())
    }
}

fn deliver<T: DeserializeOwned>(tx: &mpsc::UnboundedSender<T>, doc: Value, id: &str) -> bool {
    match serde_json::from_value(doc) {
        Ok(value) => tx.send(value).is_ok(),
        Err(e) => {
            warn!("Dropping undecodable document {}: {}", id, e);
            true
        }
    }
}

fn fresh<T: Copy>(
    cache: &Mutex<HashMap<String, CachedCounters<T>>>,
    id: &str,
    ttl: Duration,
) -> Option<T> {
    lock(cache)
        .get(id)
        .filter(|c| c.fetched_at.elapsed() < ttl)
        .map(|c| c.value)
}

fn remember<T>(cache: &Mutex<HashMap<String, CachedCounters<T>>>, id: &str, value: T) {
    lock(cache).insert(
        id.to_string(),
        CachedCounters {
            value,
            fetched_at: Instant::now(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Artist;
    use crate::store::{CHANGE_CAPACITY, MemoryStore};
    use serde_json::json;

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .put("artists", json!({"_id": "library/radiohead", "name": "Radiohead"}))
            .await
            .unwrap();
        for (id, name) in [
            ("library/radiohead/ok-computer", "OK Computer"),
            ("library/radiohead/kid-a", "Kid A"),
            ("library/muse/absolution", "Absolution"),
        ] {
            let artist = id.rsplit_once('/').unwrap().0;
            store
                .put("albums", json!({"_id": id, "name": name, "artist": artist}))
                .await
                .unwrap();
        }
        for id in [
            "library/radiohead/ok-computer/01/airbag",
            "library/radiohead/ok-computer/02/paranoid-android",
            "library/radiohead/kid-a/01/everything-in-its-right-place",
        ] {
            store.put("tracks", json!({"_id": id})).await.unwrap();
        }
        store
            .put(
                "tracks",
                json!({"_id": "library/radiohead/kid-a/99/hidden", "hidden": true}),
            )
            .await
            .unwrap();
        store
    }

    fn provider(store: Arc<MemoryStore>) -> LibraryProvider {
        LibraryProvider::new(store, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_feed_emits_current_then_changes() {
        let store = seeded_store().await;
        let provider = provider(store.clone());

        let mut feed = provider.live_feed::<Artist>("artists", "library/radiohead");
        let first = feed.updates.recv().await.unwrap();
        assert_eq!(first.name, "Radiohead");

        store
            .put("artists", json!({"_id": "library/muse", "name": "Muse"}))
            .await
            .unwrap();
        store
            .put(
                "artists",
                json!({"_id": "library/radiohead", "name": "Radiohead", "bio": "Oxford"}),
            )
            .await
            .unwrap();

        let second = feed.updates.recv().await.unwrap();
        assert_eq!(second.id, "library/radiohead");
        assert_eq!(second.bio.as_deref(), Some("Oxford"));
    }

    #[tokio::test]
    async fn test_feed_recovers_change_lost_to_lag() {
        let store = seeded_store().await;
        let provider = provider(store.clone());

        let mut feed = provider.live_feed::<Artist>("artists", "library/radiohead");
        assert_eq!(feed.updates.recv().await.unwrap().name, "Radiohead");

        store
            .put("artists", json!({"_id": "library/radiohead", "name": "Radiohead v2"}))
            .await
            .unwrap();
        for i in 0..CHANGE_CAPACITY + 44 {
            store
                .put(
                    "tracks",
                    json!({"_id": format!("library/muse/absolution/{:02}/bulk-{}", i % 99, i)}),
                )
                .await
                .unwrap();
        }

        let update = tokio::time::timeout(Duration::from_secs(5), feed.updates.recv())
            .await
            .expect("feed never caught up")
            .unwrap();
        assert_eq!(update.name, "Radiohead v2");
    }

    #[tokio::test]
    async fn test_feed_for_missing_document_waits() {
        let store = Arc::new(MemoryStore::new());
        let provider = provider(store.clone());

        let mut feed = provider.live_feed::<Artist>("artists", "library/blur");
        tokio::task::yield_now().await;
        assert!(feed.updates.try_recv().is_err());

        store
            .put("artists", json!({"_id": "library/blur", "name": "Blur"}))
            .await
            .unwrap();
        assert_eq!(feed.updates.recv().await.unwrap().name, "Blur");
    }

    #[tokio::test]
    async fn test_cancel_feeds_stops_delivery() {
        let store = seeded_store().await;
        let provider = provider(store.clone());

        let mut feed = provider.live_feed::<Artist>("artists", "library/radiohead");
        feed.updates.recv().await.unwrap();
        assert_eq!(provider.open_feeds(), 1);

        provider.cancel_feeds(&[feed.token]);
        assert_eq!(provider.open_feeds(), 0);

        store
            .put("artists", json!({"_id": "library/radiohead", "name": "Changed"}))
            .await
            .unwrap();
        assert!(feed.updates.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let store = seeded_store().await;
        let provider = provider(store);

        let feed = provider.live_feed::<Artist>("artists", "library/radiohead");
        provider.cancel_feeds(&[feed.token]);
        provider.cancel_feeds(&[feed.token]);
        provider.cancel_feeds(&[FeedToken(9999)]);
        provider.cancel_feeds(&[]);
        assert_eq!(provider.open_feeds(), 0);
    }

    #[tokio::test]
    async fn test_artist_counters() {
        let store = seeded_store().await;
        let provider = provider(store);

        let counters = provider.get_artist_counters("library/radiohead").await.unwrap();
        assert_eq!(counters, (2, 3));
        assert_eq!(provider.get_artist_counters("library/muse").await.unwrap(), (1, 0));
        assert_eq!(
            provider
                .get_album_counters("library/radiohead/ok-computer")
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_counters_served_from_cache() {
        let store = seeded_store().await;
        let provider = provider(store.clone());

        assert_eq!(
            provider.get_artist_counters("library/radiohead").await.unwrap(),
            (2, 3)
        );
        store
            .put(
                "albums",
                json!({"_id": "library/radiohead/in-rainbows", "name": "In Rainbows", "artist": "library/radiohead"}),
            )
            .await
            .unwrap();
        assert_eq!(
            provider.get_artist_counters("library/radiohead").await.unwrap(),
            (2, 3)
        );

        let uncached = LibraryProvider::new(store, Duration::ZERO);
        assert_eq!(
            uncached.get_artist_counters("library/radiohead").await.unwrap(),
            (3, 3)
        );
    }

    #[tokio::test]
    async fn test_album_listings() {
        let store = seeded_store().await;
        let provider = provider(store);

        let all = provider.all_albums().await.unwrap();
        assert_eq!(all.len(), 3);

        let albums = provider.artist_albums("library/radiohead").await.unwrap();
        let names: Vec<_> = albums.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Kid A", "OK Computer"]);

        let artist: Option<Artist> = provider.get("artists", "library/radiohead").await.unwrap();
        assert_eq!(artist.unwrap().name, "Radiohead");
    }
}
