//! Album rows

use tracing::{debug, warn};

use super::pending::{Pending, Settled};
use super::{Content, ImageSlot, ItemContext, LibraryItem, load_embedded_artwork, release_artwork};
use crate::error::Result;
use crate::library::{FeedToken, LiveFeed};
use crate::models::{Album, Artist};

/// What an album row shows under the name
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AlbumSubtitle {
    /// Track count
    Counters,
    /// Name of the album's artist, followed live
    #[default]
    Artist,
    Text(String),
    None,
}

pub struct AlbumItem {
    ctx: ItemContext,
    subtitle: AlbumSubtitle,
    id: Option<String>,
    album: Option<Album>,
    artist: Option<Artist>,
    tracks: Option<usize>,
    feed: Option<LiveFeed<Album>>,
    artist_feed: Option<LiveFeed<Artist>>,
    pending_tracks: Option<Pending<Result<usize>>>,
    image: Option<ImageSlot>,
}

impl AlbumItem {
    pub fn new(ctx: ItemContext, subtitle: AlbumSubtitle) -> Self {
        Self {
            ctx,
            subtitle,
            id: None,
            album: None,
            artist: None,
            tracks: None,
            feed: None,
            artist_feed: None,
            pending_tracks: None,
            image: None,
        }
    }

    pub fn album(&self) -> Option<&Album> {
        self.album.as_ref()
    }

    fn close_feeds(&mut self) {
        let mut tokens: Vec<FeedToken> = Vec::new();
        if let Some(feed) = self.feed.take() {
            tokens.push(feed.token);
        }
        if let Some(feed) = self.artist_feed.take() {
            tokens.push(feed.token);
        }
        self.ctx.provider.cancel_feeds(&tokens);
    }

    fn on_album(&mut self, album: Album) {
        match self.subtitle {
            AlbumSubtitle::Counters => {
                let provider = self.ctx.provider.clone();
                let id = album.id.clone();
                self.pending_tracks = Some(Pending::spawn(&album.id, async move {
                    provider.get_album_counters(&id).await
                }));
            }
            AlbumSubtitle::Artist => {
                let followed = self.album.as_ref().map(|a| a.artist.as_str());
                if self.artist_feed.is_none() || followed != Some(album.artist.as_str()) {
                    if let Some(feed) = self.artist_feed.take() {
                        self.ctx.provider.cancel_feeds(&[feed.token]);
                    }
                    self.artist = None;
                    self.artist_feed = Some(self.ctx.provider.live_feed("artists", &album.artist));
                }
            }
            _ => {}
        }
        self.album = Some(album);
    }

    fn apply_tracks(&mut self) -> bool {
        let Some(pending) = &mut self.pending_tracks else {
            return false;
        };
        let result = match pending.try_take() {
            Settled::Waiting => return false,
            Settled::Dropped => {
                self.pending_tracks = None;
                return false;
            }
            Settled::Done(result) => result,
        };
        let issued_for = pending.id().to_string();
        self.pending_tracks = None;

        if self.id.as_deref() != Some(issued_for.as_str()) {
            debug!("Discarding track count of {}", issued_for);
            return false;
        }
        match result {
            Ok(tracks) => {
                self.tracks = Some(tracks);
                true
            }
            Err(e) => {
                warn!("Counting tracks of {} failed: {}", issued_for, e);
                false
            }
        }
    }
}

impl LibraryItem for AlbumItem {
    fn load_item(&mut self, id: &str) {
        if self.id.as_deref() != Some(id) {
            self.album = None;
            self.artist = None;
            self.tracks = None;
        }
        self.id = Some(id.to_string());
        self.feed = Some(self.ctx.provider.live_feed("albums", id));
    }

    fn unload_item(&mut self) {
        self.close_feeds();
        if let Some(slot) = self.image.take() {
            release_artwork(&self.ctx, &slot);
        }
    }

    fn load_image(&mut self, id: &str, target: &ImageSlot) {
        if load_embedded_artwork(&self.ctx, id, target) {
            self.image = Some(target.clone());
        }
    }

    fn render_header(&self) -> Content {
        match &self.album {
            Some(album) => Content::Text(album.name.clone()),
            None => Content::Skeleton("Album name".to_string()),
        }
    }

    fn render_subtitle(&self) -> Content {
        match &self.subtitle {
            AlbumSubtitle::Counters => match self.tracks {
                Some(tracks) => Content::Text(format!("{} tracks", tracks)),
                None => Content::Skeleton("00 tracks".to_string()),
            },
            AlbumSubtitle::Artist => match &self.artist {
                Some(artist) => Content::Text(artist.name.clone()),
                None => Content::Skeleton("Artist name".to_string()),
            },
            AlbumSubtitle::Text(text) => Content::Text(text.clone()),
            AlbumSubtitle::None => Content::Empty,
        }
    }

    fn class_names(&self) -> Vec<&'static str> {
        vec!["album-component"]
    }

    fn poll(&mut self) -> bool {
        let mut changed = false;

        let mut delivered = Vec::new();
        if let Some(feed) = &mut self.feed {
            while let Ok(album) = feed.updates.try_recv() {
                delivered.push(album);
            }
        }
        for album in delivered {
            if self.id.as_deref() == Some(album.id.as_str()) {
                self.on_album(album);
                changed = true;
            }
        }

        if let Some(feed) = &mut self.artist_feed {
            while let Ok(artist) = feed.updates.try_recv() {
                let wanted = self.album.as_ref().map(|a| a.artist.as_str());
                if wanted == Some(artist.id.as_str()) {
                    self.artist = Some(artist);
                    changed = true;
                }
            }
        }

        self.apply_tracks() || changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::tests_support::{drive, fixture};
    use crate::item::{
        ImageContent, ItemLifecycle, ItemProps, Layout, ScrollMonitor, ViewportEvent,
        ViewportMonitor,
    };
    use crate::store::DocumentStore;
    use serde_json::json;

    fn album_row(ctx: &ItemContext, id: &str, subtitle: AlbumSubtitle) -> ItemLifecycle {
        let item = AlbumItem::new(ctx.clone(), subtitle);
        ItemLifecycle::new(Box::new(item), ItemProps::new(id, Layout::Medium))
    }

    #[tokio::test]
    async fn test_artist_subtitle_follows_artist() {
        let (ctx, artwork) = fixture().await;
        let mut row = album_row(&ctx, "library/radiohead/ok-computer", AlbumSubtitle::Artist);
        assert_eq!(
            row.render().subtitle,
            Content::Skeleton("Artist name".to_string())
        );

        row.mount(None);
        drive(&mut row, |r| !r.render().subtitle.is_skeleton()).await;
        let view = row.render();
        assert_eq!(view.header, Content::Text("OK Computer".to_string()));
        assert_eq!(view.subtitle, Content::Text("Radiohead".to_string()));
        assert!(view.has_class("album-component"));
        assert_eq!(ctx.provider.open_feeds(), 2);

        ctx.provider
            .store()
            .put(
                "artists",
                json!({"_id": "library/radiohead", "name": "Radiohead (UK)"}),
            )
            .await
            .unwrap();
        drive(&mut row, |r| r.render().subtitle.as_str() == "Radiohead (UK)").await;

        drive(&mut row, |r| matches!(r.render().image, ImageContent::Blob(_))).await;
        assert_eq!(
            artwork.requests(),
            vec!["library/radiohead/ok-computer:large"]
        );

        row.unmount();
        assert_eq!(ctx.provider.open_feeds(), 0);
        assert_eq!(ctx.blobs.live_count(), 0);
    }

    #[tokio::test]
    async fn test_counters_subtitle() {
        let (ctx, _artwork) = fixture().await;
        let mut row = album_row(&ctx, "library/radiohead/ok-computer", AlbumSubtitle::Counters);
        assert_eq!(row.render().subtitle, Content::Skeleton("00 tracks".to_string()));

        row.mount(None);
        drive(&mut row, |r| !r.render().subtitle.is_skeleton()).await;
        assert_eq!(row.render().subtitle, Content::Text("2 tracks".to_string()));
        row.unmount();
    }

    #[tokio::test]
    async fn test_failed_artwork_keeps_placeholder() {
        let (ctx, artwork) = fixture().await;
        ctx.provider
            .store()
            .put(
                "albums",
                json!({"_id": "library/muse/missing", "name": "Missing", "artist": "library/muse"}),
            )
            .await
            .unwrap();

        let mut row = album_row(&ctx, "library/muse/missing", AlbumSubtitle::None);
        row.mount(None);
        drive(&mut row, |r| !r.render().header.is_skeleton()).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        assert_eq!(artwork.requests().len(), 1);
        assert_eq!(row.render().image, ImageContent::Placeholder);
        assert_eq!(ctx.blobs.live_count(), 0);
        row.unmount();
    }

    #[tokio::test]
    async fn test_reentering_before_artwork_arrives_frees_every_blob() {
        let (ctx, artwork) = fixture().await;
        let monitor = ScrollMonitor::new();
        let mut row = album_row(&ctx, "library/radiohead/ok-computer", AlbumSubtitle::None);
        row.mount(Some(monitor.create("row")));

        monitor.update(["row"]);
        row.on_viewport(ViewportEvent::Enter);
        monitor.update(Vec::<String>::new());
        row.on_viewport(ViewportEvent::Exit);
        monitor.update(["row"]);
        row.on_viewport(ViewportEvent::Enter);

        drive(&mut row, |r| matches!(r.render().image, ImageContent::Blob(_))).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(artwork.requests().len(), 2);
        assert_eq!(ctx.blobs.live_count(), 1);

        row.unmount();
        assert_eq!(ctx.blobs.live_count(), 0);
    }
}
