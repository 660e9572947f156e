//! Artist rows

use tracing::{debug, warn};

use super::pending::{Pending, Settled};
use super::{Content, ImageSlot, ItemContext, LibraryItem, load_embedded_artwork, release_artwork};
use crate::error::Result;
use crate::library::LiveFeed;
use crate::models::Artist;

/// What an artist row shows under the name
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ArtistSubtitle {
    /// Album and track counts
    #[default]
    Counters,
    Text(String),
    None,
}

pub struct ArtistItem {
    ctx: ItemContext,
    subtitle: ArtistSubtitle,
    id: Option<String>,
    artist: Option<Artist>,
    counters: Option<(usize, usize)>,
    feed: Option<LiveFeed<Artist>>,
    pending_counters: Option<Pending<Result<(usize, usize)>>>,
    image: Option<ImageSlot>,
}

impl ArtistItem {
    pub fn new(ctx: ItemContext, subtitle: ArtistSubtitle) -> Self {
        Self {
            ctx,
            subtitle,
            id: None,
            artist: None,
            counters: None,
            feed: None,
            pending_counters: None,
            image: None,
        }
    }

    pub fn artist(&self) -> Option<&Artist> {
        self.artist.as_ref()
    }

    pub fn counters(&self) -> Option<(usize, usize)> {
        self.counters
    }

    fn is_current(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }

    fn apply_counters(&mut self) -> bool {
        let Some(pending) = &mut self.pending_counters else {
            return false;
        };
        let result = match pending.try_take() {
            Settled::Waiting => return false,
            Settled::Dropped => {
                self.pending_counters = None;
                return false;
            }
            Settled::Done(result) => result,
        };
        let issued_for = pending.id().to_string();
        self.pending_counters = None;

        if !self.is_current(&issued_for) {
            debug!("Discarding counters of {}", issued_for);
            return false;
        }
        match result {
            Ok(counters) => {
                self.counters = Some(counters);
                true
            }
            Err(e) => {
                warn!("Counting records of {} failed: {}", issued_for, e);
                false
            }
        }
    }
}

impl LibraryItem for ArtistItem {
    fn load_item(&mut self, id: &str) {
        if !self.is_current(id) {
            self.artist = None;
            self.counters = None;
        }
        self.id = Some(id.to_string());
        self.feed = Some(self.ctx.provider.live_feed("artists", id));
    }

    fn unload_item(&mut self) {
        if let Some(feed) = self.feed.take() {
            self.ctx.provider.cancel_feeds(&[feed.token]);
        }
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
        match &self.artist {
            Some(artist) => Content::Text(artist.name.clone()),
            None => Content::Skeleton("Artist name".to_string()),
        }
    }

    fn render_subtitle(&self) -> Content {
        match &self.subtitle {
            ArtistSubtitle::Counters => match self.counters {
                Some((albums, tracks)) => {
                    Content::Text(format!("{} albums · {} tracks", albums, tracks))
                }
                None => Content::Skeleton("00 albums · 00 tracks".to_string()),
            },
            ArtistSubtitle::Text(text) => Content::Text(text.clone()),
            ArtistSubtitle::None => Content::Empty,
        }
    }

    fn class_names(&self) -> Vec<&'static str> {
        vec!["artist-component"]
    }

    fn poll(&mut self) -> bool {
        let mut changed = false;

        if let Some(feed) = &mut self.feed {
            while let Ok(artist) = feed.updates.try_recv() {
                if self.id.as_deref() != Some(artist.id.as_str()) {
                    continue;
                }
                if self.subtitle == ArtistSubtitle::Counters {
                    let provider = self.ctx.provider.clone();
                    let id = artist.id.clone();
                    self.pending_counters = Some(Pending::spawn(&artist.id, async move {
                        provider.get_artist_counters(&id).await
                    }));
                }
                self.artist = Some(artist);
                changed = true;
            }
        }

        self.apply_counters() || changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::tests_support::{drive, fixture};
    use crate::item::{ImageContent, ItemLifecycle, ItemProps, Layout};

    fn artist_row(ctx: &ItemContext, id: &str, layout: Layout) -> ItemLifecycle {
        let item = ArtistItem::new(ctx.clone(), ArtistSubtitle::Counters);
        ItemLifecycle::new(Box::new(item), ItemProps::new(id, layout))
    }

    #[tokio::test]
    async fn test_skeleton_until_delivered() {
        let (ctx, _artwork) = fixture().await;
        let mut row = artist_row(&ctx, "library/radiohead", Layout::Minimal);

        let view = row.render();
        assert_eq!(view.header, Content::Skeleton("Artist name".to_string()));
        assert_eq!(
            view.subtitle,
            Content::Skeleton("00 albums · 00 tracks".to_string())
        );

        row.mount(None);
        drive(&mut row, |r| !r.render().subtitle.is_skeleton()).await;

        let view = row.render();
        assert_eq!(view.header, Content::Text("Radiohead".to_string()));
        assert_eq!(view.subtitle, Content::Text("2 albums · 3 tracks".to_string()));
        assert!(view.has_class("artist-component"));
    }

    #[tokio::test]
    async fn test_identity_change_clears_previous_artist() {
        let (ctx, _artwork) = fixture().await;
        let mut row = artist_row(&ctx, "library/radiohead", Layout::Minimal);
        row.mount(None);
        drive(&mut row, |r| !r.render().subtitle.is_skeleton()).await;

        row.set_id("library/muse");
        assert!(row.render().header.is_skeleton());
        assert_eq!(ctx.provider.open_feeds(), 1);

        drive(&mut row, |r| !r.render().subtitle.is_skeleton()).await;
        let view = row.render();
        assert_eq!(view.header, Content::Text("Muse".to_string()));
        assert_eq!(view.subtitle, Content::Text("1 albums · 0 tracks".to_string()));
    }

    #[tokio::test]
    async fn test_stale_counters_discarded() {
        let (ctx, _artwork) = fixture().await;
        let mut item = ArtistItem::new(ctx.clone(), ArtistSubtitle::Counters);
        item.load_item("library/muse");
        item.pending_counters = Some(Pending::ready("library/radiohead", Ok((7, 70))));

        item.poll();
        assert_ne!(item.counters(), Some((7, 70)));
        assert!(item.pending_counters.is_none());
        item.unload_item();
    }

    #[tokio::test]
    async fn test_embedded_artwork_revoked_once() {
        let (ctx, artwork) = fixture().await;
        let mut row = artist_row(&ctx, "library/radiohead", Layout::Compact);
        row.mount(None);
        drive(&mut row, |r| matches!(r.render().image, ImageContent::Blob(_))).await;
        assert_eq!(ctx.blobs.live_count(), 1);
        assert_eq!(artwork.requests(), vec!["library/radiohead:small"]);

        row.unmount();
        assert_eq!(ctx.blobs.live_count(), 0);
        assert_eq!(row.render().image, ImageContent::Placeholder);
    }

    #[tokio::test]
    async fn test_minimal_layout_never_fetches_artwork() {
        let (ctx, artwork) = fixture().await;
        let mut row = artist_row(&ctx, "library/radiohead", Layout::Minimal);
        row.mount(None);
        drive(&mut row, |r| !r.render().header.is_skeleton()).await;

        assert!(artwork.requests().is_empty());
        row.unmount();
    }

    #[tokio::test]
    async fn test_text_subtitle() {
        let (ctx, _artwork) = fixture().await;
        let item = ArtistItem::new(ctx, ArtistSubtitle::Text("Featured".to_string()));
        assert_eq!(item.render_subtitle(), Content::Text("Featured".to_string()));

        let (ctx, _artwork) = fixture().await;
        let item = ArtistItem::new(ctx, ArtistSubtitle::None);
        assert_eq!(item.render_subtitle(), Content::Empty);
    }
}
