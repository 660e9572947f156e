//! Album list with external suggestions
//!
//! Without an artist scope the list shows every album, fuzzy-filtered by the
//! filter text. Scoped to an artist it shows that artist's albums followed by
//! a search row; triggering it asks the metadata provider for the artist's
//! top albums and appends the ones the library lacks.

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::navigation::{LibraryRoute, Navigator};
use super::notify::Notifier;
use crate::datasource::{CandidateSource, displayable};
use crate::error::Result;
use crate::library::LibraryProvider;
use crate::models::{AlbumParams, Artist, DsAlbum, UriParams, album_params};

/// Most candidates kept from one search
pub const MAX_CANDIDATES: usize = 20;

/// One row of the list
#[derive(Debug, Clone, PartialEq)]
pub enum ListEntry {
    /// Library album, by URI
    Album(String),
    /// Row offering to search the metadata provider
    SearchPrompt,
    /// Search in flight
    Searching,
    Candidate(DsAlbum),
}

impl ListEntry {
    /// Stable row key
    pub fn key(&self) -> String {
        match self {
            ListEntry::Album(uri) => uri.clone(),
            ListEntry::SearchPrompt => "?search-albums".to_string(),
            ListEntry::Searching => "?searching-albums".to_string(),
            ListEntry::Candidate(album) => format!("results?{}/{}", album.artist, album.name),
        }
    }
}

/// An artist and the URIs of its albums
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArtistEntry {
    pub id: String,
    pub name: String,
    pub albums: Vec<String>,
}

/// What the view knows about the library
#[derive(Debug, Clone, Default)]
pub struct LibraryState {
    pub albums: Vec<String>,
    pub artists_by_id: HashMap<String, ArtistEntry>,
}

/// Placement of the list on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutMetrics {
    pub window_height: u32,
    /// Offset of the list from the top of the window
    pub top: u32,
    pub width: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Click {
    pub button: MouseButton,
    pub default_prevented: bool,
}

impl Click {
    pub fn primary() -> Self {
        Self {
            button: MouseButton::Primary,
            default_prevented: false,
        }
    }
}

enum ViewEvent {
    Candidates {
        artist_id: String,
        result: Result<Vec<DsAlbum>>,
    },
}

pub struct AlbumsListView {
    source: Arc<dyn CandidateSource>,
    notifier: Rc<dyn Notifier>,
    artist: Option<String>,
    all: bool,
    filter: String,
    ds_results: HashMap<String, Vec<DsAlbum>>,
    display_results: bool,
    height: Option<u32>,
    width: Option<u32>,
    library: LibraryState,
    matcher: SkimMatcherV2,
    events_tx: mpsc::UnboundedSender<ViewEvent>,
    events_rx: mpsc::UnboundedReceiver<ViewEvent>,
}

impl AlbumsListView {
    pub fn new(source: Arc<dyn CandidateSource>, notifier: Rc<dyn Notifier>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            source,
            notifier,
            artist: None,
            all: false,
            filter: String::new(),
            ds_results: HashMap::new(),
            display_results: false,
            height: None,
            width: None,
            library: LibraryState::default(),
            matcher: SkimMatcherV2::default(),
            events_tx,
            events_rx,
        }
    }

    /// Scope the list to an artist slug, or to the whole library
    pub fn set_artist(&mut self, artist: Option<&str>) {
        if self.artist.as_deref() == artist {
            return;
        }
        debug!("Album list scope: {:?}", artist);
        self.artist = artist.map(str::to_string);
        self.display_results = false;
    }

    pub fn set_route(&mut self, route: &LibraryRoute) {
        self.all = route.all;
        self.set_artist(route.artist.as_deref());
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    pub fn artist_id(&self) -> Option<String> {
        self.artist.as_ref().map(|a| format!("library/{}", a))
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.to_string();
    }

    pub fn library(&self) -> &LibraryState {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut LibraryState {
        &mut self.library
    }

    /// Load what the current scope needs from the store
    pub async fn fetch(&mut self, provider: &LibraryProvider) -> Result<()> {
        match self.artist_id() {
            Some(artist_id) => {
                let artist: Option<Artist> = provider.get("artists", &artist_id).await?;
                let albums = provider.artist_albums(&artist_id).await?;
                let entry = ArtistEntry {
                    name: artist.map(|a| a.name).unwrap_or_default(),
                    id: artist_id.clone(),
                    albums: albums.into_iter().map(|a| a.id).collect(),
                };
                debug!("{} has {} albums", artist_id, entry.albums.len());
                self.library.artists_by_id.insert(artist_id, entry);
            }
            None => {
                let albums = provider.all_albums().await?;
                self.library.albums = albums.into_iter().map(|a| a.id).collect();
                debug!("Library has {} albums", self.library.albums.len());
            }
        }
        Ok(())
    }

    /// Library albums of the current scope
    pub fn albums(&self) -> &[String] {
        match self.artist_id() {
            Some(id) => self
                .library
                .artists_by_id
                .get(&id)
                .map(|a| a.albums.as_slice())
                .unwrap_or(&[]),
            None => &self.library.albums,
        }
    }

    pub fn items(&self) -> Vec<ListEntry> {
        let mut items: Vec<ListEntry> = Vec::new();

        let Some(artist_id) = self.artist_id() else {
            items.extend(self.filtered_albums().into_iter().map(ListEntry::Album));
            return items;
        };

        items.extend(self.albums().iter().cloned().map(ListEntry::Album));
        if !self.display_results {
            items.push(ListEntry::SearchPrompt);
            return items;
        }
        match self.ds_results.get(&artist_id) {
            Some(candidates) => {
                let known = self.albums();
                // Same-named candidates would share a row key
                let mut shown = HashSet::new();
                items.extend(
                    candidates
                        .iter()
                        .filter(|c| {
                            album_params(&artist_id, &c.name)
                                .and_then(|p| p.encode())
                                .is_ok_and(|uri| !known.contains(&uri) && shown.insert(uri))
                        })
                        .take(MAX_CANDIDATES)
                        .cloned()
                        .map(ListEntry::Candidate),
                );
            }
            None => items.push(ListEntry::Searching),
        }
        items
    }

    fn filtered_albums(&self) -> Vec<String> {
        if self.filter.is_empty() {
            return self.library.albums.clone();
        }
        let mut scored: Vec<(i64, &String)> = self
            .library
            .albums
            .iter()
            .filter_map(|uri| {
                self.matcher
                    .fuzzy_match(uri, &self.filter)
                    .map(|score| (score, uri))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, uri)| uri.clone()).collect()
    }

    /// Ask the metadata provider for the scoped artist's top albums
    pub fn handle_search_click(&mut self) {
        let Some(artist_id) = self.artist_id() else {
            return;
        };
        let Some(artist) = self.library.artists_by_id.get(&artist_id) else {
            self.notifier
                .error(&format!("{} is not loaded yet", artist_id));
            return;
        };

        self.display_results = true;
        info!("Searching albums of {}", artist.name);

        let source = Arc::clone(&self.source);
        let tx = self.events_tx.clone();
        let name = artist.name.clone();
        tokio::spawn(async move {
            let result = source.artist_top_albums(&name).await;
            let _ = tx.send(ViewEvent::Candidates { artist_id, result });
        });
    }

    /// Apply finished searches; true if the list changed
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                ViewEvent::Candidates { artist_id, result } => match result {
                    Ok(albums) => {
                        let albums = displayable(albums);
                        debug!("{} candidates for {}", albums.len(), artist_id);
                        self.ds_results.insert(artist_id, albums);
                        changed = true;
                    }
                    Err(e) => {
                        self.notifier
                            .error(&format!("Album search failed: {}", e));
                        if self.artist_id().as_deref() == Some(artist_id.as_str()) {
                            self.display_results = false;
                        }
                        changed = true;
                    }
                },
            }
        }
        changed
    }

    /// Recompute the list size; true if it changed
    pub fn compute_height(&mut self, metrics: LayoutMetrics) -> bool {
        if metrics.top == 0 || metrics.width == 0 {
            return false;
        }
        let height = metrics.window_height.saturating_sub(metrics.top);
        if Some(height) == self.height && Some(metrics.width) == self.width {
            return false;
        }
        self.height = Some(height);
        self.width = Some(metrics.width);
        true
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    /// Whether `album_uri` is the album selected by `route`
    pub fn is_active(album_uri: &str, route: &LibraryRoute) -> bool {
        match (AlbumParams::decode(album_uri), &route.album) {
            (Ok(params), Some(album)) => &params.name == album,
            _ => false,
        }
    }

    /// Navigate to an album, or back to the library when it is already open
    ///
    /// Returns true when the click was handled.
    pub fn handle_album_click(
        &self,
        album_uri: &str,
        active: bool,
        click: Click,
        navigator: &mut dyn Navigator,
    ) -> Result<bool> {
        if click.default_prevented || click.button != MouseButton::Primary {
            return Ok(false);
        }
        let path = if active {
            "/library".to_string()
        } else {
            LibraryRoute::for_album(album_uri, self.all)?.format()
        };
        navigator.push(&path);
        Ok(true)
    }
}
