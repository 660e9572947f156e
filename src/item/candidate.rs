//! Rows for albums found only at the metadata provider

use super::{Content, ImageContent, ImageSlot, LibraryItem};
use crate::models::DsAlbum;

/// An external album; everything it shows comes with the candidate itself
pub struct CandidateItem {
    album: DsAlbum,
    image: Option<ImageSlot>,
}

impl CandidateItem {
    pub fn new(album: DsAlbum) -> Self {
        Self { album, image: None }
    }

    /// Row key of a candidate, distinct from any library URI
    pub fn key(album: &DsAlbum) -> String {
        format!("candidate:{}/{}", album.artist, album.name)
    }
}

impl LibraryItem for CandidateItem {
    fn load_item(&mut self, _id: &str) {}

    fn unload_item(&mut self) {
        if let Some(slot) = self.image.take() {
            slot.reset();
        }
    }

    fn load_image(&mut self, _id: &str, target: &ImageSlot) {
        if target.sizing().is_none() {
            return;
        }
        if let Some(cover) = self.album.cover.as_deref().filter(|c| !c.is_empty()) {
            let ticket = target.begin();
            let _ = target.fulfil(ticket, ImageContent::Remote(cover.to_string()));
            self.image = Some(target.clone());
        }
    }

    fn render_header(&self) -> Content {
        Content::Text(self.album.name.clone())
    }

    fn render_subtitle(&self) -> Content {
        if self.album.artist.is_empty() {
            Content::Empty
        } else {
            Content::Text(self.album.artist.clone())
        }
    }

    fn class_names(&self) -> Vec<&'static str> {
        vec!["ds-album-component"]
    }
}
