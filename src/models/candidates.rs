//! Records returned by the external metadata provider
//!
//! Candidates share the shape of local records but are never written to the
//! library database by this crate; they are told apart by where they came from.

use serde::{Deserialize, Serialize};

/// Artist from the metadata provider
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DsArtist {
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub large_cover: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub top_albums: Vec<DsAlbum>,
}

/// Album from the metadata provider; `id` is `"<artist>/<album>"`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DsAlbum {
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub large_cover: Option<String>,
    #[serde(default)]
    pub tracks: Vec<DsTrack>,
}

/// Track from the metadata provider
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DsTrack {
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub number: Option<u32>,
}

/// Mixed search result, tagged with its kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DsRecord {
    Artist(DsArtist),
    Album(DsAlbum),
    Track(DsTrack),
}

impl DsRecord {
    pub fn name(&self) -> &str {
        match self {
            DsRecord::Artist(a) => &a.name,
            DsRecord::Album(a) => &a.name,
            DsRecord::Track(t) => &t.name,
        }
    }
}

impl DsAlbum {
    /// Whether the candidate can be displayed at all
    ///
    /// The provider pads results with coverless entries and `(null)` names.
    pub fn is_displayable(&self) -> bool {
        let has_cover = self.cover.as_deref().is_some_and(|c| !c.is_empty());
        has_cover && self.name != "(null)"
    }
}
