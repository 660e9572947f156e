//! Library documents as stored in the replicated database

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Kind of a library record, one per URI template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Artist,
    Album,
    Track,
    File,
    Tracker,
    Library,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Artist => "artist",
            RecordKind::Album => "album",
            RecordKind::Track => "track",
            RecordKind::File => "file",
            RecordKind::Tracker => "tracker",
            RecordKind::Library => "library",
        }
    }

    /// Database holding documents of this kind
    pub fn collection(&self) -> &'static str {
        match self {
            RecordKind::Artist => "artists",
            RecordKind::Album => "albums",
            RecordKind::Track => "tracks",
            RecordKind::File => "files",
            RecordKind::Tracker => "trackers",
            RecordKind::Library => "libraries",
        }
    }

    /// Whether the metadata provider can search for this kind
    pub fn is_searchable(&self) -> bool {
        matches!(
            self,
            RecordKind::Artist | RecordKind::Album | RecordKind::Track
        )
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "artist" => Ok(RecordKind::Artist),
            "album" => Ok(RecordKind::Album),
            "track" => Ok(RecordKind::Track),
            "file" => Ok(RecordKind::File),
            "tracker" => Ok(RecordKind::Tracker),
            "library" => Ok(RecordKind::Library),
            other => Err(Error::UnknownKind(other.to_string())),
        }
    }
}

/// Artist document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
}

/// Album document; `artist` is the parent artist URI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub name: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
}

/// Track document; `artist` and `album` are parent URIs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub hidden: bool,
}

/// Audio file backing a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub path: String,
    pub artist: String,
    pub album: String,
    pub track: String,
    pub bitrate: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<i64>,
}

/// Download tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub tracker_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Music library root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub name: String,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Album".parse::<RecordKind>().unwrap(), RecordKind::Album);
        assert!(matches!(
            "playlist".parse::<RecordKind>(),
            Err(Error::UnknownKind(kind)) if kind == "playlist"
        ));
    }

    #[test]
    fn test_searchable_kinds() {
        assert!(RecordKind::Track.is_searchable());
        assert!(!RecordKind::Tracker.is_searchable());
        assert!(!RecordKind::File.is_searchable());
    }

    #[test]
    fn test_album_document_shape() {
        let doc = serde_json::json!({
            "_id": "library/radiohead/ok-computer",
            "_rev": "3-abc",
            "name": "OK Computer",
            "artist": "library/radiohead"
        });
        let album: Album = serde_json::from_value(doc).unwrap();
        assert_eq!(album.id, "library/radiohead/ok-computer");
        assert_eq!(album.artist, "library/radiohead");
        assert_eq!(album.year, None);
    }

    #[test]
    fn test_tracker_type_field() {
        let tracker: Tracker = serde_json::from_str(
            r#"{"_id": "trackers/gazelle/what", "name": "What", "type": "gazelle"}"#,
        )
        .unwrap();
        assert_eq!(tracker.tracker_type, "gazelle");
    }
}
