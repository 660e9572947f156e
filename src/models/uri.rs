//! Document identifiers for library records
//!
//! Every record is addressed by a path-like URI built from a route template,
//! e.g. an album lives at `library/<artist>/<name>`. Name segments are slugged
//! on the way in, so decoding yields the slug rather than the original name.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::HashMap;

use super::records::{Album, Artist, File, Library, RecordKind, Track, Tracker};
use super::slug::slugify;
use crate::error::{Error, Result};

/// A route template such as `library/:artist/:name`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    template: &'static str,
}

pub const ARTIST_ROUTE: Route = Route::new("library/:name");
pub const ALBUM_ROUTE: Route = Route::new("library/:artist/:name");
pub const TRACK_ROUTE: Route = Route::new("library/:artist/:album/:number/:name");
pub const FILE_ROUTE: Route =
    Route::new("library/:artist/:album/:number/:track/:bitrate/:hash");
pub const TRACKER_ROUTE: Route = Route::new("trackers/:type/:name");
pub const LIBRARY_ROUTE: Route = Route::new("config/library/:name");

impl Route {
    pub const fn new(template: &'static str) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &'static str {
        self.template
    }

    /// Number of `/`-separated segments in a matching URI
    pub fn segment_count(&self) -> usize {
        self.template.split('/').count()
    }

    /// Fill the template with parameter values
    pub fn format(&self, params: &[(&str, &str)]) -> Result<String> {
        let mut segments = Vec::new();
        for segment in self.template.split('/') {
            match segment.strip_prefix(':') {
                Some(key) => {
                    let value = params
                        .iter()
                        .find(|(k, _)| *k == key)
                        .map(|(_, v)| *v)
                        .ok_or_else(|| {
                            Error::malformed(self.template, format!("missing `{}`", key))
                        })?;
                    if value.is_empty() {
                        return Err(Error::malformed(
                            self.template,
                            format!("`{}` is empty", key),
                        ));
                    }
                    if value.contains('/') {
                        return Err(Error::malformed(
                            self.template,
                            format!("`{}` contains a path separator", key),
                        ));
                    }
                    segments.push(value);
                }
                None => segments.push(segment),
            }
        }
        Ok(segments.join("/"))
    }

    /// Match a URI against the template, returning parameter values by name
    pub fn parse<'a>(&self, uri: &'a str) -> Result<HashMap<&'static str, &'a str>> {
        let expected: Vec<&'static str> = self.template.split('/').collect();
        let actual: Vec<&'a str> = uri.split('/').collect();

        if expected.len() != actual.len() {
            return Err(Error::malformed(
                uri,
                format!(
                    "expected {} segments for `{}`, found {}",
                    expected.len(),
                    self.template,
                    actual.len()
                ),
            ));
        }

        let mut params = HashMap::new();
        for (pattern, value) in expected.into_iter().zip(actual) {
            match pattern.strip_prefix(':') {
                Some(key) => {
                    if value.is_empty() {
                        return Err(Error::malformed(uri, format!("`{}` is empty", key)));
                    }
                    params.insert(key, value);
                }
                None if pattern == value => {}
                None => {
                    return Err(Error::malformed(
                        uri,
                        format!("expected `{}` prefix segment, found `{}`", pattern, value),
                    ));
                }
            }
        }
        Ok(params)
    }
}

/// Typed parameters of one route template
pub trait UriParams: Sized {
    const ROUTE: Route;

    fn to_pairs(&self) -> Vec<(&'static str, &str)>;

    fn from_pairs(pairs: &HashMap<&'static str, &str>) -> Self;

    /// Build the document URI
    fn encode(&self) -> Result<String> {
        Self::ROUTE.format(&self.to_pairs())
    }

    /// Parse a document URI
    fn decode(uri: &str) -> Result<Self> {
        let pairs = Self::ROUTE.parse(uri)?;
        Ok(Self::from_pairs(&pairs))
    }
}

fn field(pairs: &HashMap<&'static str, &str>, key: &str) -> String {
    pairs.get(key).map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistParams {
    pub name: String,
}

impl UriParams for ArtistParams {
    const ROUTE: Route = ARTIST_ROUTE;

    fn to_pairs(&self) -> Vec<(&'static str, &str)> {
        vec![("name", self.name.as_str())]
    }

    fn from_pairs(pairs: &HashMap<&'static str, &str>) -> Self {
        Self {
            name: field(pairs, "name"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumParams {
    pub artist: String,
    pub name: String,
}

impl UriParams for AlbumParams {
    const ROUTE: Route = ALBUM_ROUTE;

    fn to_pairs(&self) -> Vec<(&'static str, &str)> {
        vec![("artist", self.artist.as_str()), ("name", self.name.as_str())]
    }

    fn from_pairs(pairs: &HashMap<&'static str, &str>) -> Self {
        Self {
            artist: field(pairs, "artist"),
            name: field(pairs, "name"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackParams {
    pub artist: String,
    pub album: String,
    pub number: String,
    pub name: String,
}

impl UriParams for TrackParams {
    const ROUTE: Route = TRACK_ROUTE;

    fn to_pairs(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("artist", self.artist.as_str()),
            ("album", self.album.as_str()),
            ("number", self.number.as_str()),
            ("name", self.name.as_str()),
        ]
    }

    fn from_pairs(pairs: &HashMap<&'static str, &str>) -> Self {
        Self {
            artist: field(pairs, "artist"),
            album: field(pairs, "album"),
            number: field(pairs, "number"),
            name: field(pairs, "name"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileParams {
    pub artist: String,
    pub album: String,
    pub number: String,
    pub track: String,
    pub bitrate: String,
    pub hash: String,
}

impl UriParams for FileParams {
    const ROUTE: Route = FILE_ROUTE;

    fn to_pairs(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("artist", self.artist.as_str()),
            ("album", self.album.as_str()),
            ("number", self.number.as_str()),
            ("track", self.track.as_str()),
            ("bitrate", self.bitrate.as_str()),
            ("hash", self.hash.as_str()),
        ]
    }

    fn from_pairs(pairs: &HashMap<&'static str, &str>) -> Self {
        Self {
            artist: field(pairs, "artist"),
            album: field(pairs, "album"),
            number: field(pairs, "number"),
            track: field(pairs, "track"),
            bitrate: field(pairs, "bitrate"),
            hash: field(pairs, "hash"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerParams {
    #[serde(rename = "type")]
    pub tracker_type: String,
    pub name: String,
}

impl UriParams for TrackerParams {
    const ROUTE: Route = TRACKER_ROUTE;

    fn to_pairs(&self) -> Vec<(&'static str, &str)> {
        vec![("type", self.tracker_type.as_str()), ("name", self.name.as_str())]
    }

    fn from_pairs(pairs: &HashMap<&'static str, &str>) -> Self {
        Self {
            tracker_type: field(pairs, "type"),
            name: field(pairs, "name"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryParams {
    pub name: String,
}

impl UriParams for LibraryParams {
    const ROUTE: Route = LIBRARY_ROUTE;

    fn to_pairs(&self) -> Vec<(&'static str, &str)> {
        vec![("name", self.name.as_str())]
    }

    fn from_pairs(pairs: &HashMap<&'static str, &str>) -> Self {
        Self {
            name: field(pairs, "name"),
        }
    }
}

pub fn map_artist_to_params(artist: &Artist) -> ArtistParams {
    ArtistParams {
        name: slugify(&artist.name),
    }
}

/// Params for an album named `name` under the artist URI `artist`
pub fn album_params(artist: &str, name: &str) -> Result<AlbumParams> {
    Ok(AlbumParams {
        name: slugify(name),
        artist: ArtistParams::decode(artist)?.name,
    })
}

pub fn map_album_to_params(album: &Album) -> Result<AlbumParams> {
    album_params(&album.artist, &album.name)
}

pub fn map_track_to_params(track: &Track) -> Result<TrackParams> {
    Ok(TrackParams {
        name: slugify(&track.name),
        artist: ArtistParams::decode(&track.artist)?.name,
        album: AlbumParams::decode(&track.album)?.name,
        number: format!("{:02}", track.number),
    })
}

pub fn map_file_to_params(file: &File) -> Result<FileParams> {
    let track = TrackParams::decode(&file.track)?;
    Ok(FileParams {
        artist: ArtistParams::decode(&file.artist)?.name,
        album: AlbumParams::decode(&file.album)?.name,
        track: track.name,
        number: track.number,
        bitrate: bitrate_segment(file.bitrate),
        hash: path_fingerprint(&file.path),
    })
}

pub fn map_tracker_to_params(tracker: &Tracker) -> TrackerParams {
    TrackerParams {
        name: slugify(&tracker.name),
        tracker_type: tracker.tracker_type.clone(),
    }
}

pub fn map_library_to_params(library: &Library) -> LibraryParams {
    LibraryParams {
        name: slugify(&library.name),
    }
}

/// Last four characters of the zero-padded bitrate
fn bitrate_segment(bitrate: u32) -> String {
    let padded = format!("{:04}", bitrate);
    padded[padded.len() - 4..].to_string()
}

/// Hex SHA-1 of the file path with the first 6 characters dropped
///
/// Only disambiguates files of the same track; not a security measure.
fn path_fingerprint(path: &str) -> String {
    let digest = hex::encode(Sha1::digest(path.as_bytes()));
    digest[6..].to_string()
}

/// Any record URI, classified by template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordUri {
    Artist(ArtistParams),
    Album(AlbumParams),
    Track(TrackParams),
    File(FileParams),
    Tracker(TrackerParams),
    Library(LibraryParams),
}

impl RecordUri {
    pub fn parse(uri: &str) -> Result<Self> {
        let prefix = uri.split('/').next().unwrap_or_default();
        match prefix {
            "config" => Ok(RecordUri::Library(LibraryParams::decode(uri)?)),
            "trackers" => Ok(RecordUri::Tracker(TrackerParams::decode(uri)?)),
            "library" => {
                let segments = uri.split('/').count();
                if segments == ARTIST_ROUTE.segment_count() {
                    Ok(RecordUri::Artist(ArtistParams::decode(uri)?))
                } else if segments == ALBUM_ROUTE.segment_count() {
                    Ok(RecordUri::Album(AlbumParams::decode(uri)?))
                } else if segments == TRACK_ROUTE.segment_count() {
                    Ok(RecordUri::Track(TrackParams::decode(uri)?))
                } else if segments == FILE_ROUTE.segment_count() {
                    Ok(RecordUri::File(FileParams::decode(uri)?))
                } else {
                    Err(Error::malformed(
                        uri,
                        format!("no library route has {} segments", segments),
                    ))
                }
            }
            other => Err(Error::malformed(uri, format!("unknown prefix `{}`", other))),
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            RecordUri::Artist(_) => RecordKind::Artist,
            RecordUri::Album(_) => RecordKind::Album,
            RecordUri::Track(_) => RecordKind::Track,
            RecordUri::File(_) => RecordKind::File,
            RecordUri::Tracker(_) => RecordKind::Tracker,
            RecordUri::Library(_) => RecordKind::Library,
        }
    }

    pub fn encode(&self) -> Result<String> {
        match self {
            RecordUri::Artist(p) => p.encode(),
            RecordUri::Album(p) => p.encode(),
            RecordUri::Track(p) => p.encode(),
            RecordUri::File(p) => p.encode(),
            RecordUri::Tracker(p) => p.encode(),
            RecordUri::Library(p) => p.encode(),
        }
    }

    /// Derive the URI of a record given as a JSON document of `kind`
    pub fn from_document(kind: RecordKind, doc: serde_json::Value) -> Result<Self> {
        Ok(match kind {
            RecordKind::Artist => {
                RecordUri::Artist(map_artist_to_params(&serde_json::from_value(doc)?))
            }
            RecordKind::Album => {
                RecordUri::Album(map_album_to_params(&serde_json::from_value(doc)?)?)
            }
            RecordKind::Track => {
                RecordUri::Track(map_track_to_params(&serde_json::from_value(doc)?)?)
            }
            RecordKind::File => RecordUri::File(map_file_to_params(&serde_json::from_value(doc)?)?),
            RecordKind::Tracker => {
                RecordUri::Tracker(map_tracker_to_params(&serde_json::from_value(doc)?))
            }
            RecordKind::Library => {
                RecordUri::Library(map_library_to_params(&serde_json::from_value(doc)?))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artist(name: &str) -> Artist {
        Artist {
            id: String::new(),
            name: name.to_string(),
            bio: None,
            cover: None,
        }
    }

    fn track(number: u32) -> Track {
        Track {
            id: String::new(),
            name: "Let Down".to_string(),
            artist: "library/radiohead".to_string(),
            album: "library/radiohead/ok-computer".to_string(),
            number,
            duration: None,
            hidden: false,
        }
    }

    #[test]
    fn test_artist_roundtrip_normalizes_name() {
        let params = map_artist_to_params(&artist("Radiohead"));
        let uri = params.encode().unwrap();
        assert_eq!(uri, "library/radiohead");
        assert_eq!(ArtistParams::decode(&uri).unwrap(), params);
    }

    #[test]
    fn test_album_uri_uses_parent_slug() {
        let uri = album_params("library/radiohead", "OK Computer")
            .and_then(|p| p.encode())
            .unwrap();
        assert_eq!(uri, "library/radiohead/ok-computer");
    }

    #[test]
    fn test_track_number_padding() {
        assert_eq!(map_track_to_params(&track(3)).unwrap().number, "03");
        assert_eq!(map_track_to_params(&track(12)).unwrap().number, "12");
        let uri = map_track_to_params(&track(3)).unwrap().encode().unwrap();
        assert_eq!(uri, "library/radiohead/ok-computer/03/let-down");
    }

    #[test]
    fn test_file_params() {
        let file = File {
            id: String::new(),
            path: "/music/Radiohead/OK Computer/03 Let Down.flac".to_string(),
            artist: "library/radiohead".to_string(),
            album: "library/radiohead/ok-computer".to_string(),
            track: "library/radiohead/ok-computer/03/let-down".to_string(),
            bitrate: 128,
            duration: None,
            mtime: None,
        };
        let params = map_file_to_params(&file).unwrap();
        assert_eq!(params.bitrate, "0128");
        assert_eq!(params.number, "03");
        assert_eq!(params.track, "let-down");
        assert_eq!(params.hash.len(), 34);
        assert!(params.hash.chars().all(|c| c.is_ascii_hexdigit()));

        let again = map_file_to_params(&file).unwrap();
        assert_eq!(params.hash, again.hash);

        let uri = params.encode().unwrap();
        assert_eq!(FileParams::decode(&uri).unwrap(), params);
    }

    #[test]
    fn test_bitrate_keeps_last_four_digits() {
        assert_eq!(bitrate_segment(320), "0320");
        assert_eq!(bitrate_segment(1411), "1411");
        assert_eq!(bitrate_segment(12345), "2345");
    }

    #[test]
    fn test_tracker_and_library_routes() {
        let tracker = Tracker {
            id: String::new(),
            name: "My Tracker".to_string(),
            tracker_type: "gazelle".to_string(),
            host: None,
            username: None,
        };
        let uri = map_tracker_to_params(&tracker).encode().unwrap();
        assert_eq!(uri, "trackers/gazelle/my-tracker");

        let library = Library {
            id: String::new(),
            name: "Main Library".to_string(),
            path: "/music".to_string(),
        };
        let uri = map_library_to_params(&library).encode().unwrap();
        assert_eq!(uri, "config/library/main-library");
        assert_eq!(
            LibraryParams::decode(&uri).unwrap().name,
            "main-library".to_string()
        );
    }

    #[test]
    fn test_every_template_decodes_what_it_encodes() {
        let uris = vec![
            RecordUri::Artist(ArtistParams {
                name: "radiohead".to_string(),
            }),
            RecordUri::Album(AlbumParams {
                artist: "radiohead".to_string(),
                name: "ok-computer".to_string(),
            }),
            RecordUri::Track(TrackParams {
                artist: "radiohead".to_string(),
                album: "ok-computer".to_string(),
                number: "03".to_string(),
                name: "let-down".to_string(),
            }),
            RecordUri::File(FileParams {
                artist: "radiohead".to_string(),
                album: "ok-computer".to_string(),
                number: "03".to_string(),
                track: "let-down".to_string(),
                bitrate: "0320".to_string(),
                hash: path_fingerprint("/music/Radiohead/OK Computer/03 Let Down.flac"),
            }),
            RecordUri::Tracker(TrackerParams {
                tracker_type: "gazelle".to_string(),
                name: "my-tracker".to_string(),
            }),
            RecordUri::Library(LibraryParams {
                name: "main-library".to_string(),
            }),
        ];

        for uri in uris {
            let encoded = uri.encode().unwrap();
            assert_eq!(RecordUri::parse(&encoded).unwrap(), uri, "{}", encoded);
        }
    }

    #[test]
    fn test_decode_rejects_segment_count() {
        let err = AlbumParams::decode("library/radiohead").unwrap_err();
        assert!(matches!(err, Error::MalformedUri { .. }));
    }

    #[test]
    fn test_decode_rejects_prefix() {
        let err = TrackerParams::decode("library/gazelle/what").unwrap_err();
        assert!(matches!(err, Error::MalformedUri { .. }));
    }

    #[test]
    fn test_encode_rejects_empty_slug() {
        let params = map_artist_to_params(&artist("???"));
        assert!(matches!(params.encode(), Err(Error::MalformedUri { .. })));
    }

    #[test]
    fn test_album_with_unencodable_artist_fails() {
        let album = Album {
            id: String::new(),
            name: "Untitled".to_string(),
            artist: "library/".to_string(),
            year: None,
            cover: None,
        };
        assert!(matches!(
            map_album_to_params(&album),
            Err(Error::MalformedUri { .. })
        ));
    }

    #[test]
    fn test_track_with_bad_album_fails() {
        let mut track = track(1);
        track.album = "library/radiohead".to_string();
        assert!(matches!(
            map_track_to_params(&track),
            Err(Error::MalformedUri { .. })
        ));
    }

    #[test]
    fn test_record_uri_classifies() {
        assert_eq!(
            RecordUri::parse("library/radiohead").unwrap().kind(),
            RecordKind::Artist
        );
        assert_eq!(
            RecordUri::parse("library/radiohead/ok-computer/03/let-down")
                .unwrap()
                .kind(),
            RecordKind::Track
        );
        assert_eq!(
            RecordUri::parse("trackers/gazelle/what").unwrap().kind(),
            RecordKind::Tracker
        );
        assert!(RecordUri::parse("library/a/b/c").is_err());
        assert!(RecordUri::parse("playlists/x").is_err());
    }

    #[test]
    fn test_record_uri_from_document() {
        let doc = serde_json::json!({
            "_id": "",
            "name": "In Rainbows",
            "artist": "library/radiohead"
        });
        let uri = RecordUri::from_document(RecordKind::Album, doc).unwrap();
        assert_eq!(uri.encode().unwrap(), "library/radiohead/in-rainbows");
    }
}
