//! Last.fm web service client

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use super::images::{SizedImage, select_largest_image};
use super::{CandidateSource, MetadataSource};
use crate::error::{Error, Result};
use crate::models::{DsAlbum, DsArtist, DsRecord, DsTrack, RecordKind};

pub const API_ROOT: &str = "http://ws.audioscrobbler.com/2.0/";

/// Error code Last.fm uses for unknown artists and albums
const NOT_FOUND_CODE: i64 = 6;

#[derive(Clone)]
pub struct LastfmDataSource {
    api_key: String,
    api_root: String,
    http_client: Client,
}

#[derive(Debug, Deserialize)]
struct SearchMatch {
    name: String,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    image: Vec<SizedImage>,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TopAlbum {
    name: String,
    artist: NamedRef,
    #[serde(default)]
    image: Vec<SizedImage>,
}

#[derive(Debug, Deserialize)]
struct ArtistInfo {
    name: String,
    #[serde(default)]
    image: Vec<SizedImage>,
    #[serde(default)]
    bio: Option<Bio>,
}

#[derive(Debug, Deserialize)]
struct Bio {
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlbumInfo {
    name: String,
    artist: String,
    #[serde(default)]
    image: Vec<SizedImage>,
    #[serde(default)]
    tracks: Option<AlbumTracks>,
}

#[derive(Debug, Deserialize)]
struct AlbumTracks {
    track: OneOrMany<TrackInfo>,
}

#[derive(Debug, Deserialize)]
struct TrackInfo {
    name: String,
    #[serde(default)]
    duration: Value,
    artist: NamedRef,
    #[serde(rename = "@attr", default)]
    attr: Option<TrackAttr>,
}

#[derive(Debug, Deserialize)]
struct TrackAttr {
    #[serde(default)]
    rank: Value,
}

/// Single-element lists come back as a bare object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

impl LastfmDataSource {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_api_root(api_key, API_ROOT)
    }

    pub fn with_api_root(api_key: &str, api_root: &str) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("compactd/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            api_key: api_key.to_string(),
            api_root: api_root.to_string(),
            http_client,
        })
    }

    fn method_url(&self, method: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&self.api_root)
            .map_err(|e| Error::Provider {
                code: 0,
                message: format!("invalid API root {}: {}", self.api_root, e),
            })?;
        url.query_pairs_mut()
            .append_pair("method", method)
            .append_pair("api_key", &self.api_key)
            .append_pair("format", "json")
            .extend_pairs(params);
        Ok(url)
    }

    async fn call(&self, method: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = self.method_url(method, params)?;
        debug!("GET {}", url.as_str().replace(&self.api_key, "***"));

        let body: Value = self
            .http_client
            .get(url)
            .send()
            .await?
            .json()
            .await?;
        check_error(&body)?;
        Ok(body)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Bytes> {
        Ok(self
            .http_client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?)
    }

    async fn largest_image(&self, images: &[SizedImage]) -> Option<Bytes> {
        select_largest_image(images, |url| async move { self.fetch_bytes(&url).await }).await
    }

    async fn search_kind(&self, query: &str, kind: RecordKind) -> Result<Vec<DsRecord>> {
        let method = format!("{}.search", kind.as_str());
        let body = self.call(&method, &[(kind.as_str(), query)]).await?;
        parse_search(kind, &body)
    }
}

fn check_error(body: &Value) -> Result<()> {
    let Some(code) = body.get("error").and_then(Value::as_i64) else {
        return Ok(());
    };
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    if code == NOT_FOUND_CODE {
        return Err(Error::NotFound(message));
    }
    Err(Error::Provider { code, message })
}

/// Unknown artists and albums have no artwork rather than failing
fn unless_unknown<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::NotFound(what)) => {
            debug!("No artwork, {} not found", what);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn field<T: DeserializeOwned>(body: &Value, pointer: &str) -> Result<T> {
    let value = body
        .pointer(pointer)
        .ok_or_else(|| Error::NotFound(pointer.trim_start_matches('/').replace('/', ".")))?;
    Ok(T::deserialize(value)?)
}

/// The medium-sized entry, used as thumbnail
fn cover(images: &[SizedImage], size: &str) -> Option<String> {
    images
        .iter()
        .find(|i| i.size == size && !i.url.is_empty())
        .map(|i| i.url.clone())
}

/// Numbers arrive either as JSON numbers or as strings
fn loose_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_search(kind: RecordKind, body: &Value) -> Result<Vec<DsRecord>> {
    let pointer = format!("/results/{0}matches/{0}", kind.as_str());
    let matches: OneOrMany<SearchMatch> = field(body, &pointer)?;

    Ok(matches
        .into_vec()
        .into_iter()
        .map(|m| {
            let thumb = cover(&m.image, "medium");
            let artist = m.artist.unwrap_or_default();
            match kind {
                RecordKind::Album => DsRecord::Album(DsAlbum {
                    id: format!("{}/{}", artist, m.name),
                    name: m.name,
                    artist,
                    cover: thumb,
                    ..Default::default()
                }),
                RecordKind::Track => DsRecord::Track(DsTrack {
                    id: m.name.clone(),
                    name: m.name,
                    artist,
                    ..Default::default()
                }),
                _ => DsRecord::Artist(DsArtist {
                    id: m.name.clone(),
                    name: m.name,
                    cover: thumb,
                    ..Default::default()
                }),
            }
        })
        .collect())
}

fn parse_top_albums(body: &Value) -> Result<Vec<DsAlbum>> {
    let albums: OneOrMany<TopAlbum> = field(body, "/topalbums/album")?;
    Ok(albums
        .into_vec()
        .into_iter()
        .map(|a| DsAlbum {
            id: format!("{}/{}", a.artist.name, a.name),
            cover: cover(&a.image, "medium"),
            name: a.name,
            artist: a.artist.name,
            ..Default::default()
        })
        .collect())
}

fn parse_artist(body: &Value) -> Result<(DsArtist, Vec<SizedImage>)> {
    let info: ArtistInfo = field(body, "/artist")?;
    let artist = DsArtist {
        id: info.name.clone(),
        name: info.name,
        cover: cover(&info.image, "medium"),
        large_cover: cover(&info.image, "mega"),
        bio: info.bio.and_then(|b| b.summary),
        top_albums: Vec::new(),
    };
    Ok((artist, info.image))
}

fn parse_album(body: &Value) -> Result<(DsAlbum, Vec<SizedImage>)> {
    let info: AlbumInfo = field(body, "/album")?;
    let tracks = info
        .tracks
        .map(|t| t.track.into_vec())
        .unwrap_or_default()
        .into_iter()
        .map(|t| DsTrack {
            id: format!("{}/{}", t.artist.name, t.name),
            duration: loose_u32(&t.duration),
            number: t.attr.as_ref().and_then(|a| loose_u32(&a.rank)),
            name: t.name,
            artist: t.artist.name,
        })
        .collect();

    let album = DsAlbum {
        id: format!("{}/{}", info.artist, info.name),
        cover: cover(&info.image, "medium"),
        large_cover: cover(&info.image, "mega"),
        name: info.name,
        artist: info.artist,
        tracks,
    };
    Ok((album, info.image))
}

#[async_trait]
impl CandidateSource for LastfmDataSource {
    async fn artist_top_albums(&self, artist: &str) -> Result<Vec<DsAlbum>> {
        let body = self
            .call("artist.gettopalbums", &[("artist", artist)])
            .await?;
        let albums = parse_top_albums(&body)?;
        debug!("{} top albums for {}", albums.len(), artist);
        Ok(albums)
    }
}

#[async_trait]
impl MetadataSource for LastfmDataSource {
    async fn search(&self, query: &str, kinds: &[RecordKind]) -> Result<Vec<DsRecord>> {
        if let Some(kind) = kinds.iter().find(|k| !k.is_searchable()) {
            return Err(Error::UnsupportedSearchType(kind.as_str().to_string()));
        }
        info!("Searching '{}'", query);

        let results = join_all(kinds.iter().map(|kind| self.search_kind(query, *kind))).await;
        let mut records = Vec::new();
        for result in results {
            records.extend(result?);
        }
        Ok(records)
    }

    async fn artist_by_id(&self, id: &str) -> Result<DsArtist> {
        info!("Fetching artist '{}'", id);
        let body = self.call("artist.getinfo", &[("artist", id)]).await?;
        let (mut artist, _) = parse_artist(&body)?;
        artist.top_albums = self.artist_top_albums(id).await?;
        Ok(artist)
    }

    async fn album_by_id(&self, id: &str) -> Result<DsAlbum> {
        info!("Fetching album '{}'", id);
        let (artist, album) = id
            .split_once('/')
            .ok_or_else(|| Error::NotFound(format!("album {}", id)))?;
        let body = self
            .call("album.getinfo", &[("artist", artist), ("album", album)])
            .await?;
        Ok(parse_album(&body)?.0)
    }

    async fn artist_artwork(&self, artist: &str) -> Result<Option<Bytes>> {
        let images = self
            .call("artist.getinfo", &[("artist", artist)])
            .await
            .and_then(|body| parse_artist(&body));
        match unless_unknown(images)? {
            Some((_, images)) => Ok(self.largest_image(&images).await),
            None => Ok(None),
        }
    }

    async fn album_cover(&self, artist: &str, album: &str) -> Result<Option<Bytes>> {
        let images = self
            .call("album.getinfo", &[("artist", artist), ("album", album)])
            .await
            .and_then(|body| parse_album(&body));
        match unless_unknown(images)? {
            Some((_, images)) => Ok(self.largest_image(&images).await),
            None => Ok(None),
        }
    }
}
