//! HTTP API of the compactd server

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CandidateSource;
use crate::error::{Error, Result};
use crate::library::{ArtworkSource, ImageSizing};
use crate::models::DsAlbum;

/// Client for the compactd server, authenticated with a session token
#[derive(Clone)]
pub struct CompactdClient {
    base_url: String,
    token: Option<String>,
    http_client: Client,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtistCandidates {
    #[serde(default)]
    top_albums: Vec<DsAlbum>,
}

impl CompactdClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("compactd/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(str::to_string),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Open a session, keeping the returned token for later requests
    pub async fn login(&mut self, username: &str, password: &str) -> Result<String> {
        let url = self.api_url("sessions");
        debug!("Opening session for {} at {}", username, url);

        let response = self
            .http_client
            .post(&url)
            .json(&Credentials { username, password })
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::Provider {
                code: 401,
                message: "invalid username or password".to_string(),
            });
        }
        let session: SessionResponse = response.error_for_status()?.json().await?;

        self.token = Some(session.token.clone());
        Ok(session.token)
    }

    /// External top albums for an artist, as relayed by the server
    pub async fn artist_candidates(&self, artist: &str) -> Result<Vec<DsAlbum>> {
        let url = self.api_url(&format!("datasource/artists/{}", urlencoding::encode(artist)));
        debug!("Fetching candidates: {}", url);

        let candidates: ArtistCandidates = self
            .authorized(self.http_client.get(&url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(candidates.top_albums)
    }
}

#[async_trait]
impl CandidateSource for CompactdClient {
    async fn artist_top_albums(&self, artist: &str) -> Result<Vec<DsAlbum>> {
        self.artist_candidates(artist).await
    }
}

#[async_trait]
impl ArtworkSource for CompactdClient {
    async fn artwork(&self, id: &str, sizing: ImageSizing) -> Result<Bytes> {
        let url = format!(
            "{}?size={}",
            self.api_url(&format!("artworks/{}", urlencoding::encode(id))),
            sizing.as_str()
        );
        debug!("Fetching artwork: {}", url);

        let response = self.authorized(self.http_client.get(&url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("artwork for {}", id)));
        }
        Ok(response.error_for_status()?.bytes().await?)
    }
}
