//! CouchDB-compatible document store served by the compactd server
//!
//! Each collection is a database mounted at `{server}/database/{name}`.
//! Changes are followed with `_changes?feed=longpoll` and re-emitted on a
//! broadcast channel.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{CHANGE_CAPACITY, Change, DocumentStore, document_id};
use crate::error::{Error, Result};

/// Server-side timeout of a longpoll request, in milliseconds
const LONGPOLL_TIMEOUT_MS: u64 = 60_000;

/// Pause before polling again after a failed changes request
const WATCH_BACKOFF: Duration = Duration::from_secs(5);

/// HTTP document store
pub struct CouchStore {
    base_url: String,
    token: Option<String>,
    http_client: Client,
    changes: broadcast::Sender<Change>,
}

#[derive(Debug, Deserialize)]
struct AllDocsResponse {
    #[serde(default)]
    rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
struct AllDocsRow {
    doc: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChangesResponse {
    #[serde(default)]
    results: Vec<ChangeRow>,
    last_seq: Value,
}

#[derive(Debug, Deserialize)]
struct ChangeRow {
    id: String,
    #[serde(default)]
    deleted: bool,
    doc: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RevisionOnly {
    #[serde(rename = "_rev")]
    rev: Option<String>,
}

impl CouchStore {
    /// Create a store for the given compactd server
    pub fn new(server_url: &str, token: Option<&str>) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("compactd/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);

        Ok(Self {
            base_url: server_url.trim_end_matches('/').to_string(),
            token: token.map(str::to_string),
            http_client,
            changes,
        })
    }

    fn database_url(&self, collection: &str) -> String {
        format!("{}/database/{}", self.base_url, collection)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.database_url(collection),
            urlencoding::encode(id)
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http_client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Follow the changes feed of each collection on background tasks
    pub fn watch(self: &Arc<Self>, collections: &[&str]) -> Vec<JoinHandle<()>> {
        collections
            .iter()
            .map(|collection| {
                let store = Arc::clone(self);
                let collection = collection.to_string();
                tokio::spawn(async move { store.follow_changes(&collection).await })
            })
            .collect()
    }

    async fn follow_changes(&self, collection: &str) {
        let mut since = "now".to_string();
        loop {
            match self.poll_changes(collection, &since).await {
                Ok(response) => {
                    for row in response.results {
                        let doc = if row.deleted { None } else { row.doc };
                        let _ = self.changes.send(Change {
                            collection: collection.to_string(),
                            id: row.id,
                            doc,
                        });
                    }
                    since = match response.last_seq {
                        Value::String(seq) => seq,
                        other => other.to_string(),
                    };
                }
                Err(e) => {
                    warn!("Changes feed for {} failed: {}", collection, e);
                    tokio::time::sleep(WATCH_BACKOFF).await;
                }
            }
        }
    }

    async fn poll_changes(&self, collection: &str, since: &str) -> Result<ChangesResponse> {
        let url = format!(
            "{}/_changes?feed=longpoll&include_docs=true&timeout={}&since={}",
            self.database_url(collection),
            LONGPOLL_TIMEOUT_MS,
            urlencoding::encode(since)
        );
        debug!("Polling changes: {}", url);

        let response = self
            .request(Method::GET, &url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response)
    }

    async fn current_revision(&self, collection: &str, id: &str) -> Result<Option<String>> {
        let response = self
            .request(Method::GET, &self.document_url(collection, id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let current: RevisionOnly = response.error_for_status()?.json().await?;
        Ok(current.rev)
    }
}

#[async_trait]
impl DocumentStore for CouchStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let url = self.document_url(collection, id);
        debug!("Fetching document: {}", url);

        let response = self.request(Method::GET, &url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.json().await?))
    }

    async fn put(&self, collection: &str, mut doc: Value) -> Result<()> {
        let id = document_id(&doc)
            .ok_or_else(|| Error::Store("document has no _id".to_string()))?
            .to_string();

        if doc.get("_rev").is_none()
            && let Some(rev) = self.current_revision(collection, &id).await?
            && let Some(fields) = doc.as_object_mut()
        {
            fields.insert("_rev".to_string(), Value::String(rev));
        }

        let url = self.document_url(collection, &id);
        debug!("Writing document: {}", url);
        let response = self.request(Method::PUT, &url).json(&doc).send().await?;
        if response.status() == StatusCode::CONFLICT {
            return Err(Error::Store(format!("conflict writing {}/{}", collection, id)));
        }
        response.error_for_status()?;
        Ok(())
    }

    async fn all_docs(&self, collection: &str, prefix: &str) -> Result<Vec<Value>> {
        let start = serde_json::to_string(prefix)?;
        let end = serde_json::to_string(&format!("{}\u{fff0}", prefix))?;
        let url = format!(
            "{}/_all_docs?include_docs=true&startkey={}&endkey={}",
            self.database_url(collection),
            urlencoding::encode(&start),
            urlencoding::encode(&end)
        );
        debug!("Listing documents: {}", url);

        let response: AllDocsResponse = self
            .request(Method::GET, &url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.rows.into_iter().filter_map(|row| row.doc).collect())
    }

    fn changes(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }
}
