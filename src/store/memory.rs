//! In-process document store

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use super::{CHANGE_CAPACITY, Change, DocumentStore, document_id};
use crate::error::{Error, Result};

/// Document store kept in memory, one ordered map per collection
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
    changes: broadcast::Sender<Change>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            collections: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Remove a document, notifying subscribers
    pub fn remove(&self, collection: &str, id: &str) -> Result<bool> {
        let removed = {
            let mut collections = self
                .collections
                .write()
                .map_err(|_| Error::Store("memory store poisoned".to_string()))?;
            collections
                .get_mut(collection)
                .and_then(|docs| docs.remove(id))
                .is_some()
        };
        if removed {
            let _ = self.changes.send(Change {
                collection: collection.to_string(),
                id: id.to_string(),
                doc: None,
            });
        }
        Ok(removed)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| Error::Store("memory store poisoned".to_string()))?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn put(&self, collection: &str, doc: Value) -> Result<()> {
        let id = document_id(&doc)
            .ok_or_else(|| Error::Store("document has no _id".to_string()))?
            .to_string();

        {
            let mut collections = self
                .collections
                .write()
                .map_err(|_| Error::Store("memory store poisoned".to_string()))?;
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), doc.clone());
        }

        debug!("Stored {}/{}", collection, id);
        // No receivers is not an error
        let _ = self.changes.send(Change {
            collection: collection.to_string(),
            id,
            doc: Some(doc),
        });
        Ok(())
    }

    async fn all_docs(&self, collection: &str, prefix: &str) -> Result<Vec<Value>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| Error::Store("memory store poisoned".to_string()))?;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .range(prefix.to_string()..)
            .take_while(|(id, _)| id.starts_with(prefix))
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    fn changes(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new();
        store
            .put("artists", json!({"_id": "library/muse", "name": "Muse"}))
            .await
            .unwrap();

        let doc = store.get("artists", "library/muse").await.unwrap().unwrap();
        assert_eq!(doc["name"], "Muse");
        assert!(store.get("artists", "library/blur").await.unwrap().is_none());
        assert!(store.get("albums", "library/muse").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_requires_id() {
        let store = MemoryStore::new();
        let err = store.put("artists", json!({"name": "Muse"})).await;
        assert!(matches!(err, Err(Error::Store(_))));
    }

    #[tokio::test]
    async fn test_all_docs_by_prefix() {
        let store = MemoryStore::new();
        for id in [
            "library/muse/absolution",
            "library/muse/origin-of-symmetry",
            "library/muse-tribute/covers",
            "library/radiohead/ok-computer",
        ] {
            store.put("albums", json!({"_id": id})).await.unwrap();
        }

        let docs = store.all_docs("albums", "library/muse/").await.unwrap();
        let ids: Vec<_> = docs.iter().filter_map(document_id).collect();
        assert_eq!(
            ids,
            vec!["library/muse/absolution", "library/muse/origin-of-symmetry"]
        );
        assert!(store.all_docs("tracks", "library/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_changes_in_apply_order() {
        let store = MemoryStore::new();
        let mut rx = store.changes();

        store
            .put("artists", json!({"_id": "library/muse", "name": "Muse"}))
            .await
            .unwrap();
        store
            .put("artists", json!({"_id": "library/muse", "name": "MUSE"}))
            .await
            .unwrap();
        store.remove("artists", "library/muse").unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        let third = rx.recv().await.unwrap();
        assert_eq!(first.doc.unwrap()["name"], "Muse");
        assert_eq!(second.doc.unwrap()["name"], "MUSE");
        assert_eq!(third.doc, None);
    }
}
