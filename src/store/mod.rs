//! Replicated document store boundary
//!
//! The catalog only needs a narrow contract from the database: fetch one
//! document, write one document, list documents under an id prefix, and a
//! stream of changes.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::Result;

pub mod couch;
pub mod memory;

pub use couch::CouchStore;
pub use memory::MemoryStore;

/// Capacity of the change broadcast channel
pub(crate) const CHANGE_CAPACITY: usize = 256;

/// A document written to the store
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub collection: String,
    pub id: String,
    /// New document body, `None` when the document was deleted
    pub doc: Option<Value>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id, `None` if it does not exist
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Create or replace a document; the id is read from its `_id` field
    async fn put(&self, collection: &str, doc: Value) -> Result<()>;

    /// All documents whose id starts with `prefix`, ordered by id
    async fn all_docs(&self, collection: &str, prefix: &str) -> Result<Vec<Value>>;

    /// Subscribe to changes, in the order the store applies them
    fn changes(&self) -> broadcast::Receiver<Change>;
}

/// Read the `_id` of a document
pub(crate) fn document_id(doc: &Value) -> Option<&str> {
    doc.get("_id").and_then(Value::as_str)
}
