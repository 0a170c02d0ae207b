//! In-memory script document store for tooling and tests

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{DocumentStore, LineRecord, ScriptDocument},
};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Document store that keeps every script in process memory.
///
/// Keyed by `(user_id, script_id)`. Reading a document that was never
/// written fails with [`BridgeError::NotFound`].
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<(String, String), ScriptDocument>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document directly.
    pub fn insert(&self, user_id: &str, script_id: &str, document: ScriptDocument) {
        self.documents
            .write()
            .insert((user_id.to_string(), script_id.to_string()), document);
    }

    /// Snapshot of a stored document.
    pub fn snapshot(&self, user_id: &str, script_id: &str) -> Option<ScriptDocument> {
        self.documents
            .read()
            .get(&(user_id.to_string(), script_id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_document(&self, user_id: &str, script_id: &str) -> Result<ScriptDocument> {
        self.snapshot(user_id, script_id).ok_or_else(|| {
            BridgeError::NotFound(format!("script {} for user {}", script_id, user_id))
        })
    }

    async fn put_document(
        &self,
        user_id: &str,
        script_id: &str,
        records: Vec<LineRecord>,
    ) -> Result<()> {
        debug!(user_id, script_id, lines = records.len(), "Writing script document");
        self.insert(user_id, script_id, ScriptDocument::new(records));
        Ok(())
    }
}
