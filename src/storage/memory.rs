//! In-memory document engine
//!
//! The whole collection sits behind one store-wide `RwLock`:
//!
//! - `save` takes the write lock for its entire read-check-write, so id
//!   allocation, upsert targeting and the insert/update happen atomically.
//!   Two saves aimed at the same `(namespace, id)` can never both miss and
//!   both insert.
//! - `get` and `query` take the read lock, run concurrently with each
//!   other and never see a half-written document.
//!
//! Nothing here performs I/O, so every lock is held for a bounded,
//! in-memory amount of work.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use super::engine::{DocumentEngine, NamespaceInfo, SaveResult, StoreStats};
use super::query::{evaluate, DocumentQuery};
use crate::config::StoreConfig;
use crate::document::{validate_namespace, Datum, Document, DocumentId, Payload, ID_FIELD};
use crate::error::{Error, Result};

#[derive(Debug)]
struct Collection {
    next_id: DocumentId,
    last_write: Option<DateTime<Utc>>,
    documents: HashMap<DocumentId, Document>,
    namespaces: HashMap<String, BTreeSet<DocumentId>>,
}

impl Default for Collection {
    fn default() -> Self {
        Self {
            next_id: DocumentId::FIRST,
            last_write: None,
            documents: HashMap::new(),
            namespaces: HashMap::new(),
        }
    }
}

impl Collection {
    /// Write timestamps strictly increase, even if the wall clock stalls
    /// or steps backwards.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.last_write {
            Some(last) if now <= last => last + Duration::nanoseconds(1),
            _ => now,
        }
    }

    fn find_mut(&mut self, namespace: &str, id: DocumentId) -> Option<&mut Document> {
        self.documents
            .get_mut(&id)
            .filter(|doc| doc.namespace == namespace)
    }
}

/// In-memory document engine
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    collection: Arc<RwLock<Collection>>,
    config: StoreConfig,
}

impl MemoryEngine {
    /// Create an empty engine
    pub fn new(config: StoreConfig) -> Self {
        Self {
            collection: Arc::new(RwLock::new(Collection::default())),
            config,
        }
    }

    /// Get the number of documents stored
    pub fn len(&self) -> usize {
        self.collection.read().documents.len()
    }

    /// Check if the engine holds no documents
    pub fn is_empty(&self) -> bool {
        self.collection.read().documents.is_empty()
    }

    /// Rejects payloads with no JSON rendering or over the size limit.
    fn validate_payload(&self, payload: &Payload) -> Result<()> {
        for (key, value) in payload {
            if let Some(path) = value.find_non_finite() {
                let field = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", key, path)
                };
                return Err(Error::InvalidPayload(format!(
                    "field '{}' holds a non-finite number",
                    field
                )));
            }
        }

        let size = serde_json::to_vec(payload)
            .map_err(|e| Error::InvalidPayload(format!("payload is not serializable: {}", e)))?
            .len();
        if size > self.config.max_payload_bytes {
            return Err(Error::InvalidPayload(format!(
                "payload is {} bytes, limit is {}",
                size, self.config.max_payload_bytes
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentEngine for MemoryEngine {
    async fn save(&self, namespace: &str, mut payload: Payload) -> Result<SaveResult> {
        validate_namespace(namespace)?;
        self.validate_payload(&payload)?;

        let target = payload
            .get(ID_FIELD)
            .and_then(Datum::as_record_id)
            .map(DocumentId::new);

        let mut guard = self.collection.write();
        let collection = &mut *guard;
        let updated_at = collection.next_timestamp();

        if let Some(id) = target {
            if let Some(doc) = collection.find_mut(namespace, id) {
                payload.insert(ID_FIELD.to_string(), Datum::from(id.as_u64()));
                doc.payload = payload;
                doc.updated_at = updated_at;
                collection.last_write = Some(updated_at);
                debug!(namespace = %namespace, id = %id, created = false, "Updated document");
                return Ok(SaveResult { id, created: false });
            }
        }

        let id = collection.next_id;
        let next_id = id.next().ok_or_else(|| {
            warn!(namespace = %namespace, "Document id space exhausted");
            Error::Internal("document id space exhausted".to_string())
        })?;

        if payload.contains_key(ID_FIELD) {
            payload.insert(ID_FIELD.to_string(), Datum::from(id.as_u64()));
        }
        collection.documents.insert(
            id,
            Document {
                id,
                namespace: namespace.to_string(),
                payload,
                updated_at,
            },
        );
        collection
            .namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(id);
        collection.next_id = next_id;
        collection.last_write = Some(updated_at);

        debug!(namespace = %namespace, id = %id, created = true, "Inserted document");
        Ok(SaveResult { id, created: true })
    }

    async fn get(&self, namespace: &str, id: DocumentId) -> Result<Option<Document>> {
        validate_namespace(namespace)?;
        let collection = self.collection.read();
        let found = collection
            .documents
            .get(&id)
            .filter(|doc| doc.namespace == namespace)
            .cloned();
        debug!(namespace = %namespace, id = %id, found = found.is_some(), "Get document");
        Ok(found)
    }

    async fn query(&self, query: &DocumentQuery) -> Result<Vec<Document>> {
        query.validate()?;
        let collection = self.collection.read();
        let results = match collection.namespaces.get(&query.namespace) {
            Some(ids) => evaluate(
                query,
                ids.iter().filter_map(|id| collection.documents.get(id)),
            ),
            None => Vec::new(),
        };
        debug!(
            namespace = %query.namespace,
            filtered = query.predicate.is_some(),
            limit = query.limit,
            returned = results.len(),
            "Query executed"
        );
        Ok(results)
    }

    async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>> {
        let collection = self.collection.read();
        let mut namespaces: Vec<NamespaceInfo> = collection
            .namespaces
            .iter()
            .map(|(name, ids)| NamespaceInfo {
                name: name.clone(),
                doc_count: ids.len() as u64,
                last_updated: ids
                    .iter()
                    .filter_map(|id| collection.documents.get(id))
                    .map(|doc| doc.updated_at)
                    .max(),
            })
            .collect();
        namespaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(namespaces)
    }

    async fn count(&self, namespace: &str) -> Result<u64> {
        let collection = self.collection.read();
        Ok(collection
            .namespaces
            .get(namespace)
            .map(|ids| ids.len() as u64)
            .unwrap_or(0))
    }

    async fn stats(&self) -> Result<StoreStats> {
        let collection = self.collection.read();
        Ok(StoreStats {
            namespaces: collection.namespaces.len() as u64,
            documents: collection.documents.len() as u64,
            next_id: collection.next_id.as_u64(),
        })
    }
}
