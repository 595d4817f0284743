//! Storage engine trait and the shared store handle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::query::{DocumentQuery, Predicate};
use crate::config::StoreConfig;
use crate::document::{Document, DocumentId, Payload};
use crate::error::Result;
use crate::metrics;

/// Outcome of a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResult {
    /// Id of the document actually written
    pub id: DocumentId,
    /// `true` for an insert, `false` for an in-place update
    pub created: bool,
}

/// Namespace metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    pub name: String,
    pub doc_count: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Store-wide counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub namespaces: u64,
    pub documents: u64,
    /// Id the next insert will receive
    pub next_id: u64,
}

/// Document engine trait
///
/// Implementations own the document collection. `save` must run its
/// read-check-write as one atomic step; `get` and `query` must observe a
/// consistent snapshot.
#[async_trait]
pub trait DocumentEngine: Send + Sync {
    /// Upserts `payload` into `namespace`.
    async fn save(&self, namespace: &str, payload: Payload) -> Result<SaveResult>;

    /// Point lookup; `None` when no document with `id` lives in `namespace`.
    async fn get(&self, namespace: &str, id: DocumentId) -> Result<Option<Document>>;

    /// Filtered, recency-ordered, limited scan of one namespace.
    async fn query(&self, query: &DocumentQuery) -> Result<Vec<Document>>;

    /// List all namespaces, sorted by name
    async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>>;

    /// Count documents in a namespace
    async fn count(&self, namespace: &str) -> Result<u64>;

    async fn stats(&self) -> Result<StoreStats>;
}

/// Main store interface
///
/// Built once at startup and shared as `Arc<Storage>` by every consumer.
pub struct Storage {
    engine: Box<dyn DocumentEngine>,
    config: StoreConfig,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("config", &self.config)
            .finish()
    }
}

impl Storage {
    /// Wraps `engine`, rejecting unusable limits with `Error::Config`.
    pub fn new(engine: Box<dyn DocumentEngine>, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { engine, config })
    }

    /// An empty in-memory store.
    pub fn in_memory(config: StoreConfig) -> Result<Self> {
        let engine = super::MemoryEngine::new(config.clone());
        Self::new(Box::new(engine), config)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub async fn save(&self, namespace: &str, payload: Payload) -> Result<SaveResult> {
        let result = self.engine.save(namespace, payload).await;
        let outcome = match &result {
            Ok(saved) if saved.created => "created",
            Ok(_) => "updated",
            Err(_) => "rejected",
        };
        metrics::record_write(outcome);
        result
    }

    pub async fn get(&self, namespace: &str, id: DocumentId) -> Result<Option<Document>> {
        let result = self.engine.get(namespace, id).await;
        let outcome = match &result {
            Ok(Some(_)) => "hit",
            Ok(None) => "miss",
            Err(_) => "error",
        };
        metrics::record_read("get", outcome);
        result
    }

    /// Runs a query, filling in the configured default limit and clamping
    /// to the configured maximum.
    ///
    /// An explicit `Some(0)` limit is rejected as an invalid argument.
    pub async fn query(
        &self,
        namespace: &str,
        predicate: Option<Predicate>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        let limit = limit
            .unwrap_or(self.config.default_query_limit)
            .min(self.config.max_query_limit);
        let mut query = DocumentQuery::new(namespace).with_limit(limit);
        query.predicate = predicate;
        self.execute(&query).await
    }

    /// Runs a fully specified query as-is.
    pub async fn execute(&self, query: &DocumentQuery) -> Result<Vec<Document>> {
        let result = self.engine.query(query).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::record_read("query", outcome);
        result
    }

    pub async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>> {
        self.engine.list_namespaces().await
    }

    pub async fn count(&self, namespace: &str) -> Result<u64> {
        self.engine.count(namespace).await
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        self.engine.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Datum;
    use crate::error::Error;

    fn payload(fields: &[(&str, Datum)]) -> Payload {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_query_uses_configured_default_limit() -> Result<()> {
        let config = StoreConfig {
            default_query_limit: 2,
            ..StoreConfig::default()
        };
        let storage = Storage::in_memory(config)?;
        for i in 0..5 {
            storage.save("runs", payload(&[("n", Datum::from(i))])).await?;
        }

        assert_eq!(storage.query("runs", None, None).await?.len(), 2);
        assert_eq!(storage.query("runs", None, Some(4)).await?.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_query_clamps_to_max_limit() -> Result<()> {
        let config = StoreConfig {
            default_query_limit: 1,
            max_query_limit: 3,
            ..StoreConfig::default()
        };
        let storage = Storage::in_memory(config)?;
        for _ in 0..5 {
            storage.save("runs", Payload::new()).await?;
        }

        assert_eq!(storage.query("runs", None, Some(100)).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_limit_is_invalid_argument() {
        let storage = Storage::in_memory(StoreConfig::default()).unwrap();
        let err = storage.query("runs", None, Some(0)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_unusable_config_is_rejected_at_construction() {
        let zero_max = StoreConfig {
            max_query_limit: 0,
            ..StoreConfig::default()
        };
        let err = Storage::in_memory(zero_max).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!err.is_invalid_argument());

        let zero_payload = StoreConfig {
            max_payload_bytes: 0,
            ..StoreConfig::default()
        };
        assert!(matches!(
            Storage::in_memory(zero_payload).unwrap_err(),
            Error::Config(_)
        ));
    }

    #[tokio::test]
    async fn test_default_query_succeeds_on_validated_store() -> Result<()> {
        let config = StoreConfig {
            default_query_limit: 1,
            max_query_limit: 1,
            ..StoreConfig::default()
        };
        let storage = Storage::in_memory(config)?;
        storage.save("runs", Payload::new()).await?;
        storage.save("runs", Payload::new()).await?;
        assert_eq!(storage.query("runs", None, None).await?.len(), 1);
        Ok(())
    }
}
