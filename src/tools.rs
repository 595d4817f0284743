//! Agent-facing database tools.
//!
//! These are the bindings an agent calls to keep state across the steps of
//! a plan: `database_save`, `database_get` and `database_query`. Each takes
//! plain JSON and always answers with a JSON-shaped outcome carrying a
//! `success` flag; failures are reported in `error` instead of being raised.
//!
//! ```rust
//! use docstore::config::StoreConfig;
//! use docstore::storage::Storage;
//! use docstore::tools::{database_query, database_save, QueryArgs};
//! use serde_json::json;
//!
//! # async fn example() {
//! let storage = Storage::in_memory(StoreConfig::default()).unwrap();
//! let saved = database_save(&storage, "results", json!({"metric": "fom", "value": 12.5})).await;
//! assert!(saved.success);
//!
//! let args = QueryArgs { key: Some("metric".into()), value: Some(json!("fom")), limit: None };
//! let found = database_query(&storage, "results", &args).await;
//! assert_eq!(found.count, 1);
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::document::{Datum, Document, DocumentId, Payload};
use crate::error::{Error, Result};
use crate::storage::{Predicate, SaveResult, Storage};

/// Result of `database_save`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub success: bool,
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SaveOutcome {
    pub fn from_result(table: &str, result: Result<SaveResult>) -> Self {
        match result {
            Ok(saved) => {
                let message = if saved.created {
                    format!("Successfully saved new record to table '{}'.", table)
                } else {
                    format!("Updated existing record {} in table '{}'.", saved.id, table)
                };
                Self {
                    success: true,
                    id: Some(saved.id.as_u64()),
                    created: Some(saved.created),
                    message: Some(message),
                    error: None,
                }
            }
            Err(e) => Self {
                success: false,
                id: None,
                created: None,
                message: None,
                error: Some(format!("Database save error: {}", e)),
            },
        }
    }
}

/// Result of `database_get`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetOutcome {
    pub success: bool,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GetOutcome {
    pub fn from_result(record_id: u64, result: Result<Option<Document>>) -> Self {
        match result {
            Ok(Some(doc)) => Self {
                success: true,
                found: true,
                document: Some(doc.to_json()),
                error: None,
            },
            Ok(None) => Self {
                success: false,
                found: false,
                document: None,
                error: Some(format!("Record {} not found.", record_id)),
            },
            Err(e) => Self {
                success: false,
                found: false,
                document: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Result of `database_query`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub success: bool,
    pub documents: Vec<serde_json::Value>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryOutcome {
    pub fn from_result(result: Result<Vec<Document>>) -> Self {
        match result {
            Ok(docs) => {
                let documents: Vec<serde_json::Value> = docs.iter().map(Document::to_json).collect();
                Self {
                    success: true,
                    count: documents.len(),
                    documents,
                    error: None,
                }
            }
            Err(e) => Self {
                success: false,
                documents: Vec::new(),
                count: 0,
                error: Some(format!("Database query failed: {}", e)),
            },
        }
    }
}

/// Arguments of `database_query`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryArgs {
    /// Top-level payload key to filter on
    #[serde(default)]
    pub key: Option<String>,
    /// Value the key must match, compared as text
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Maximum number of documents; the store default when absent
    #[serde(default)]
    pub limit: Option<i64>,
}

impl QueryArgs {
    /// The filter, applied only when both a non-empty key and a non-null
    /// value are given.
    pub fn predicate(&self) -> Option<Predicate> {
        let key = self.key.as_deref().filter(|k| !k.is_empty())?;
        let value = self.value.as_ref().filter(|v| !v.is_null())?;
        Some(Predicate::new(key, Datum::from(value.clone())))
    }

    /// The requested limit; zero and negative values are rejected.
    pub fn limit(&self) -> Result<Option<usize>> {
        match self.limit {
            None => Ok(None),
            Some(n) if n <= 0 => Err(Error::InvalidArgument(format!(
                "limit must be a positive integer, got {}",
                n
            ))),
            Some(n) => Ok(Some(usize::try_from(n).unwrap_or(usize::MAX))),
        }
    }
}

/// Converts a JSON object into a payload.
pub fn payload_from_json(data: serde_json::Value) -> Result<Payload> {
    match Datum::from(data) {
        Datum::Object(payload) => Ok(payload),
        other => Err(Error::InvalidPayload(format!(
            "data must be a JSON object, got {}",
            other
        ))),
    }
}

fn log_failure(op: &str, table: &str, err: &Error) {
    if err.is_invalid_argument() {
        warn!(op = op, table = %table, error = %err, "Rejected database request");
    } else {
        error!(op = op, table = %table, error = %err, "Database request failed");
    }
}

/// Saves `data` into `table`, upserting when `data.id` names an existing
/// record of that table.
pub async fn save(storage: &Storage, table: &str, data: serde_json::Value) -> Result<SaveResult> {
    let payload = payload_from_json(data)?;
    let result = storage.save(table, payload).await;
    if let Err(e) = &result {
        log_failure("save", table, e);
    }
    result
}

/// Fetches one record of `table` by id.
pub async fn get(storage: &Storage, table: &str, record_id: u64) -> Result<Option<Document>> {
    let result = storage.get(table, DocumentId::new(record_id)).await;
    if let Err(e) = &result {
        log_failure("get", table, e);
    }
    result
}

/// Searches `table`, newest first.
pub async fn query(storage: &Storage, table: &str, args: &QueryArgs) -> Result<Vec<Document>> {
    let result = match args.limit() {
        Ok(limit) => storage.query(table, args.predicate(), limit).await,
        Err(e) => Err(e),
    };
    if let Err(e) = &result {
        log_failure("query", table, e);
    }
    result
}

/// Saves a JSON document to a table (namespace).
///
/// Use it to remember information across the steps of a plan or to cache
/// expensive results. When `data` has an `id` matching an existing record
/// in the same table, that record is updated; otherwise a new record is
/// created and its `id` is assigned by the store.
pub async fn database_save(storage: &Storage, table: &str, data: serde_json::Value) -> SaveOutcome {
    SaveOutcome::from_result(table, save(storage, table, data).await)
}

/// Retrieves a single record by its id from a table.
pub async fn database_get(storage: &Storage, table: &str, record_id: u64) -> GetOutcome {
    GetOutcome::from_result(record_id, get(storage, table, record_id).await)
}

/// Searches a table, optionally filtering by one key/value pair.
///
/// Without a key the most recent records are returned.
pub async fn database_query(storage: &Storage, table: &str, args: &QueryArgs) -> QueryOutcome {
    QueryOutcome::from_result(query(storage, table, args).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use serde_json::json;

    fn storage() -> Storage {
        Storage::in_memory(StoreConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_save_then_update_messages() {
        let storage = storage();

        let created = database_save(&storage, "results", json!({"status": "ok"})).await;
        assert!(created.success);
        assert_eq!(created.id, Some(1));
        assert_eq!(created.created, Some(true));
        assert_eq!(
            created.message.as_deref(),
            Some("Successfully saved new record to table 'results'.")
        );

        let updated = database_save(&storage, "results", json!({"id": 1, "status": "fail"})).await;
        assert_eq!(updated.id, Some(1));
        assert_eq!(updated.created, Some(false));
        assert_eq!(
            updated.message.as_deref(),
            Some("Updated existing record 1 in table 'results'.")
        );
    }

    #[tokio::test]
    async fn test_save_rejects_non_object_and_empty_table() {
        let storage = storage();

        let outcome = database_save(&storage, "results", json!([1, 2, 3])).await;
        assert!(!outcome.success);
        assert_eq!(outcome.id, None);
        assert!(outcome.error.unwrap().starts_with("Database save error:"));

        let outcome = database_save(&storage, "", json!({"a": 1})).await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_get_found_and_missing() {
        let storage = storage();
        database_save(&storage, "results", json!({"status": "ok"})).await;

        let found = database_get(&storage, "results", 1).await;
        assert!(found.success && found.found);
        assert_eq!(found.document, Some(json!({"id": 1, "status": "ok"})));

        let missing = database_get(&storage, "results", 2).await;
        assert!(!missing.found);
        assert_eq!(missing.error.as_deref(), Some("Record 2 not found."));

        let other_table = database_get(&storage, "metadata", 1).await;
        assert!(!other_table.found);
    }

    #[tokio::test]
    async fn test_query_filters_textually() {
        let storage = storage();
        database_save(&storage, "results", json!({"status": "ok", "nodes": 4})).await;
        database_save(&storage, "results", json!({"status": "fail", "nodes": 8})).await;

        let args = QueryArgs {
            key: Some("status".into()),
            value: Some(json!("ok")),
            limit: None,
        };
        let outcome = database_query(&storage, "results", &args).await;
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.documents[0]["status"], json!("ok"));

        let args = QueryArgs {
            key: Some("nodes".into()),
            value: Some(json!("8")),
            limit: None,
        };
        let outcome = database_query(&storage, "results", &args).await;
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.documents[0]["id"], json!(2));
    }

    #[tokio::test]
    async fn test_integers_beyond_i64_are_kept_exactly() {
        let storage = storage();
        let digest = u64::MAX;
        database_save(&storage, "hashes", json!({"digest": digest})).await;
        database_save(&storage, "hashes", json!({"digest": 1})).await;

        let found = database_get(&storage, "hashes", 1).await;
        assert_eq!(found.document, Some(json!({"id": 1, "digest": digest})));

        let args = QueryArgs {
            key: Some("digest".into()),
            value: Some(json!("18446744073709551615")),
            limit: None,
        };
        let outcome = database_query(&storage, "hashes", &args).await;
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.documents[0]["digest"], json!(digest));
    }

    #[tokio::test]
    async fn test_query_without_value_is_unfiltered() {
        let storage = storage();
        database_save(&storage, "results", json!({"status": "ok"})).await;
        database_save(&storage, "results", json!({"status": "fail"})).await;

        let args = QueryArgs {
            key: Some("status".into()),
            value: Some(serde_json::Value::Null),
            limit: None,
        };
        let outcome = database_query(&storage, "results", &args).await;
        assert_eq!(outcome.count, 2);
        assert_eq!(outcome.documents[0]["id"], json!(2));
    }

    #[tokio::test]
    async fn test_query_rejects_non_positive_limit() {
        let storage = storage();
        for limit in [0, -3] {
            let args = QueryArgs {
                limit: Some(limit),
                ..QueryArgs::default()
            };
            let outcome = database_query(&storage, "results", &args).await;
            assert!(!outcome.success);
            assert_eq!(outcome.count, 0);
            assert!(outcome.error.unwrap().contains("limit"));
        }
    }
}
