//! Stored documents and their identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::datum::{Datum, Payload};
use crate::error::{Error, Result};

/// Payload field carrying a document's id.
pub const ID_FIELD: &str = "id";

/// A store-assigned document identifier.
///
/// Ids are unique across the whole store, not per namespace, and are
/// never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(u64);

impl DocumentId {
    /// The first id a fresh store hands out.
    pub const FIRST: DocumentId = DocumentId(1);

    /// Wraps a raw id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The id allocated after this one, or `None` once the space is spent.
    pub fn next(&self) -> Option<DocumentId> {
        self.0.checked_add(1).map(DocumentId)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DocumentId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// One stored record.
///
/// `id` and `namespace` are fixed when the document is created; `payload`
/// and `updated_at` change on every upsert that targets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub namespace: String,
    pub payload: Payload,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Payload as readers see it: the stored fields with `id` set to the
    /// store-assigned id.
    pub fn view(&self) -> Payload {
        let mut view = self.payload.clone();
        view.insert(ID_FIELD.to_string(), Datum::from(self.id.as_u64()));
        view
    }

    /// The reader view as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(Datum::Object(self.view()))
    }
}

/// Validates a namespace name.
///
/// Namespaces are caller-chosen and created on first write; the only rule
/// is that the name is not empty.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty() {
        return Err(Error::InvalidNamespace(
            "Namespace cannot be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut payload = Payload::new();
        payload.insert("status".to_string(), Datum::from("ok"));
        Document {
            id: DocumentId::new(9),
            namespace: "results".to_string(),
            payload,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_view_merges_id() {
        let doc = sample();
        let view = doc.view();
        assert_eq!(view.get("id"), Some(&Datum::Integer(9)));
        assert_eq!(view.get("status"), Some(&Datum::from("ok")));
        assert!(!doc.payload.contains_key("id"));

        assert_eq!(doc.to_json(), serde_json::json!({"id": 9, "status": "ok"}));
    }

    #[test]
    fn test_document_id_next() {
        assert_eq!(DocumentId::FIRST.next(), Some(DocumentId::new(2)));
        assert_eq!(DocumentId::new(u64::MAX).next(), None);
    }

    #[test]
    fn test_validate_namespace() {
        assert!(validate_namespace("results").is_ok());
        assert!(validate_namespace("learned regex").is_ok());
        assert!(matches!(
            validate_namespace(""),
            Err(Error::InvalidNamespace(_))
        ));
    }
}
