//! Query evaluation over a namespace snapshot.
//!
//! A query is evaluated in three steps, always in this order:
//!
//! 1. **filter** - keep documents whose payload field `key` renders to the
//!    same canonical text as the predicate value
//! 2. **sort** - most recently written first, ties broken by higher id
//! 3. **truncate** - keep at most `limit` documents
//!
//! Evaluation only reads the documents it is handed; the engine decides
//! which snapshot that is.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::document::{validate_namespace, Datum, Document, ID_FIELD};
use crate::error::{Error, Result};

/// Limit used when the caller does not supply one.
pub const DEFAULT_QUERY_LIMIT: usize = 10;

/// Single-key equality filter.
///
/// Equality is textual: both sides are compared by their canonical string
/// rendering, so a stored number `5` matches a query value `"5"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub key: String,
    pub value: Datum,
}

impl Predicate {
    pub fn new(key: impl Into<String>, value: impl Into<Datum>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Tests a document as readers see it, with `id` merged into the payload.
    pub fn matches(&self, doc: &Document) -> bool {
        let expected = self.value.canonical_text();
        if self.key == ID_FIELD {
            return doc.id.to_string() == expected;
        }
        doc.payload
            .get(&self.key)
            .map(|value| value.canonical_text() == expected)
            .unwrap_or(false)
    }
}

/// A namespace scan with an optional predicate and a result limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentQuery {
    pub namespace: String,
    pub predicate: Option<Predicate>,
    pub limit: usize,
}

impl DocumentQuery {
    /// All documents of `namespace`, newest first, default limit.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            predicate: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Rejects an empty namespace or a zero limit.
    pub fn validate(&self) -> Result<()> {
        validate_namespace(&self.namespace)?;
        if self.limit == 0 {
            return Err(Error::InvalidArgument(
                "limit must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

/// Recency order: `updated_at` descending, then `id` descending.
fn recency(a: &Document, b: &Document) -> Ordering {
    b.updated_at
        .cmp(&a.updated_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Filters, sorts and truncates `documents` for `query`.
///
/// Documents from other namespaces are skipped, so callers may pass a
/// wider snapshot than the namespace itself.
pub fn evaluate<'a, I>(query: &DocumentQuery, documents: I) -> Vec<Document>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut selected: Vec<&Document> = documents
        .into_iter()
        .filter(|doc| doc.namespace == query.namespace)
        .filter(|doc| {
            query
                .predicate
                .as_ref()
                .map_or(true, |predicate| predicate.matches(doc))
        })
        .collect();

    selected.sort_by(|a, b| recency(a, b));
    selected.truncate(query.limit);
    selected.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentId, Payload};
    use chrono::{Duration, TimeZone, Utc};

    fn doc(id: u64, namespace: &str, secs: i64, fields: &[(&str, Datum)]) -> Document {
        let payload: Payload = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Document {
            id: DocumentId::new(id),
            namespace: namespace.to_string(),
            payload,
            updated_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs),
        }
    }

    #[test]
    fn test_recency_order_and_tie_break() {
        let docs = vec![
            doc(1, "results", 10, &[]),
            doc(2, "results", 30, &[]),
            doc(3, "results", 20, &[]),
            doc(4, "results", 30, &[]),
        ];
        let ids: Vec<u64> = evaluate(&DocumentQuery::new("results"), &docs)
            .iter()
            .map(|d| d.id.as_u64())
            .collect();
        assert_eq!(ids, vec![4, 2, 3, 1]);
    }

    #[test]
    fn test_predicate_is_textual() {
        let docs = vec![
            doc(1, "results", 1, &[("nodes", Datum::from(5))]),
            doc(2, "results", 2, &[("nodes", Datum::from("5"))]),
            doc(3, "results", 3, &[("nodes", Datum::from(6))]),
            doc(4, "results", 4, &[("other", Datum::from(5))]),
        ];
        let query = DocumentQuery::new("results").with_predicate(Predicate::new("nodes", "5"));
        let ids: Vec<u64> = evaluate(&query, &docs).iter().map(|d| d.id.as_u64()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_predicate_on_id_uses_store_id() {
        let docs = vec![doc(7, "results", 1, &[]), doc(8, "results", 2, &[])];
        let query = DocumentQuery::new("results").with_predicate(Predicate::new("id", 7));
        let found = evaluate(&query, &docs);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, DocumentId::new(7));
    }

    #[test]
    fn test_other_namespaces_and_limit() {
        let docs: Vec<Document> = (1..=20)
            .map(|i| doc(i, if i % 2 == 0 { "a" } else { "b" }, i as i64, &[]))
            .collect();
        let found = evaluate(&DocumentQuery::new("a").with_limit(3), &docs);
        let ids: Vec<u64> = found.iter().map(|d| d.id.as_u64()).collect();
        assert_eq!(ids, vec![20, 18, 16]);
    }

    #[test]
    fn test_validate() {
        assert!(DocumentQuery::new("results").validate().is_ok());
        assert!(matches!(
            DocumentQuery::new("results").with_limit(0).validate(),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            DocumentQuery::new("").validate(),
            Err(Error::InvalidNamespace(_))
        ));
    }
}
