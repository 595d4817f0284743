//! Document data model.
//!
//! A document pairs a fixed identity (store-assigned id, namespace) with a
//! mutable JSON-like payload:
//!
//! ```text
//! Namespaces (caller-chosen names, created on first write)
//!   └─→ Documents (global DocumentId → Payload of Datum values)
//! ```

pub mod datum;
pub mod record;

pub use datum::{Datum, Payload};
pub use record::{validate_namespace, Document, DocumentId, ID_FIELD};
