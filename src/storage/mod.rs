//! Storage layer
//!
//! # Architecture
//!
//! ```text
//! Storage (shared handle, Arc<Storage>)
//!   └─→ DocumentEngine (trait)
//!        └─→ MemoryEngine (store-wide RwLock over the collection)
//!             ├─→ documents: DocumentId → Document
//!             └─→ namespaces: name → ids
//! ```
//!
//! ## Operations
//!
//! - **save**: upsert by the payload's `id` within one namespace, else insert
//!   under a freshly allocated global id
//! - **get**: exact `(namespace, id)` lookup, `None` on a miss
//! - **query**: optional single-key textual equality filter, newest first,
//!   bounded by a limit
//!
//! The store is ephemeral: it starts empty and lives as long as the process.

pub mod engine;
pub mod memory;
pub mod query;

pub use engine::{DocumentEngine, NamespaceInfo, SaveResult, Storage, StoreStats};
pub use memory::MemoryEngine;
pub use query::{evaluate, DocumentQuery, Predicate, DEFAULT_QUERY_LIMIT};
