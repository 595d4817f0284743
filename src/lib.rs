// docstore - Namespaced in-memory document store
// State that agent tools keep between the steps of a plan

#![warn(rust_2018_idioms)]

pub mod config;
pub mod document;
pub mod metrics;
pub mod server;
pub mod storage;
pub mod tools;

// Re-exports for convenience
pub use document::{Datum, Document, DocumentId, Payload};
pub use storage::{DocumentEngine, MemoryEngine, Storage};

/// docstore error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid namespace: {0}")]
        InvalidNamespace(String),

        #[error("Invalid payload: {0}")]
        InvalidPayload(String),

        #[error("Invalid argument: {0}")]
        InvalidArgument(String),

        #[error("Internal error: {0}")]
        Internal(String),

        #[error("Configuration error: {0}")]
        Config(String),

        #[error("Serialization error: {0}")]
        Serialization(String),
    }

    impl Error {
        /// Caller mistakes: the operation was rejected before it touched
        /// the store.
        pub fn is_invalid_argument(&self) -> bool {
            matches!(
                self,
                Error::InvalidNamespace(_) | Error::InvalidPayload(_) | Error::InvalidArgument(_)
            )
        }
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
