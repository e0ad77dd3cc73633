//! Error types for the storage layer.

use thiserror::Error;

/// Errors raised by a [`Database`](crate::Database) or the typed model layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error in '{model}': {source}")]
    Serialization {
        model: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Index '{index}' is not declared on model '{model}'")]
    UnknownIndex { model: &'static str, index: String },

    #[error("Sorted index '{model}.{index}' queried without a partition key")]
    PartitionRequired { model: &'static str, index: String },
}

#[cfg(feature = "rocksdb")]
impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
