//! Error types for the dfindex pipeline.

use dfindex_codec::DecodeError;
use dfindex_storage::StorageError;
use thiserror::Error;

/// Errors that can occur while indexing or invalidating a block.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("{model} '{id}' not found in indexed state")]
    NotFound { model: &'static str, id: String },

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Decode failed in tx {txid}: {source}")]
    Decode {
        txid: String,
        #[source]
        source: DecodeError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Raw block at height {height} is not stored")]
    MissingRawBlock { height: u32 },

    #[error("No history to restore {model} '{id}' from")]
    HistoryMissing { model: &'static str, id: String },

    #[error("Block does not extend the tip: expected {expected}, got {actual}")]
    Discontinuity { expected: String, actual: String },

    #[error("Indexer aborted: {reason}")]
    Aborted { reason: String },
}

impl IndexerError {
    /// Returns `true` for upstream failures worth retrying at the same height.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }

    pub fn not_found(model: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            model,
            id: id.to_string(),
        }
    }
}

pub type IndexerResult<T> = Result<T, IndexerError>;
