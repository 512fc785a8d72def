//! Error kinds surfaced by the memory engine.
//!
//! `StoreCorrupt` and `OracleParseFailure` are deliberately absent from the
//! public variants a caller sees: both are handled internally (the store
//! starts empty; the extractor/reconciler fall back to their safe paths) and
//! only appear in logs.

use thiserror::Error;

/// Errors the engine can surface to a caller.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Missing `user_id`, empty text on `add`, or `limit <= 0`.
    #[error("invalid input: {0}")]
    InputInvalid(String),
    /// The embedder could not be reached.
    #[error("embedder unavailable: {0}")]
    EmbeddingUnavailable(String),
    /// The generator could not be reached.
    #[error("generator unavailable: {0}")]
    GeneratorUnavailable(String),
    /// A vector store or history log mutation failed to write to disk.
    ///
    /// The in-memory state is already updated; the next successful mutation
    /// persists the combined state.
    #[error("store write failed: {0}")]
    StoreIo(#[from] std::io::Error),
    /// A cooperative caller cancelled an in-flight request.
    #[error("cancelled")]
    Cancelled,
}

impl From<recall_core::Error> for MemoryError {
    fn from(err: recall_core::Error) -> Self {
        match err {
            recall_core::Error::EmbeddingUnavailable(msg) => Self::EmbeddingUnavailable(msg),
            recall_core::Error::GeneratorUnavailable(msg) => Self::GeneratorUnavailable(msg),
            recall_core::Error::Cancelled => Self::Cancelled,
        }
    }
}

/// Result type used throughout the memory engine.
pub type Result<T> = std::result::Result<T, MemoryError>;
