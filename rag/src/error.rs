//! Errors surfaced by the RAG query pipeline.

use thiserror::Error;

/// Errors a [`crate::pipeline::RagPipeline`] call can return.
#[derive(Debug, Error)]
pub enum RagError {
    /// Propagated from the underlying memory engine (bad input, embedder or
    /// generator unavailable, store I/O failure).
    #[error(transparent)]
    Memory(#[from] recall_memory::MemoryError),
    /// No long-term or short-term memory matched the query closely enough
    /// to answer from, and the pipeline is configured to refuse rather than
    /// hallucinate.
    #[error("no relevant memory found for this query")]
    NoContext,
}

/// Result type used by the RAG query pipeline.
pub type Result<T> = std::result::Result<T, RagError>;
