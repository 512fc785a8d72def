//! Error types shared by the capability traits.

/// Errors a capability implementation may surface to its caller.
///
/// These map onto the error kinds callers are expected to treat as request-fatal,
/// never process-fatal: a failed embed or generate call fails the current
/// ingest/search, it does not poison the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The embedding backend could not be reached or rejected the request.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),
    /// The generator backend could not be reached or rejected the request.
    #[error("generator unavailable: {0}")]
    GeneratorUnavailable(String),
    /// The caller cancelled an in-flight streaming call.
    #[error("cancelled")]
    Cancelled,
}

/// Result type used by the capability traits.
pub type Result<T> = std::result::Result<T, Error>;
