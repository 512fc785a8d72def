//! Translates engine/pipeline errors into HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// The HTTP-facing error type every handler in this crate returns.
///
/// Every variant renders as `{"detail": "<message>"}`, matching the shape
/// callers of the original API get from an `HTTPException`.
#[derive(Debug)]
pub enum ServerError {
    /// Bad request body: empty `user_id`/`text`, non-positive `limit`.
    BadRequest(String),
    /// The embedder or generator backing this engine could not be reached.
    Unavailable(String),
    /// Anything else: store I/O failure, cancellation, no-context refusal.
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            Self::Unavailable(detail) => (StatusCode::SERVICE_UNAVAILABLE, detail),
            Self::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

impl From<recall_memory::MemoryError> for ServerError {
    fn from(err: recall_memory::MemoryError) -> Self {
        match err {
            recall_memory::MemoryError::InputInvalid(msg) => Self::BadRequest(msg),
            recall_memory::MemoryError::EmbeddingUnavailable(msg) | recall_memory::MemoryError::GeneratorUnavailable(msg) => {
                Self::Unavailable(msg)
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<recall_rag::RagError> for ServerError {
    fn from(err: recall_rag::RagError) -> Self {
        match err {
            recall_rag::RagError::Memory(inner) => inner.into(),
            recall_rag::RagError::NoContext => Self::Internal(err.to_string()),
        }
    }
}
