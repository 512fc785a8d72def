//! Shared application state handed to every route.

use std::sync::Arc;

use recall_memory::MemoryEngine;
use recall_rag::RagPipeline;

/// Everything a route needs: the memory engine and the RAG pipeline wrapping
/// it. Cheap to clone (both fields are `Arc`s), as `axum` state must be.
pub struct AppState<E, G> {
    /// The underlying memory engine, for `/mem/*` routes.
    pub engine: Arc<MemoryEngine<E, G>>,
    /// The RAG pipeline, for `/rag/query`.
    pub rag: Arc<RagPipeline<E, G>>,
}

impl<E, G> Clone for AppState<E, G> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            rag: Arc::clone(&self.rag),
        }
    }
}

impl<E, G> AppState<E, G> {
    /// Wraps an engine and a pipeline built over the same engine.
    #[must_use]
    pub const fn new(engine: Arc<MemoryEngine<E, G>>, rag: Arc<RagPipeline<E, G>>) -> Self {
        Self { engine, rag }
    }
}
