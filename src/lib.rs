//! Per-user conversational memory for LLM agents.
//!
//! This facade crate re-exports the pieces most callers need:
//! [`recall_core`]'s capability traits, [`recall_memory`]'s ingestion/recall
//! engine, and — behind the `rag` feature — [`recall_rag`]'s citation-aware
//! query pipeline.
//!
//! ```text
//! your embedder ──┐
//!                 ├─▶ MemoryEngine::add(user_id, text)
//! your generator ─┘        │
//!                           ├─▶ FactExtractor → Reconciler → VectorStore
//!                           └─▶ HistoryLog
//!
//! MemoryEngine::search(user_id, query, limit) ─▶ blended STM+LTM hits
//! RagPipeline::query(user_id, question)       ─▶ cited answer   (feature = "rag")
//! ```

pub use recall_core::{Embedder, GenerateOptions, Generator, Message, Purpose, ResponseFormat, Role};
pub use recall_memory::{
    Filters, Metric, MemoryEngine, MemoryEngineConfig, MemoryError, MemoryItem, MemoryRecord,
    MemoryType, Op, VectorStore,
};

#[cfg(feature = "rag")]
pub use recall_rag::{RagAnswer, RagConfig, RagError, RagPipeline, RagSource};
