//! Per-user conversational memory: fact extraction, ADD/UPDATE/DELETE/NONE
//! reconciliation against a persistent vector store, and blended
//! short-term/long-term recall.
//!
//! ```text
//! add(user_id, text)
//!   │
//!   ├─▶ ShortTermBuffer::push        (FIFO, in-process only)
//!   ├─▶ FactExtractor::extract       (generator → Vec<fact>)
//!   └─▶ for each fact:
//!         VectorStore::search (k=5) ─▶ Reconciler::reconcile ─▶ execute
//!                                                                 │
//!                                                 VectorStore::{insert,update,delete}
//!                                                                 │
//!                                                          HistoryLog::append
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod fact_extractor;
pub mod history_log;
pub mod procedural;
pub mod reconciler;
pub mod short_term;
pub mod types;
pub mod vector_store;

pub use config::{MemoryEngineConfig, MemoryEngineConfigBuilder, VectorStoreConfig};
pub use engine::MemoryEngine;
pub use error::{MemoryError, Result};
pub use types::{
    Fact, FactExtractionResult, HistoryEvent, MemoryItem, MemoryRecord, MemoryType, Op,
    ReconciliationResult, ReconcilerAction, RecordPayload, ShortTermEntry,
};
pub use vector_store::{Filters, Metric, VectorStore};
