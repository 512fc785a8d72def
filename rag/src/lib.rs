//! Retrieval-augmented answer synthesis over a [`recall_memory::MemoryEngine`].
//!
//! This crate does not index or embed anything itself — it calls
//! [`recall_memory::MemoryEngine::search`] for blended short-term/long-term
//! retrieval, assembles the hits into a numbered context block, and asks a
//! [`recall_core::Generator`] to answer citing them by number.

mod error;
mod pipeline;

pub use error::{RagError, Result};
pub use pipeline::{RagAnswer, RagConfig, RagConfigBuilder, RagPipeline, RagSource};
