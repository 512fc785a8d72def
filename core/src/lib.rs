//! Capability traits shared by the memory engine and the RAG pipeline.
//!
//! This crate deliberately knows nothing about OpenAI, Cohere, or any other
//! concrete provider. It defines two small async traits —
//! [`Embedder`] and [`Generator`] — and the [`Message`] transcript type they
//! share. Everything upstream (`recall-memory`, `recall-rag`) is generic over
//! these traits; a caller supplies a concrete implementation at the edges.
//!
//! ```text
//! ┌────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │ recall-mem │───▶│   recall-core    │◀───│ your LLM client │
//! │ recall-rag │    │ (this crate)     │    │ your embed API  │
//! └────────────┘    │ - Embedder       │    └─────────────────┘
//!                    │ - Generator      │
//!                    └──────────────────┘
//! ```

mod embedding;
mod error;
mod generator;
mod message;

pub use embedding::{Embedder, Purpose};
pub use error::{Error, Result};
pub use generator::{
    parse_json_object, strip_code_fences, GenerateOptions, Generator, ResponseFormat, TextStream,
};
pub use message::{Message, Role};
