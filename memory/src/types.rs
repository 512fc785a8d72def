//! Data types shared across the memory engine.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Arbitrary user-supplied metadata attached to a [`MemoryRecord`].
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// What kind of long-term memory a record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// An atomic fact distilled from an utterance.
    #[default]
    Semantic,
    /// A dialogue-window summary produced by the procedural summarizer.
    Procedural,
}

/// The long-term memory unit: a single fact (or procedural summary) plus its
/// embedding and bookkeeping fields.
///
/// `created_at` is set once, at construction, and never changed; `updated_at`
/// starts `None` and is set on every mutation after that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Stable 128-bit identifier, string (UUID v4) form.
    pub id: String,
    /// The fact text.
    pub text: String,
    /// Dense embedding; length equals the owning collection's dimension.
    pub embedding: Vec<f32>,
    /// Hex digest of `text`, used only to detect duplicates.
    pub hash: String,
    /// Owning user.
    pub user_id: String,
    /// Set once at construction.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// `None` until the first mutation.
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    /// Semantic fact vs. procedural summary.
    #[serde(default)]
    pub memory_type: MemoryType,
    /// Open metadata bag.
    #[serde(default)]
    pub metadata: Metadata,
}

impl MemoryRecord {
    /// Builds a new record for `text`, stamping `created_at` to now and
    /// hashing `text` for duplicate detection.
    #[must_use]
    pub fn new(id: String, text: String, embedding: Vec<f32>, user_id: String) -> Self {
        Self {
            hash: sha256::digest(text.as_str()),
            id,
            text,
            embedding,
            user_id,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
            memory_type: MemoryType::Semantic,
            metadata: Metadata::new(),
        }
    }

    /// Replaces `text` and `embedding`, re-hashing and stamping `updated_at`.
    pub fn apply_update(&mut self, text: String, embedding: Vec<f32>) {
        self.hash = sha256::digest(text.as_str());
        self.text = text;
        self.embedding = embedding;
        self.updated_at = Some(OffsetDateTime::now_utc());
    }

    /// JSON-safe projection persisted to the payload file; the embedding is
    /// deliberately excluded since it already lives in the index file.
    #[must_use]
    pub fn to_payload(&self) -> RecordPayload {
        RecordPayload {
            data: self.text.clone(),
            hash: self.hash.clone(),
            user_id: self.user_id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            memory_type: self.memory_type,
            metadata: self.metadata.clone(),
        }
    }
}

/// On-disk payload for a [`MemoryRecord`] (everything except the embedding).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPayload {
    /// The fact text.
    pub data: String,
    /// Hex digest of `data`.
    pub hash: String,
    /// Owning user.
    pub user_id: String,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last-mutation timestamp, if any.
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    /// Semantic fact vs. procedural summary.
    #[serde(default)]
    pub memory_type: MemoryType,
    /// Open metadata bag.
    #[serde(default)]
    pub metadata: Metadata,
}

/// A single short-term memory entry: a raw utterance plus its embedding,
/// held only in process memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortTermEntry {
    /// Opaque identifier, unique within the process.
    pub id: String,
    /// The raw utterance text.
    pub text: String,
    /// Its embedding.
    pub embedding: Vec<f32>,
    /// When it was appended.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Owning user.
    pub user_id: String,
}

/// The operation a [`HistoryEvent`] or [`ReconcilerAction`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Op {
    /// A new record was inserted.
    Add,
    /// An existing record's text/embedding was replaced.
    Update,
    /// An existing record was removed.
    Delete,
    /// No mutation; surfaced for observability only.
    None,
}

/// Append-only audit entry written by [`crate::history_log::HistoryLog`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEvent {
    /// Unique event identifier.
    pub event_id: String,
    /// The record this event concerns.
    pub memory_id: String,
    /// Previous text, for `UPDATE`/`DELETE`.
    pub prev_text: Option<String>,
    /// New text, for `ADD`/`UPDATE`.
    pub new_text: Option<String>,
    /// What happened.
    pub op: Op,
    /// When the mutation happened.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Mirrors `created_at` for `ADD`; the mutation time for later events.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Whether the underlying record is now deleted.
    pub is_deleted: bool,
}

/// A single atomic fact produced by the fact extractor; transient, scoped to
/// one `add` call.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Fact {
    /// The extracted statement.
    pub text: String,
}

/// The JSON shape a fact-extraction generator call must return.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FactExtractionResult {
    /// Extracted facts, possibly empty.
    #[serde(default)]
    pub facts: Vec<String>,
}

/// A single reconciliation decision, transient to one reconcile call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerAction {
    /// Fresh id (`ADD`) or the id of the affected record (`UPDATE`/`DELETE`).
    pub id: String,
    /// New text for `ADD`/`UPDATE`; echoes prior text for `DELETE`/`NONE`.
    pub text: String,
    /// Which operation to execute.
    pub op: Op,
    /// The record's text before this action, for `UPDATE`.
    pub old_text: Option<String>,
}

/// One raw decision entry inside a reconciliation generator response, before
/// validation against the candidate set.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawReconcilerAction {
    /// Existing id for `UPDATE`/`DELETE`; absent for `ADD`.
    #[serde(default)]
    pub id: Option<String>,
    /// The fact text this action concerns.
    pub text: String,
    /// Requested operation.
    pub event: Op,
}

/// The JSON shape a reconciliation generator call must return.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReconciliationResult {
    /// One action per fact the oracle reached a decision on.
    #[serde(default)]
    pub memory: Vec<RawReconcilerAction>,
}

/// A result row returned by [`crate::engine::MemoryEngine::search`]: either a
/// long-term hit (real similarity score) or a short-term entry (synthetic
/// recency score).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Record or short-term entry id.
    pub id: String,
    /// The text.
    pub memory: String,
    /// Similarity score (LTM) or synthetic recency score (STM).
    pub score: f32,
    /// `semantic`, `procedural`, or absent for STM-sourced hits.
    pub memory_type: Option<MemoryType>,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
