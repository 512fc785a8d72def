//! Engine configuration and its builder.

use std::path::PathBuf;

use crate::short_term::DEFAULT_MAX_ITEMS;
use crate::vector_store::Metric;

/// Where a collection's two sidecar files live and how it scores vectors.
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    /// Directory the `<collection>.index`/`<collection>.payload.json` pair
    /// lives under.
    pub path: PathBuf,
    /// Collection name, i.e. the file stem.
    pub collection_name: String,
    /// Embedding dimension; every vector inserted must match this.
    pub embedding_model_dims: usize,
    /// Similarity metric.
    pub metric: Metric,
}

/// Tunables for [`crate::engine::MemoryEngine`].
#[derive(Debug, Clone)]
pub struct MemoryEngineConfig {
    /// Long-term vector store settings.
    pub vector_store: VectorStoreConfig,
    /// Path to the history log's embedded database file.
    pub history_db_path: PathBuf,
    /// Minimum similarity score an LTM hit needs to be included in a
    /// blended search result.
    pub ltm_threshold: f32,
    /// Per-user short-term buffer capacity.
    pub stm_max_items: usize,
    /// How many processed utterances trigger a procedural summary refresh.
    pub procedural_every_n_messages: usize,
    /// Overrides [`crate::fact_extractor::FactExtractor`]'s default system
    /// prompt, for callers tuning extraction to a specific domain.
    pub custom_fact_extraction_prompt: Option<String>,
    /// Overrides [`crate::reconciler::Reconciler`]'s default oracle prompt.
    pub custom_update_memory_prompt: Option<String>,
}

impl MemoryEngineConfig {
    /// Starts a builder with the given vector-store location and dimension;
    /// every other field takes a sensible default.
    #[must_use]
    pub fn builder(path: impl Into<PathBuf>, collection_name: impl Into<String>, embedding_model_dims: usize) -> MemoryEngineConfigBuilder {
        MemoryEngineConfigBuilder {
            vector_store: VectorStoreConfig {
                path: path.into(),
                collection_name: collection_name.into(),
                embedding_model_dims,
                metric: Metric::Ip,
            },
            history_db_path: None,
            ltm_threshold: 0.75,
            stm_max_items: DEFAULT_MAX_ITEMS,
            procedural_every_n_messages: 20,
            custom_fact_extraction_prompt: None,
            custom_update_memory_prompt: None,
        }
    }
}

/// Builder for [`MemoryEngineConfig`]; every setter is `#[must_use]` and
/// consumes `self`.
#[derive(Debug, Clone)]
pub struct MemoryEngineConfigBuilder {
    vector_store: VectorStoreConfig,
    history_db_path: Option<PathBuf>,
    ltm_threshold: f32,
    stm_max_items: usize,
    procedural_every_n_messages: usize,
    custom_fact_extraction_prompt: Option<String>,
    custom_update_memory_prompt: Option<String>,
}

impl MemoryEngineConfigBuilder {
    /// Overrides the similarity metric (default: [`Metric::Ip`]).
    #[must_use]
    pub const fn with_metric(mut self, metric: Metric) -> Self {
        self.vector_store.metric = metric;
        self
    }

    /// Overrides the history log's database path (default:
    /// `<vector store path>/history.db`).
    #[must_use]
    pub fn with_history_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_db_path = Some(path.into());
        self
    }

    /// Overrides the LTM inclusion threshold (default: 0.75).
    #[must_use]
    pub const fn with_ltm_threshold(mut self, threshold: f32) -> Self {
        self.ltm_threshold = threshold;
        self
    }

    /// Overrides the per-user short-term buffer capacity (default: 32).
    /// Clamped to at least 1.
    #[must_use]
    pub const fn with_stm_max_items(mut self, max_items: usize) -> Self {
        self.stm_max_items = if max_items == 0 { 1 } else { max_items };
        self
    }

    /// Overrides the procedural-summary refresh cadence (default: 20).
    /// Clamped to at least 1.
    #[must_use]
    pub const fn with_procedural_every_n_messages(mut self, n: usize) -> Self {
        self.procedural_every_n_messages = if n == 0 { 1 } else { n };
        self
    }

    /// Overrides the fact-extraction system prompt (default: the built-in
    /// extraction instructions).
    #[must_use]
    pub fn with_custom_fact_extraction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_fact_extraction_prompt = Some(prompt.into());
        self
    }

    /// Overrides the reconciliation oracle's system prompt (default: the
    /// built-in ADD/UPDATE/DELETE/NONE instructions).
    #[must_use]
    pub fn with_custom_update_memory_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_update_memory_prompt = Some(prompt.into());
        self
    }

    /// Finalizes the configuration.
    #[must_use]
    pub fn build(self) -> MemoryEngineConfig {
        let history_db_path = self
            .history_db_path
            .unwrap_or_else(|| self.vector_store.path.join("history.db"));
        MemoryEngineConfig {
            vector_store: self.vector_store,
            history_db_path,
            ltm_threshold: self.ltm_threshold,
            stm_max_items: self.stm_max_items,
            procedural_every_n_messages: self.procedural_every_n_messages,
            custom_fact_extraction_prompt: self.custom_fact_extraction_prompt,
            custom_update_memory_prompt: self.custom_update_memory_prompt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = MemoryEngineConfig::builder("/tmp/recall", "memories", 384).build();
        assert!((config.ltm_threshold - 0.75).abs() < f32::EPSILON);
        assert_eq!(config.stm_max_items, DEFAULT_MAX_ITEMS);
        assert_eq!(config.history_db_path, PathBuf::from("/tmp/recall/history.db"));
    }

    #[test]
    fn zero_stm_max_items_clamps_to_one() {
        let config = MemoryEngineConfig::builder("/tmp/recall", "memories", 384)
            .with_stm_max_items(0)
            .build();
        assert_eq!(config.stm_max_items, 1);
    }

    #[test]
    fn explicit_history_path_overrides_default() {
        let config = MemoryEngineConfig::builder("/tmp/recall", "memories", 384)
            .with_history_db_path("/tmp/other/history.db")
            .build();
        assert_eq!(config.history_db_path, PathBuf::from("/tmp/other/history.db"));
    }
}
