//! The memory engine: the orchestrator every other module in this crate
//! exists to support.
//!
//! [`MemoryEngine::add`] is the full ingestion pipeline — embed the
//! utterance, push it to short-term memory, extract facts, reconcile each
//! fact against the long-term store, execute the resulting mutation, and
//! log it — and [`MemoryEngine::search`] is the blended STM+LTM read path.

use std::sync::Arc;

use recall_core::{Embedder, Generator, Purpose};

use crate::config::MemoryEngineConfig;
use crate::error::{MemoryError, Result};
use crate::fact_extractor::FactExtractor;
use crate::history_log::HistoryLog;
use crate::procedural::ProceduralSummarizer;
use crate::reconciler::Reconciler;
use crate::short_term::ShortTermBuffer;
use crate::types::{HistoryEvent, MemoryItem, MemoryRecord, MemoryType, Op, ShortTermEntry};
use crate::vector_store::{Filters, VectorStore};

/// Candidate breadth for the long-term nearest-neighbor lookup behind
/// [`MemoryEngine::search`], before threshold filtering.
const LTM_KNN_K: usize = 10;
/// Long-term hits kept (after threshold filtering) for a blended search.
const LTM_TOP_N: usize = 3;
/// Most recent short-term entries folded into a blended search.
const STM_RECENT_N: usize = 5;

/// Per-user conversational memory: short-term buffer, long-term vector
/// store, and the extraction/reconciliation pipeline that keeps the latter
/// in sync with what the user actually says.
pub struct MemoryEngine<E, G> {
    embedder: Arc<E>,
    generator: Arc<G>,
    fact_extractor: FactExtractor<Arc<G>>,
    reconciler: Reconciler<Arc<G>>,
    summarizer: ProceduralSummarizer<Arc<G>>,
    store: VectorStore,
    history: HistoryLog,
    stm: ShortTermBuffer,
    config: MemoryEngineConfig,
    processed: std::sync::atomic::AtomicUsize,
}

impl<E: Embedder, G: Generator> MemoryEngine<E, G> {
    /// Opens the engine's persistent state (vector store, history log) at
    /// the paths named in `config` and wires up the pipeline.
    pub fn new(config: MemoryEngineConfig, embedder: E, generator: G) -> Result<Self> {
        let generator = Arc::new(generator);
        let store = VectorStore::open(
            &config.vector_store.path,
            &config.vector_store.collection_name,
            config.vector_store.embedding_model_dims,
            config.vector_store.metric,
        );
        let history = HistoryLog::open(&config.history_db_path)?;

        let fact_extractor = match &config.custom_fact_extraction_prompt {
            Some(prompt) => FactExtractor::with_prompt(Arc::clone(&generator), prompt.clone()),
            None => FactExtractor::new(Arc::clone(&generator)),
        };
        let reconciler = match &config.custom_update_memory_prompt {
            Some(prompt) => Reconciler::with_prompt(Arc::clone(&generator), prompt.clone()),
            None => Reconciler::new(Arc::clone(&generator)),
        };

        Ok(Self {
            embedder: Arc::new(embedder),
            fact_extractor,
            reconciler,
            summarizer: ProceduralSummarizer::new(Arc::clone(&generator)),
            generator,
            store,
            history,
            stm: ShortTermBuffer::new(config.stm_max_items),
            processed: std::sync::atomic::AtomicUsize::new(0),
            config,
        })
    }

    /// The embedder this engine was constructed with, shared with callers
    /// (e.g. the RAG pipeline) that need to embed a query the same way.
    #[must_use]
    pub fn embedder(&self) -> &Arc<E> {
        &self.embedder
    }

    /// The generator this engine was constructed with, shared with callers
    /// that need to synthesize text (e.g. the RAG pipeline's answer step).
    #[must_use]
    pub fn generator(&self) -> &Arc<G> {
        &self.generator
    }

    /// Ingests one utterance for `user_id`: embeds it into short-term
    /// memory, then either stores it verbatim (`infer = false`) or runs the
    /// extract/reconcile pipeline against the long-term store (`infer =
    /// true`), finally (periodically) refreshing the procedural summary.
    ///
    /// Returns the long-term mutations actually executed, in the order the
    /// reconciler decided them (an empty `Vec` is a normal, non-error
    /// outcome — e.g. pure small talk with nothing worth remembering).
    pub async fn add(&self, user_id: &str, text: &str, infer: bool) -> Result<Vec<MemoryRecord>> {
        if user_id.trim().is_empty() {
            return Err(MemoryError::InputInvalid("user_id must not be empty".into()));
        }
        if text.trim().is_empty() {
            return Err(MemoryError::InputInvalid("text must not be empty".into()));
        }

        let stm_embedding = self.embedder.embed(text, Purpose::Add).await?;
        self.stm.push(ShortTermEntry {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            embedding: stm_embedding.clone(),
            created_at: time::OffsetDateTime::now_utc(),
            user_id: user_id.to_string(),
        });

        let applied = if infer {
            self.extract_and_reconcile(user_id, text).await?
        } else {
            let action = crate::types::ReconcilerAction {
                id: uuid::Uuid::new_v4().to_string(),
                text: text.to_string(),
                op: Op::Add,
                old_text: None,
            };
            self.execute(user_id, &action, stm_embedding)?.into_iter().collect()
        };

        let count = self.processed.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
        if count % self.config.procedural_every_n_messages == 0 {
            self.refresh_procedural_summary(user_id).await?;
        }

        Ok(applied)
    }

    async fn extract_and_reconcile(&self, user_id: &str, text: &str) -> Result<Vec<MemoryRecord>> {
        let facts = self.fact_extractor.extract(text).await;
        if facts.is_empty() {
            return Ok(Vec::new());
        }

        let filters = Filters {
            user_id: Some(user_id.to_string()),
            exclude_memory_type: Some(MemoryType::Procedural),
        };

        // Union of each fact's nearest neighbours, deduplicated by id, so the
        // oracle reconciles the whole batch against one shared candidate set
        // in a single call rather than one call per fact.
        let mut seen = std::collections::HashSet::new();
        let mut candidates: Vec<(String, f32, crate::types::RecordPayload)> = Vec::new();
        for fact in &facts {
            let embedding = self.embedder.embed(fact, Purpose::Add).await?;
            for hit in self.store.search(&embedding, 5, &filters) {
                if seen.insert(hit.0.clone()) {
                    candidates.push(hit);
                }
            }
        }

        let actions = self.reconciler.reconcile(&facts, &candidates).await;

        let mut applied = Vec::new();
        for action in actions {
            let embedding = match action.op {
                Op::Add | Op::Update => self.embedder.embed(&action.text, Purpose::Add).await?,
                Op::Delete | Op::None => Vec::new(),
            };
            if let Some(record) = self.execute(user_id, &action, embedding)? {
                applied.push(record);
            }
        }

        Ok(applied)
    }

    fn execute(
        &self,
        user_id: &str,
        action: &crate::types::ReconcilerAction,
        embedding: Vec<f32>,
    ) -> Result<Option<MemoryRecord>> {
        let now = time::OffsetDateTime::now_utc();
        match action.op {
            Op::None => Ok(None),
            Op::Add => {
                let record = MemoryRecord::new(action.id.clone(), action.text.clone(), embedding, user_id.to_string());
                self.store
                    .insert(vec![record.id.clone()], vec![record.embedding.clone()], vec![record.to_payload()])?;
                self.log(&record.id, None, Some(&record.text), Op::Add, now)?;
                Ok(Some(record))
            }
            Op::Update => {
                let Some(existing) = self.store.get(&action.id) else {
                    return Ok(None);
                };
                let payload = crate::types::RecordPayload {
                    data: action.text.clone(),
                    hash: sha256::digest(action.text.as_str()),
                    updated_at: Some(now),
                    ..existing
                };
                let updated = self.store.update(&action.id, Some(embedding.clone()), Some(payload.clone()))?;
                if !updated {
                    return Ok(None);
                }
                self.log(&action.id, action.old_text.as_deref(), Some(&action.text), Op::Update, now)?;
                Ok(Some(MemoryRecord {
                    id: action.id.clone(),
                    text: action.text.clone(),
                    embedding,
                    hash: payload.hash,
                    user_id: payload.user_id,
                    created_at: payload.created_at,
                    updated_at: payload.updated_at,
                    memory_type: payload.memory_type,
                    metadata: payload.metadata,
                }))
            }
            Op::Delete => {
                let deleted = self.store.delete(&action.id)?;
                if !deleted {
                    return Ok(None);
                }
                self.log(&action.id, action.old_text.as_deref(), None, Op::Delete, now)?;
                Ok(None)
            }
        }
    }

    fn log(&self, memory_id: &str, prev_text: Option<&str>, new_text: Option<&str>, op: Op, when: time::OffsetDateTime) -> Result<()> {
        let event = HistoryEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            memory_id: memory_id.to_string(),
            prev_text: prev_text.map(str::to_string),
            new_text: new_text.map(str::to_string),
            op,
            created_at: when,
            updated_at: when,
            is_deleted: matches!(op, Op::Delete),
        };
        if let Err(err) = self.history.append(&event) {
            tracing::warn!(error = %err, memory_id, "history log append failed, continuing");
        }
        Ok(())
    }

    async fn refresh_procedural_summary(&self, user_id: &str) -> Result<()> {
        let recent = self.stm.recent(user_id, self.config.procedural_every_n_messages);
        if recent.is_empty() {
            return Ok(());
        }
        let mut oldest_first = recent;
        oldest_first.reverse();
        let span_start = oldest_first.first().map(|entry| entry.created_at);
        let span_end = oldest_first.last().map(|entry| entry.created_at);
        let span_len = oldest_first.len();
        let texts: Vec<String> = oldest_first.into_iter().map(|entry| entry.text).collect();
        let Some(summary) = self.summarizer.summarize(&texts).await else {
            return Ok(());
        };

        let embedding = self.embedder.embed(&summary, Purpose::Add).await?;
        let id = uuid::Uuid::new_v4().to_string();
        let mut record = MemoryRecord::new(id, summary, embedding, user_id.to_string());
        record.memory_type = MemoryType::Procedural;
        record.metadata.insert("dialogue_span_messages".to_string(), span_len.into());
        if let Some(start) = span_start {
            record
                .metadata
                .insert("dialogue_span_start".to_string(), start.format(&time::format_description::well_known::Rfc3339).unwrap_or_default().into());
        }
        if let Some(end) = span_end {
            record
                .metadata
                .insert("dialogue_span_end".to_string(), end.format(&time::format_description::well_known::Rfc3339).unwrap_or_default().into());
        }
        self.store
            .insert(vec![record.id.clone()], vec![record.embedding.clone()], vec![record.to_payload()])?;
        self.log(&record.id, None, Some(&record.text), Op::Add, record.created_at)?;
        Ok(())
    }

    /// Blended STM+LTM retrieval for `query`, capped at `limit` rows.
    ///
    /// Long-term hits above [`MemoryEngineConfig::ltm_threshold`] (at most
    /// [`LTM_TOP_N`]) are merged with the [`STM_RECENT_N`] most recent
    /// short-term entries (a synthetic score of `0.99`, newest first) and
    /// sorted by score descending before truncation.
    pub async fn search(&self, user_id: &str, query: &str, limit: usize) -> Result<Vec<MemoryItem>> {
        if user_id.trim().is_empty() {
            return Err(MemoryError::InputInvalid("user_id must not be empty".into()));
        }
        if limit == 0 {
            return Err(MemoryError::InputInvalid("limit must be > 0".into()));
        }

        let embedding = self.embedder.embed(query, Purpose::Search).await?;
        let filters = Filters {
            user_id: Some(user_id.to_string()),
            exclude_memory_type: None,
        };
        let ltm_hits = self.store.search(&embedding, LTM_KNN_K, &filters);

        let mut items: Vec<MemoryItem> = ltm_hits
            .into_iter()
            .filter(|(_, score, _)| *score >= self.config.ltm_threshold)
            .take(LTM_TOP_N)
            .map(|(id, score, payload)| MemoryItem {
                id,
                memory: payload.data,
                score,
                memory_type: Some(payload.memory_type),
                created_at: payload.created_at,
            })
            .collect();

        for entry in self.stm.recent(user_id, STM_RECENT_N) {
            items.push(MemoryItem {
                id: entry.id,
                memory: entry.text,
                score: 0.99,
                memory_type: None,
                created_at: entry.created_at,
            });
        }

        items.sort_by(|a, b| b.score.total_cmp(&a.score));
        items.truncate(limit);
        Ok(items)
    }

    /// Drops every record for every user, for both the long-term store and
    /// the short-term buffer (existing history entries are kept for audit
    /// purposes; only the vector store and STM are reset).
    pub fn reset(&self) -> Result<()> {
        self.store.reset()?;
        self.stm.clear_all();
        Ok(())
    }

    /// Appends a procedural (dialogue-summary) memory directly, bypassing
    /// extraction/reconciliation.
    pub async fn add_procedural_memory(&self, user_id: &str, summary: &str) -> Result<MemoryRecord> {
        let embedding = self.embedder.embed(summary, Purpose::Add).await?;
        let mut record = MemoryRecord::new(uuid::Uuid::new_v4().to_string(), summary.to_string(), embedding, user_id.to_string());
        record.memory_type = MemoryType::Procedural;
        self.store
            .insert(vec![record.id.clone()], vec![record.embedding.clone()], vec![record.to_payload()])?;
        self.log(&record.id, None, Some(&record.text), Op::Add, record.created_at)?;
        Ok(record)
    }

    /// Lists every long-term record for `user_id`, long-term only (no STM).
    #[must_use]
    pub fn get_all(&self, user_id: &str) -> Vec<MemoryItem> {
        let filters = Filters::for_user(user_id);
        self.store
            .list(&filters, None)
            .into_iter()
            .map(|(id, payload)| MemoryItem {
                id,
                memory: payload.data,
                score: 1.0,
                memory_type: Some(payload.memory_type),
                created_at: payload.created_at,
            })
            .collect()
    }

    /// Deletes every long-term record for `user_id`.
    pub fn delete_all(&self, user_id: &str) -> Result<usize> {
        let filters = Filters::for_user(user_id);
        let rows = self.store.list(&filters, None);
        let now = time::OffsetDateTime::now_utc();
        let mut deleted = 0;
        for (id, payload) in rows {
            if self.store.delete(&id)? {
                self.log(&id, Some(&payload.data), None, Op::Delete, now)?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
