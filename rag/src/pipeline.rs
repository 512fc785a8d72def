//! Blended retrieval + citation-aware answer synthesis over a memory engine.

use std::sync::Arc;

use recall_core::{Embedder, GenerateOptions, Generator, Message, TextStream};
use recall_memory::{MemoryEngine, MemoryItem};

use crate::error::{RagError, Result};

/// One retrieved memory backing an answer, numbered the way it appeared in
/// the context block handed to the generator.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RagSource {
    /// 1-based position in the context block (`[n]` in the answer).
    pub rank: usize,
    /// Record or short-term entry id.
    pub id: String,
    /// The memory text.
    pub text: String,
    /// Similarity (LTM) or recency (STM) score.
    pub score: f32,
}

/// A synthesized answer plus the memories it cites.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RagAnswer {
    /// The generator's response, expected to cite sources as `[n]`.
    pub answer: String,
    /// The context the generator was given, in citation order.
    pub sources: Vec<RagSource>,
}

/// Tunables for [`RagPipeline`].
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// How many blended memories to retrieve per query.
    pub top_k: usize,
    /// Refuse to answer (return [`RagError::NoContext`]) rather than call
    /// the generator when retrieval comes back empty.
    pub require_context: bool,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            require_context: true,
        }
    }
}

impl RagConfig {
    /// Starts a builder at the defaults (`top_k = 5`, `require_context = true`).
    #[must_use]
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder(Self::default())
    }
}

/// Builder for [`RagConfig`]; every setter is `#[must_use]` and consumes `self`.
#[derive(Debug, Clone)]
pub struct RagConfigBuilder(RagConfig);

impl RagConfigBuilder {
    /// Overrides how many memories are retrieved per query. Clamped to at
    /// least 1.
    #[must_use]
    pub const fn top_k(mut self, top_k: usize) -> Self {
        self.0.top_k = if top_k == 0 { 1 } else { top_k };
        self
    }

    /// Allows answering with no retrieved context at all (the generator
    /// then relies purely on its own knowledge / the bare question).
    #[must_use]
    pub const fn allow_empty_context(mut self) -> Self {
        self.0.require_context = false;
        self
    }

    /// Finalizes the configuration.
    #[must_use]
    pub fn build(self) -> RagConfig {
        self.0
    }
}

const SYSTEM_PROMPT: &str = "Answer the user's question using only the numbered memories below. \
Cite every claim with its bracketed number, e.g. \"[2]\". If the memories don't contain the \
answer, say so plainly instead of guessing.";

fn assemble_context(items: &[MemoryItem]) -> (String, Vec<RagSource>) {
    let mut block = String::new();
    let mut sources = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let rank = idx + 1;
        block.push_str(&format!("[{rank}] {}\n", item.memory));
        sources.push(RagSource {
            rank,
            id: item.id.clone(),
            text: item.memory.clone(),
            score: item.score,
        });
    }
    (block, sources)
}

/// Retrieves blended STM+LTM context for a question, then asks a generator
/// to answer citing it by number.
pub struct RagPipeline<E, G> {
    engine: Arc<MemoryEngine<E, G>>,
    config: RagConfig,
}

impl<E: Embedder, G: Generator> RagPipeline<E, G> {
    /// Wraps a memory engine with the given query tunables.
    #[must_use]
    pub const fn new(engine: Arc<MemoryEngine<E, G>>, config: RagConfig) -> Self {
        Self { engine, config }
    }

    /// The wrapped memory engine, for callers that need direct `add`/`search`
    /// access alongside RAG queries.
    #[must_use]
    pub const fn engine(&self) -> &Arc<MemoryEngine<E, G>> {
        &self.engine
    }

    async fn retrieve(&self, user_id: &str, question: &str, top_k: usize) -> Result<(String, Vec<RagSource>)> {
        let items = self.engine.search(user_id, question, top_k).await?;
        let (context, sources) = assemble_context(&items);
        tracing::debug!(user_id, hits = sources.len(), "retrieved context for rag query");
        if sources.is_empty() && self.config.require_context {
            return Err(RagError::NoContext);
        }
        Ok((context, sources))
    }

    /// Answers `question` for `user_id` using the configured `top_k`,
    /// returning the synthesized answer and the sources it was built from.
    pub async fn query(&self, user_id: &str, question: &str) -> Result<RagAnswer> {
        self.query_with_top_k(user_id, question, self.config.top_k).await
    }

    /// Like [`query`](Self::query), but overrides `top_k` for this call only.
    pub async fn query_with_top_k(&self, user_id: &str, question: &str, top_k: usize) -> Result<RagAnswer> {
        let (context, sources) = self.retrieve(user_id, question, top_k).await?;
        let messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(format!("Memories:\n{context}\nQuestion: {question}")),
        ];
        let answer = self
            .engine
            .generator()
            .generate(&messages, &GenerateOptions::default())
            .await
            .map_err(recall_memory::MemoryError::from)?;
        Ok(RagAnswer { answer, sources })
    }

    /// Streams the answer as it is generated; sources are returned
    /// up front since retrieval happens before generation starts.
    pub async fn stream_query(&self, user_id: &str, question: &str) -> Result<(TextStream, Vec<RagSource>)> {
        let (context, sources) = self.retrieve(user_id, question, self.config.top_k).await?;
        let messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(format!("Memories:\n{context}\nQuestion: {question}")),
        ];
        let stream = self.engine.generator().stream(&messages, &GenerateOptions::default());
        Ok((stream, sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::{Purpose, Result as CoreResult};
    use recall_memory::MemoryEngineConfig;

    struct DummyEmbedder;

    impl Embedder for DummyEmbedder {
        fn dim(&self) -> usize {
            4
        }

        async fn embed(&self, text: &str, _purpose: Purpose) -> CoreResult<Vec<f32>> {
            Ok(vec![text.len() as f32 * 0.01, 0.0, 0.0, 0.0])
        }
    }

    struct EchoGenerator;

    impl Generator for EchoGenerator {
        async fn generate(&self, messages: &[Message], _options: &GenerateOptions) -> CoreResult<String> {
            Ok(format!("answer based on: {}", messages.last().unwrap().content))
        }

        fn stream(&self, _messages: &[Message], _options: &GenerateOptions) -> TextStream {
            unimplemented!("not exercised in these tests")
        }
    }

    fn pipeline(require_context: bool) -> (RagPipeline<DummyEmbedder, EchoGenerator>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryEngineConfig::builder(dir.path(), "memories", 4).build();
        let engine = MemoryEngine::new(config, DummyEmbedder, EchoGenerator).unwrap();
        let rag_config = if require_context {
            RagConfig::builder().build()
        } else {
            RagConfig::builder().allow_empty_context().build()
        };
        (RagPipeline::new(Arc::new(engine), rag_config), dir)
    }

    #[tokio::test]
    async fn empty_context_errors_by_default() {
        let (rag, _dir) = pipeline(true);
        let err = rag.query("u1", "what do I like?").await.unwrap_err();
        assert!(matches!(err, RagError::NoContext));
    }

    #[tokio::test]
    async fn empty_context_allowed_when_configured() {
        let (rag, _dir) = pipeline(false);
        let answer = rag.query("u1", "what do I like?").await.unwrap();
        assert!(answer.sources.is_empty());
        assert!(answer.answer.contains("Question: what do I like?"));
    }

    #[tokio::test]
    async fn sources_are_numbered_in_context_order() {
        let (rag, _dir) = pipeline(false);
        rag.engine().add_procedural_memory("u1", "loves hiking").await.unwrap();
        let answer = rag.query("u1", "what do I like?").await.unwrap();
        assert_eq!(answer.sources[0].rank, 1);
    }
}
