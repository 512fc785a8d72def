//! Periodic dialogue-window summaries ("procedural memory").
//!
//! Every `procedural_every_n_messages` processed utterances, the engine asks
//! a [`ProceduralSummarizer`] to condense the recent short-term backlog into
//! a single free-text summary. The result is stored as an ordinary
//! [`crate::types::MemoryType::Procedural`] record — it goes through the
//! vector store like any other memory, but is excluded from the
//! reconciler's candidate set (see [`crate::vector_store::Filters`]) so new
//! facts never get folded into or contradicted by a summary.

use recall_core::{GenerateOptions, Generator, Message};

const SYSTEM_PROMPT: &str = "Summarize the following conversation turns into a brief third-\
person account of what the user has said and done. Write prose, not a list. Keep it under \
six sentences. Do not invent details that were not said.";

/// Condenses a run of recent utterances into one summary.
pub struct ProceduralSummarizer<G> {
    generator: G,
}

impl<G: Generator> ProceduralSummarizer<G> {
    /// Wraps a generator for summarization.
    pub const fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Summarizes `utterances` (oldest first). Returns `None` on a generator
    /// error or an empty summary — this is best-effort and never blocks
    /// ingestion.
    pub async fn summarize(&self, utterances: &[String]) -> Option<String> {
        if utterances.is_empty() {
            return None;
        }

        let transcript = utterances
            .iter()
            .enumerate()
            .map(|(i, text)| format!("{}. {text}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");

        let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(transcript)];

        match self.generator.generate(&messages, &GenerateOptions::default()).await {
            Ok(summary) if !summary.trim().is_empty() => Some(summary.trim().to_string()),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "procedural summarization failed, skipping refresh");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::{Result, TextStream};

    struct StubGenerator(&'static str);

    impl Generator for StubGenerator {
        async fn generate(&self, _messages: &[Message], _options: &GenerateOptions) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn stream(&self, _messages: &[Message], _options: &GenerateOptions) -> TextStream {
            unimplemented!("not exercised in these tests")
        }
    }

    #[tokio::test]
    async fn summarizes_nonempty_backlog() {
        let summarizer = ProceduralSummarizer::new(StubGenerator("The user discussed travel plans."));
        let summary = summarizer
            .summarize(&["I'm going to Kyoto".to_string(), "for two weeks".to_string()])
            .await;
        assert_eq!(summary.as_deref(), Some("The user discussed travel plans."));
    }

    #[tokio::test]
    async fn empty_backlog_returns_none() {
        let summarizer = ProceduralSummarizer::new(StubGenerator("anything"));
        assert!(summarizer.summarize(&[]).await.is_none());
    }

    #[tokio::test]
    async fn blank_summary_returns_none() {
        let summarizer = ProceduralSummarizer::new(StubGenerator("   "));
        assert!(summarizer.summarize(&["hi".to_string()]).await.is_none());
    }
}
