//! Distills raw utterances into atomic facts via a generator call.

use recall_core::{GenerateOptions, Generator, Message, ResponseFormat};

use crate::types::FactExtractionResult;

const DEFAULT_SYSTEM_PROMPT: &str = "You extract atomic, self-contained facts about the user from a \
conversation turn. Return only facts worth remembering long-term: stable preferences, \
biographical details, ongoing plans, explicit corrections. Skip small talk and anything \
already implied by the assistant's own reply. Respond with a single JSON object of the form \
{\"facts\": [\"fact one\", \"fact two\"]}. If nothing is worth remembering, return \
{\"facts\": []}.";

/// Turns one utterance into zero or more atomic facts.
///
/// Never fails on malformed generator output: an unparsable response becomes
/// an empty fact list rather than an error, since a single bad extraction
/// should not block the rest of `add`.
pub struct FactExtractor<G> {
    generator: G,
    system_prompt: String,
}

impl<G: Generator> FactExtractor<G> {
    /// Wraps a generator for fact extraction, using the default prompt.
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Wraps a generator for fact extraction with a caller-supplied prompt,
    /// overriding the default extraction instructions.
    pub fn with_prompt(generator: G, system_prompt: impl Into<String>) -> Self {
        Self {
            generator,
            system_prompt: system_prompt.into(),
        }
    }

    /// Extracts facts from `utterance`. Returns an empty `Vec` if the
    /// generator errors or the response doesn't parse as the expected shape.
    pub async fn extract(&self, utterance: &str) -> Vec<String> {
        let messages = vec![
            Message::system(&self.system_prompt),
            Message::user(utterance),
        ];
        let options = GenerateOptions {
            response_format: ResponseFormat::JsonObject,
            ..GenerateOptions::default()
        };

        let Ok(response) = self.generator.generate(&messages, &options).await else {
            tracing::warn!("fact extraction generator call failed, skipping utterance");
            return Vec::new();
        };

        let Some(value) = recall_core::parse_json_object(&response) else {
            tracing::warn!(response, "fact extraction response was not valid JSON, skipping");
            return Vec::new();
        };

        match serde_json::from_value::<FactExtractionResult>(value) {
            Ok(result) => result.facts,
            Err(err) => {
                tracing::warn!(error = %err, response, "fact extraction response missing `facts`, skipping");
                Vec::new()
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
    async fn extracts_facts_from_well_formed_json() {
        let extractor = FactExtractor::new(StubGenerator(r#"{"facts": ["likes espresso", "lives in Kyoto"]}"#));
        let facts = extractor.extract("I live in Kyoto and love espresso").await;
        assert_eq!(facts, vec!["likes espresso".to_string(), "lives in Kyoto".to_string()]);
    }

    #[tokio::test]
    async fn strips_code_fences_before_parsing() {
        let extractor = FactExtractor::new(StubGenerator("```json\n{\"facts\": [\"a fact\"]}\n```"));
        let facts = extractor.extract("anything").await;
        assert_eq!(facts, vec!["a fact".to_string()]);
    }

    #[tokio::test]
    async fn empty_facts_list_is_fine() {
        let extractor = FactExtractor::new(StubGenerator(r#"{"facts": []}"#));
        assert!(extractor.extract("just chatting").await.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_falls_back_to_empty() {
        let extractor = FactExtractor::new(StubGenerator("not json at all"));
        assert!(extractor.extract("anything").await.is_empty());
    }

    #[tokio::test]
    async fn missing_facts_key_falls_back_to_empty() {
        let extractor = FactExtractor::new(StubGenerator(r#"{"oops": []}"#));
        assert!(extractor.extract("anything").await.is_empty());
    }
}
