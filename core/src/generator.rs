//! Chat-transcript → text capability, plus the JSON-object recovery helpers
//! the fact extractor and reconciler lean on.

use std::future::Future;
use std::pin::Pin;

use futures_core::Stream;

use crate::message::Message;
use crate::Result;

/// Requested shape of a [`Generator`] response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Free-form text.
    #[default]
    Free,
    /// A single top-level JSON object. The generator may still wrap it in a
    /// markdown code fence; callers strip that with [`parse_json_object`].
    JsonObject,
}

/// Sampling and shape parameters for a single generator call.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Expected response shape.
    pub response_format: ResponseFormat,
    /// Sampling temperature, if the backend supports it.
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens.
    pub max_tokens: Option<u32>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            response_format: ResponseFormat::Free,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl GenerateOptions {
    /// Shorthand for a call that expects a single JSON object back.
    #[must_use]
    pub fn json_object() -> Self {
        Self {
            response_format: ResponseFormat::JsonObject,
            ..Self::default()
        }
    }
}

/// A boxed stream of text fragments, in emission order.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Produces text from a chat transcript.
///
/// Implementations are assumed thread-safe; if a concrete backend is not,
/// the caller is responsible for wrapping it (e.g. behind a mutex).
pub trait Generator: Send + Sync {
    /// Generates a complete response for `messages`.
    fn generate(
        &self,
        messages: &[Message],
        opts: &GenerateOptions,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Streams a response as UTF-8 fragments, in order.
    ///
    /// Dropping the returned stream before it is exhausted must terminate the
    /// upstream call promptly rather than let it run to completion unread.
    fn stream(&self, messages: &[Message], opts: &GenerateOptions) -> TextStream;
}

impl<T: Generator + ?Sized> Generator for std::sync::Arc<T> {
    fn generate(&self, messages: &[Message], opts: &GenerateOptions) -> impl Future<Output = Result<String>> + Send {
        (**self).generate(messages, opts)
    }

    fn stream(&self, messages: &[Message], opts: &GenerateOptions) -> TextStream {
        (**self).stream(messages, opts)
    }
}

/// Strips a leading/trailing markdown code fence (` ```json ... ``` ` or
/// ` ``` ... ``` `) from generator output, if present.
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parses generator output that is expected to be a single JSON object,
/// tolerating a surrounding code fence.
///
/// Returns `None` rather than an error on any failure: callers in this crate
/// treat "could not parse" as "no structured output", not a fatal error.
#[must_use]
pub fn parse_json_object(text: &str) -> Option<serde_json::Value> {
    let candidate = strip_code_fences(text);
    serde_json::from_str(candidate).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_plain_fence() {
        let input = "```\n{\"facts\":[]}\n```";
        assert_eq!(strip_code_fences(input), "{\"facts\":[]}");
    }

    #[test]
    fn strips_json_tagged_fence() {
        let input = "```json\n{\"facts\":[\"a\"]}\n```";
        assert_eq!(strip_code_fences(input), "{\"facts\":[\"a\"]}");
    }

    #[test]
    fn passes_through_unfenced() {
        let input = "{\"facts\":[]}";
        assert_eq!(strip_code_fences(input), input);
    }

    #[test]
    fn parses_fenced_object() {
        let input = "```json\n{\"memory\":[]}\n```";
        let value = parse_json_object(input).unwrap();
        assert!(value.get("memory").is_some());
    }

    #[test]
    fn returns_none_on_garbage() {
        assert!(parse_json_object("not json at all").is_none());
    }
}
