//! The ADD/UPDATE/DELETE/NONE reconciliation oracle.
//!
//! For a batch of freshly extracted facts, the engine gathers the union of
//! their nearest existing records (see [`crate::vector_store::Filters`]) and
//! hands both to [`Reconciler::reconcile`], which asks a generator in a
//! single call to decide what the new facts together imply for the store:
//! insert one, fold another into an existing record, retract a
//! now-contradicted record, or do nothing.

use recall_core::{GenerateOptions, Generator, Message, ResponseFormat};
use serde::Serialize;

use crate::types::{Op, ReconcilerAction, ReconciliationResult, RecordPayload};

const DEFAULT_SYSTEM_PROMPT: &str = "You reconcile newly stated facts about a user against their \
existing long-term memory. You are given the new facts and the most similar memories already on \
file, across all of them. Decide, for each new fact, whether to ADD it as a new memory, UPDATE an \
existing memory whose text it supersedes or refines, DELETE an existing memory it contradicts, or \
do NONE if it adds nothing new. Respond with a single JSON object: \
{\"memory\": [{\"id\": \"<existing id, omit for ADD>\", \"text\": \"<resulting text>\", \
\"event\": \"ADD\"|\"UPDATE\"|\"DELETE\"|\"NONE\"}]}. Reference only ids from the candidate list \
given to you.";

#[derive(Serialize)]
struct Candidate<'a> {
    id: &'a str,
    text: &'a str,
}

/// Decides what a new fact implies for the store, given its nearest
/// neighbours.
pub struct Reconciler<G> {
    generator: G,
    system_prompt: String,
}

impl<G: Generator> Reconciler<G> {
    /// Wraps a generator for reconciliation decisions, using the default
    /// oracle prompt.
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Wraps a generator for reconciliation decisions with a caller-supplied
    /// oracle prompt, overriding the default instructions.
    pub fn with_prompt(generator: G, system_prompt: impl Into<String>) -> Self {
        Self {
            generator,
            system_prompt: system_prompt.into(),
        }
    }

    /// Reconciles a batch of newly extracted facts against the union of
    /// their candidate set, in a single generator call.
    ///
    /// `candidates` is the deduplicated `(id, score, payload)` union the
    /// caller already retrieved from the vector store (`k = 5` per fact,
    /// scoped to the user, excluding procedural memories). On any parse
    /// failure this degrades to one `ADD` per fact, each with a fresh id —
    /// never an error, since one bad oracle call must not block ingestion.
    pub async fn reconcile(&self, facts: &[String], candidates: &[(String, f32, RecordPayload)]) -> Vec<ReconcilerAction> {
        if facts.is_empty() {
            return Vec::new();
        }

        let candidate_json = serde_json::to_string_pretty(
            &candidates
                .iter()
                .map(|(id, _, payload)| Candidate {
                    id,
                    text: &payload.data,
                })
                .collect::<Vec<_>>(),
        )
        .unwrap_or_else(|_| "[]".to_string());
        let facts_json = serde_json::to_string_pretty(facts).unwrap_or_else(|_| "[]".to_string());

        let user_prompt = format!("New facts:\n{facts_json}\n\nCandidate memories:\n{candidate_json}");
        let messages = vec![Message::system(&self.system_prompt), Message::user(user_prompt)];
        let options = GenerateOptions {
            response_format: ResponseFormat::JsonObject,
            ..GenerateOptions::default()
        };

        let fallback = || facts.iter().map(|fact| fallback_add(fact)).collect();

        let Ok(response) = self.generator.generate(&messages, &options).await else {
            tracing::warn!("reconciliation generator call failed, falling back to one ADD per fact");
            return fallback();
        };

        let Some(value) = recall_core::parse_json_object(&response) else {
            tracing::warn!(response, "reconciliation response was not valid JSON, falling back to one ADD per fact");
            return fallback();
        };

        let Ok(parsed) = serde_json::from_value::<ReconciliationResult>(value) else {
            tracing::warn!(response, "reconciliation response missing `memory`, falling back to one ADD per fact");
            return fallback();
        };

        let actions: Vec<ReconcilerAction> = parsed
            .memory
            .into_iter()
            .filter_map(|raw| validate(raw, candidates))
            .collect();

        if actions.is_empty() {
            fallback()
        } else {
            actions
        }
    }
}

fn fallback_add(fact: &str) -> ReconcilerAction {
    ReconcilerAction {
        id: uuid::Uuid::new_v4().to_string(),
        text: fact.to_string(),
        op: Op::Add,
        old_text: None,
    }
}

fn validate(
    raw: crate::types::RawReconcilerAction,
    candidates: &[(String, f32, RecordPayload)],
) -> Option<ReconcilerAction> {
    match raw.event {
        Op::Add => Some(ReconcilerAction {
            id: uuid::Uuid::new_v4().to_string(),
            text: raw.text,
            op: Op::Add,
            old_text: None,
        }),
        Op::Update | Op::Delete | Op::None => {
            let id = raw.id?;
            let candidate = candidates.iter().find(|(cid, ..)| *cid == id)?;
            Some(ReconcilerAction {
                id,
                text: raw.text,
                op: raw.event,
                old_text: Some(candidate.2.data.clone()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::{Result, TextStream};
    use time::OffsetDateTime;

    struct StubGenerator(&'static str);

    impl Generator for StubGenerator {
        async fn generate(&self, _messages: &[Message], _options: &GenerateOptions) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn stream(&self, _messages: &[Message], _options: &GenerateOptions) -> TextStream {
            unimplemented!("not exercised in these tests")
        }
    }

    fn candidate(id: &str, text: &str) -> (String, f32, RecordPayload) {
        (
            id.to_string(),
            0.9,
            RecordPayload {
                data: text.to_string(),
                hash: "hash".into(),
                user_id: "u1".into(),
                created_at: OffsetDateTime::now_utc(),
                updated_at: None,
                memory_type: crate::types::MemoryType::Semantic,
                metadata: Default::default(),
            },
        )
    }

    #[tokio::test]
    async fn add_with_no_candidates() {
        let reconciler = Reconciler::new(StubGenerator(r#"{"memory": [{"text": "likes tea", "event": "ADD"}]}"#));
        let actions = reconciler.reconcile(&["likes tea".to_string()], &[]).await;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].op, Op::Add);
    }

    #[tokio::test]
    async fn update_references_existing_id() {
        let candidates = vec![candidate("m1", "likes coffee")];
        let reconciler = Reconciler::new(StubGenerator(
            r#"{"memory": [{"id": "m1", "text": "likes tea now", "event": "UPDATE"}]}"#,
        ));
        let actions = reconciler.reconcile(&["likes tea now".to_string()], &candidates).await;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].op, Op::Update);
        assert_eq!(actions[0].id, "m1");
        assert_eq!(actions[0].old_text.as_deref(), Some("likes coffee"));
    }

    #[tokio::test]
    async fn unknown_id_is_dropped_and_falls_back_to_add() {
        let reconciler = Reconciler::new(StubGenerator(
            r#"{"memory": [{"id": "ghost", "text": "x", "event": "UPDATE"}]}"#,
        ));
        let actions = reconciler.reconcile(&["new fact".to_string()], &[]).await;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].op, Op::Add);
        assert_eq!(actions[0].text, "new fact");
    }

    #[tokio::test]
    async fn malformed_response_falls_back_to_add() {
        let reconciler = Reconciler::new(StubGenerator("garbage"));
        let actions = reconciler.reconcile(&["new fact".to_string()], &[]).await;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].op, Op::Add);
    }

    #[tokio::test]
    async fn batch_falls_back_to_one_add_per_fact() {
        let reconciler = Reconciler::new(StubGenerator("garbage"));
        let facts = vec!["fact one".to_string(), "fact two".to_string()];
        let actions = reconciler.reconcile(&facts, &[]).await;
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|a| a.op == Op::Add));
    }

    #[tokio::test]
    async fn none_action_is_returned_but_not_executed() {
        let candidates = vec![candidate("m1", "likes coffee")];
        let reconciler = Reconciler::new(StubGenerator(
            r#"{"memory": [{"id": "m1", "text": "likes coffee", "event": "NONE"}]}"#,
        ));
        let actions = reconciler.reconcile(&["likes coffee".to_string()], &candidates).await;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].op, Op::None);
    }
}
