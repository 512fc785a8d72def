//! Route handlers: `POST /mem/add`, `POST /mem/search`, `POST /rag/query`.

use axum::extract::State;
use axum::Json;
use recall_core::{Embedder, Generator};
use recall_memory::MemoryItem;
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::state::AppState;

/// Body for `POST /mem/add`.
#[derive(Debug, Deserialize)]
pub struct AddReq {
    /// The utterance to ingest.
    pub text: String,
    /// Owning user.
    pub user_id: String,
    /// When `true` (the default), runs fact extraction and reconciliation.
    /// When `false`, stores `text` verbatim as a single new record.
    #[serde(default = "default_infer")]
    pub infer: bool,
}

const fn default_infer() -> bool {
    true
}

/// Response for `POST /mem/add`: the long-term records the call mutated.
#[derive(Debug, Serialize)]
pub struct AddResp {
    /// Records inserted, updated, or otherwise touched by this call.
    pub results: Vec<recall_memory::MemoryRecord>,
}

/// Body for `POST /mem/search`.
#[derive(Debug, Deserialize)]
pub struct SearchReq {
    /// The search query.
    pub query: String,
    /// Owning user.
    pub user_id: String,
    /// Maximum rows to return.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

const fn default_limit() -> usize {
    5
}

/// Response for `POST /mem/search`.
#[derive(Debug, Serialize)]
pub struct SearchResp {
    /// Blended short-term/long-term hits, highest score first.
    pub results: Vec<MemoryItem>,
}

/// Body for `POST /rag/query`.
#[derive(Debug, Deserialize)]
pub struct RagReq {
    /// The question to answer.
    pub question: String,
    /// Owning user.
    pub user_id: String,
    /// How many memories to retrieve for this query.
    #[serde(default = "default_limit")]
    pub top_k: usize,
}

/// Response for `POST /rag/query`.
#[derive(Debug, Serialize)]
pub struct RagResp {
    /// The generator's answer, citing sources as `[n]`.
    pub answer: String,
    /// The memories backing the answer, in citation order.
    pub sources: Vec<recall_rag::RagSource>,
}

/// `POST /mem/add`: embeds, extracts, and reconciles `req.text`.
pub async fn add_memory<E, G>(
    State(state): State<AppState<E, G>>,
    Json(req): Json<AddReq>,
) -> Result<Json<AddResp>, ServerError>
where
    E: Embedder + Send + Sync + 'static,
    G: Generator + Send + Sync + 'static,
{
    let results = state.engine.add(&req.user_id, &req.text, req.infer).await?;
    Ok(Json(AddResp { results }))
}

/// `POST /mem/search`: blended STM+LTM retrieval.
pub async fn search_memory<E, G>(
    State(state): State<AppState<E, G>>,
    Json(req): Json<SearchReq>,
) -> Result<Json<SearchResp>, ServerError>
where
    E: Embedder + Send + Sync + 'static,
    G: Generator + Send + Sync + 'static,
{
    let results = state.engine.search(&req.user_id, &req.query, req.limit).await?;
    Ok(Json(SearchResp { results }))
}

/// `POST /rag/query`: retrieval-augmented, citation-aware answer synthesis.
pub async fn rag_query<E, G>(
    State(state): State<AppState<E, G>>,
    Json(req): Json<RagReq>,
) -> Result<Json<RagResp>, ServerError>
where
    E: Embedder + Send + Sync + 'static,
    G: Generator + Send + Sync + 'static,
{
    let answer = state.rag.query_with_top_k(&req.user_id, &req.question, req.top_k).await?;
    Ok(Json(RagResp {
        answer: answer.answer,
        sources: answer.sources,
    }))
}
