//! HTTP surface: `POST /mem/add`, `POST /mem/search`, `POST /rag/query`.
//!
//! This crate is generic over [`recall_core::Embedder`]/[`recall_core::Generator`]
//! and ships no concrete provider — callers wire in their own embedding and
//! LLM clients and hand [`router`] an [`AppState`] built from them.

mod error;
mod handlers;
mod state;

pub use error::ServerError;
pub use handlers::{AddReq, AddResp, RagReq, RagResp, SearchReq, SearchResp};
pub use state::AppState;

use axum::routing::post;
use axum::Router;
use recall_core::{Embedder, Generator};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the full router: `/mem/add`, `/mem/search`, `/rag/query`, with
/// request tracing and permissive CORS (suitable for a local/trusted
/// deployment; tighten `CorsLayer` for anything public-facing).
pub fn router<E, G>(state: AppState<E, G>) -> Router
where
    E: Embedder + Send + Sync + 'static,
    G: Generator + Send + Sync + 'static,
{
    Router::new()
        .route("/mem/add", post(handlers::add_memory))
        .route("/mem/search", post(handlers::search_memory))
        .route("/rag/query", post(handlers::rag_query))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use recall_core::{GenerateOptions, Message, Purpose, Result as CoreResult, TextStream};
    use recall_memory::{MemoryEngine, MemoryEngineConfig};
    use recall_rag::{RagConfig, RagPipeline};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct DummyEmbedder;

    impl Embedder for DummyEmbedder {
        fn dim(&self) -> usize {
            4
        }

        async fn embed(&self, text: &str, _purpose: Purpose) -> CoreResult<Vec<f32>> {
            Ok(vec![text.len() as f32 * 0.01, 0.0, 0.0, 0.0])
        }
    }

    struct StubGenerator;

    impl Generator for StubGenerator {
        async fn generate(&self, _messages: &[Message], _options: &GenerateOptions) -> CoreResult<String> {
            Ok(r#"{"facts": []}"#.to_string())
        }

        fn stream(&self, _messages: &[Message], _options: &GenerateOptions) -> TextStream {
            unimplemented!("not exercised in these tests")
        }
    }

    fn test_app() -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryEngineConfig::builder(dir.path(), "memories", 4).build();
        let engine = Arc::new(MemoryEngine::new(config, DummyEmbedder, StubGenerator).unwrap());
        let rag = Arc::new(RagPipeline::new(Arc::clone(&engine), RagConfig::builder().allow_empty_context().build()));
        (router(AppState::new(engine, rag)), dir)
    }

    #[tokio::test]
    async fn add_memory_accepts_valid_body() {
        let (app, _dir) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/mem/add")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"text":"just chatting","user_id":"u1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn add_memory_rejects_empty_user_id() {
        let (app, _dir) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/mem/add")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"text":"hello","user_id":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn search_memory_returns_ok() {
        let (app, _dir) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/mem/search")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query":"coffee","user_id":"u1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
