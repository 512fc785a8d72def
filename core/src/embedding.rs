//! Text → vector capability.
//!
//! See the [module documentation](crate) for how this fits into the memory engine:
//! every fact, utterance, and query is embedded before it touches the vector
//! store or the short-term buffer.

use std::future::Future;

use crate::Result;

/// Why a piece of text is being embedded.
///
/// Advisory only: a backend may route `Search` to a cheaper endpoint than
/// `Add`/`Update`, but the returned dimensionality must never depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    /// Embedding a fact or utterance being written to a store.
    Add,
    /// Re-embedding a record whose text changed.
    Update,
    /// Embedding a query for similarity search.
    Search,
}

/// Converts text to a fixed-dimension dense vector.
///
/// # Implementation requirements
///
/// - [`embed`](Embedder::embed) must return a vector of length [`dim`](Embedder::dim).
/// - Whether the vector is unit-normalised depends on the metric the caller's
///   vector store was configured with (cosine-like `IP` expects unit vectors).
/// - Transport failures must be reported as [`crate::Error::EmbeddingUnavailable`],
///   never panicked on; callers treat the failure as fatal to the current
///   request only.
pub trait Embedder: Send + Sync {
    /// The dimensionality of vectors this embedder produces.
    fn dim(&self) -> usize;

    /// Embeds a single piece of text.
    fn embed(&self, text: &str, purpose: Purpose) -> impl Future<Output = Result<Vec<f32>>> + Send;
}

impl<T: Embedder + ?Sized> Embedder for std::sync::Arc<T> {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn embed(&self, text: &str, purpose: Purpose) -> impl Future<Output = Result<Vec<f32>>> + Send {
        (**self).embed(text, purpose)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::MockEmbedder;
    use super::*;

    #[tokio::test]
    async fn embed_respects_dimension() {
        let model = MockEmbedder { dimension: 8 };
        let v = model.embed("hello", Purpose::Search).await.unwrap();
        assert_eq!(v.len(), 8);
    }

    #[tokio::test]
    async fn distinct_texts_differ() {
        let model = MockEmbedder { dimension: 4 };
        let a = model.embed("a", Purpose::Add).await.unwrap();
        let b = model.embed("ab", Purpose::Add).await.unwrap();
        assert_ne!(a, b);
    }
}
