//! Cross-encoder reranker trait

use async_trait::async_trait;

use crate::error::Result;

/// Second-pass relevance scoring of a small candidate set
///
/// Implementations:
/// - `TeiReranker`: text-embeddings-inference `/rerank` endpoint
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score every passage against the query.
    ///
    /// Returns exactly one score per passage, in input order. Higher is more
    /// relevant.
    async fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
