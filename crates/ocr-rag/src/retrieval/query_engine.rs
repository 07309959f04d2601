//! Retriever → reranker → synthesizer
//!
//! Hybrid search returns `similarity_top_k` candidates, the cross-encoder keeps
//! the best `top_n`, and the LLM answers from those passages only.

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::ingestion::SparseEncoder;
use crate::providers::{
    EmbeddingProvider, HybridQuery, LlmProvider, Reranker, VectorSearchResult, VectorStoreProvider,
};
use crate::types::query::normalize_question;
use crate::types::{QueryResponse, SourceNode};

/// Stateless question answering over the index
pub struct QueryEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    sparse: SparseEncoder,
    store: Arc<dyn VectorStoreProvider>,
    reranker: Arc<dyn Reranker>,
    llm: Arc<dyn LlmProvider>,
    similarity_top_k: usize,
    top_n: usize,
}

impl QueryEngine {
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        reranker: Arc<dyn Reranker>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            embedder,
            sparse: SparseEncoder::new(),
            store,
            reranker,
            llm,
            similarity_top_k: config.retrieval.similarity_top_k,
            top_n: config.reranker.top_n,
        }
    }

    /// Hybrid (dense + sparse) search for the top-K candidates
    pub async fn retrieve(&self, question: &str) -> Result<Vec<VectorSearchResult>> {
        let query = HybridQuery {
            dense: self.embedder.embed(question).await?,
            sparse: self.sparse.encode_query(question),
            limit: self.similarity_top_k,
        };

        let mut candidates = self.store.hybrid_search(&query).await?;
        candidates.truncate(self.similarity_top_k);
        tracing::debug!("Retrieved {} candidates", candidates.len());
        Ok(candidates)
    }

    /// Score candidates with the cross-encoder and keep the top-N, best first
    pub async fn rerank(
        &self,
        question: &str,
        candidates: Vec<VectorSearchResult>,
    ) -> Result<Vec<SourceNode>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let passages: Vec<String> = candidates.iter().map(|c| c.unit.text.clone()).collect();
        let scores = self.reranker.score(question, &passages).await?;
        if scores.len() != candidates.len() {
            return Err(Error::rerank(format!(
                "{} returned {} scores for {} passages",
                self.reranker.name(),
                scores.len(),
                candidates.len()
            )));
        }

        let mut scored: Vec<(f32, VectorSearchResult)> = scores.into_iter().zip(candidates).collect();
        // Stable sort keeps retrieval order among equal scores
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(self.top_n);

        Ok(scored
            .into_iter()
            .map(|(score, candidate)| SourceNode::from_unit(&candidate.unit, score))
            .collect())
    }

    /// Answer a standalone question from the indexed documents
    pub async fn query(&self, question: &str) -> Result<QueryResponse> {
        let question = normalize_question(question)?;

        let candidates = self.retrieve(question).await?;
        if candidates.is_empty() {
            tracing::info!("No candidates for question, skipping synthesis");
            return Ok(QueryResponse::not_found());
        }

        let nodes = self.rerank(question, candidates).await?;
        let context = PromptBuilder::build_context(&nodes);
        let prompt = PromptBuilder::build_qa_prompt(question, &context);

        let answer = self.llm.complete(&prompt).await?;
        tracing::info!(
            "Answered from {} sources (top score {:.3})",
            nodes.len(),
            nodes.first().map(|n| n.score).unwrap_or_default()
        );

        Ok(QueryResponse::new(answer.trim().to_string(), nodes))
    }
}
