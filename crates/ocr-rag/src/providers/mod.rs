//! Provider abstractions for OCR, LLM, embeddings, reranking, and vector storage
//!
//! Every external collaborator sits behind a trait so the ingestion and query
//! paths can be driven by HTTP clients in production and by in-process doubles
//! in tests.

pub mod embedding;
pub mod llm;
pub mod memory;
pub mod ocr;
pub mod openai;
pub mod qdrant;
pub mod reranker;
pub mod tei;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use memory::InMemoryVectorStore;
pub use ocr::{PageOcr, TyphoonOcrClient};
pub use openai::{OpenAiCompatEmbedder, OpenAiCompatLlm};
pub use qdrant::QdrantStore;
pub use reranker::Reranker;
pub use tei::TeiReranker;
pub use vector_store::{HybridQuery, VectorSearchResult, VectorStoreProvider};

use std::time::Duration;

use crate::error::{Error, Result};

/// Build a reqwest client with a per-request timeout
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(5)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Join a base URL and a path without doubling slashes
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("http://llm:8001/v1/", "/chat/completions"),
            "http://llm:8001/v1/chat/completions"
        );
        assert_eq!(join_url("http://tei", "rerank"), "http://tei/rerank");
    }
}
