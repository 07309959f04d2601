//! Vector store provider trait for hybrid (dense + sparse) indexing and search

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{IndexableUnit, SparseVector};

/// A hybrid query: the dense and sparse views of one question
#[derive(Debug, Clone)]
pub struct HybridQuery {
    /// Dense query embedding
    pub dense: Vec<f32>,
    /// Sparse lexical query vector
    pub sparse: SparseVector,
    /// Candidates to return
    pub limit: usize,
}

/// Search result from vector store
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    /// The matched unit (vectors are not returned)
    pub unit: IndexableUnit,
    /// Fused similarity score, higher is more similar
    pub similarity: f32,
}

/// Trait for hybrid vector storage and search
///
/// Implementations:
/// - `QdrantStore`: Qdrant REST API with named dense and sparse vectors
/// - `InMemoryVectorStore`: process-local store with reciprocal-rank fusion
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Create the collection if it does not exist yet
    async fn ensure_collection(&self) -> Result<()>;

    /// Write units (each carrying both dense and sparse vectors) in one batch
    async fn upsert(&self, units: &[IndexableUnit]) -> Result<()>;

    /// Dense + sparse search fused into one ranked list, best first
    async fn hybrid_search(&self, query: &HybridQuery) -> Result<Vec<VectorSearchResult>>;

    /// Get total number of units stored
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
