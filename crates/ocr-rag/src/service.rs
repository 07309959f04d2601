//! Service context owning every pipeline component
//!
//! Constructed once at startup from `RagConfig` and shared with request
//! handlers. Holds no global state: the session map and readiness flag live
//! here, and every collaborator is injected.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::chat::ConversationManager;
use crate::config::{RagConfig, VectorBackend};
use crate::error::{Error, Result};
use crate::ingestion::{
    DocumentOcr, IndexReport, Indexer, MetadataExtractor, PdftoppmRasterizer, Rasterizer,
    TextChunker,
};
use crate::providers::{
    EmbeddingProvider, InMemoryVectorStore, LlmProvider, OpenAiCompatEmbedder, OpenAiCompatLlm,
    PageOcr, QdrantStore, Reranker, TeiReranker, TyphoonOcrClient, VectorStoreProvider,
};
use crate::retrieval::QueryEngine;
use crate::types::QueryResponse;

/// External collaborators the service is built from
pub struct Collaborators {
    pub rasterizer: Arc<dyn Rasterizer>,
    pub ocr: Arc<dyn PageOcr>,
    pub llm: Arc<dyn LlmProvider>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub reranker: Arc<dyn Reranker>,
    pub store: Arc<dyn VectorStoreProvider>,
}

impl Collaborators {
    /// Production clients described by the configuration
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let store: Arc<dyn VectorStoreProvider> = match config.vector_db.backend {
            VectorBackend::Qdrant => Arc::new(QdrantStore::new(
                &config.vector_db,
                config.embeddings.dimensions,
            )?),
            VectorBackend::Memory => Arc::new(InMemoryVectorStore::new()),
        };

        Ok(Self {
            rasterizer: Arc::new(PdftoppmRasterizer::new(&config.ocr)),
            ocr: Arc::new(TyphoonOcrClient::new(&config.ocr)?),
            llm: Arc::new(OpenAiCompatLlm::new(&config.llm)?),
            embedder: Arc::new(OpenAiCompatEmbedder::new(&config.embeddings)?),
            reranker: Arc::new(TeiReranker::new(&config.reranker)?),
            store,
        })
    }
}

/// Health of one external component
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub component: &'static str,
    pub provider: String,
    pub healthy: bool,
}

/// The RAG service: indexing, stateless queries, and chat
pub struct RagService {
    indexer: Indexer,
    engine: Arc<QueryEngine>,
    conversations: ConversationManager,
    llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Arc<dyn Reranker>,
    store: Arc<dyn VectorStoreProvider>,
    ready: AtomicBool,
}

impl RagService {
    /// Build the service with production clients
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config, Collaborators::from_config(config)?))
    }

    /// Build the service around the given collaborators
    pub fn new(config: &RagConfig, parts: Collaborators) -> Self {
        let Collaborators {
            rasterizer,
            ocr,
            llm,
            embedder,
            reranker,
            store,
        } = parts;

        let indexer = Indexer::new(
            DocumentOcr::new(rasterizer, ocr, config.ocr.max_concurrent_pages),
            MetadataExtractor::new(Arc::clone(&llm), config.metadata.max_chars),
            TextChunker::from_config(&config.chunking),
            Arc::clone(&embedder),
            Arc::clone(&store),
        );

        let engine = Arc::new(QueryEngine::new(
            config,
            Arc::clone(&embedder),
            Arc::clone(&store),
            Arc::clone(&reranker),
            Arc::clone(&llm),
        ));

        let conversations =
            ConversationManager::new(Arc::clone(&engine), Arc::clone(&llm), config.memory.token_limit);

        Self {
            indexer,
            engine,
            conversations,
            llm,
            embedder,
            reranker,
            store,
            ready: AtomicBool::new(false),
        }
    }

    /// Prepare the vector collection; the service serves requests once this succeeds
    pub async fn initialize(&self) -> Result<()> {
        self.store.ensure_collection().await?;
        self.ready.store(true, Ordering::SeqCst);
        tracing::info!(
            "RAG service ready (store: {}, llm: {} / {})",
            self.store.name(),
            self.llm.name(),
            self.llm.model()
        );
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(Error::ServiceUnavailable(
                "query engine is not initialized yet".to_string(),
            ))
        }
    }

    /// OCR, classify, chunk, and index a PDF
    pub async fn index_document(&self, pdf: &[u8], file_name: &str) -> Result<IndexReport> {
        self.ensure_ready()?;
        self.indexer.index_document(pdf, file_name).await
    }

    /// Stateless question answering
    pub async fn answer_query(&self, question: &str) -> Result<QueryResponse> {
        self.ensure_ready()?;
        self.engine.query(question).await
    }

    /// One turn of a conversation
    pub async fn answer_chat(&self, session_id: &str, question: &str) -> Result<QueryResponse> {
        self.ensure_ready()?;
        self.conversations.chat(session_id, question).await
    }

    /// Forget a session's history
    pub fn clear_session(&self, session_id: &str) -> bool {
        self.conversations.sessions().remove(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.conversations.sessions().len()
    }

    /// Check every external component
    pub async fn health(&self) -> Vec<ComponentHealth> {
        let (llm, embedder, reranker, store) = tokio::join!(
            self.llm.health_check(),
            self.embedder.health_check(),
            self.reranker.health_check(),
            self.store.health_check(),
        );

        vec![
            ComponentHealth {
                component: "llm",
                provider: self.llm.name().to_string(),
                healthy: llm.unwrap_or(false),
            },
            ComponentHealth {
                component: "embeddings",
                provider: self.embedder.name().to_string(),
                healthy: embedder.unwrap_or(false),
            },
            ComponentHealth {
                component: "reranker",
                provider: self.reranker.name().to_string(),
                healthy: reranker.unwrap_or(false),
            },
            ComponentHealth {
                component: "vector_store",
                provider: self.store.name().to_string(),
                healthy: store.unwrap_or(false),
            },
        ]
    }

    /// Drop all volatile state
    pub fn shutdown(&self) {
        let sessions = self.session_count();
        self.conversations.sessions().clear();
        self.ready.store(false, Ordering::SeqCst);
        tracing::info!("RAG service stopped, cleared {} sessions", sessions);
    }
}
