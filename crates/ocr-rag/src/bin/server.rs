//! OCR RAG server binary
//!
//! Run with: cargo run -p ocr-rag --bin ocr-rag-server
//! Set OCR_RAG_CONFIG to a TOML file to override the defaults.

use ocr_rag::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ocr_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RagConfig::from_env()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - OCR: {} ({})", config.ocr.endpoint, config.ocr.model);
    tracing::info!("  - LLM: {} ({})", config.llm.base_url, config.llm.model);
    tracing::info!("  - Embeddings: {} ({} dims)", config.embeddings.model, config.embeddings.dimensions);
    tracing::info!("  - Reranker: {} (top {})", config.reranker.model, config.reranker.top_n);
    tracing::info!("  - Vector store: {:?} {} / {}", config.vector_db.backend, config.vector_db.url, config.vector_db.collection);
    tracing::info!("  - Chunk size: {} (overlap {})", config.chunking.chunk_size, config.chunking.chunk_overlap);

    let server = RagServer::new(config)?;

    tracing::info!("API: http://{}/api/info", server.address());
    tracing::info!("Press Ctrl+C to stop");

    server.start().await?;

    Ok(())
}
