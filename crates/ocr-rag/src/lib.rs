//! ocr-rag: question answering over scanned PDF documents with page-level citations
//!
//! PDFs are rasterized page by page, read by an OCR model, classified by an
//! LLM, chunked, and written to a hybrid (dense + sparse) vector store.
//! Questions are answered by hybrid retrieval, cross-encoder reranking, and
//! grounded synthesis, either statelessly or within a chat session whose
//! follow-up questions are condensed against the conversation history.

pub mod chat;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod service;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use ingestion::IndexReport;
pub use service::{Collaborators, RagService};
pub use types::{
    document::{DocumentMetadata, IndexableUnit, PageRecord},
    query::{ChatRequest, QueryRequest},
    response::{QueryResponse, SourceNode, UploadResponse},
};
