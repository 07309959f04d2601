//! Core types for the RAG service

pub mod document;
pub mod query;
pub mod response;

pub use document::{
    Category, DocType, DocumentMetadata, DocumentStatus, IndexableUnit, PageRecord, SparseVector,
};
pub use query::{ChatRequest, QueryRequest};
pub use response::{QueryResponse, SourceNode, UploadResponse};
