//! Response types for uploads and queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::{DocumentMetadata, IndexableUnit};

/// A passage used to ground an answer, with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceNode {
    /// Source filename ("Unknown" when the unit carries none)
    pub file_name: String,
    /// 1-based page number (0 when the unit carries none)
    pub page_number: u32,
    /// Rerank relevance score
    pub score: f32,
    /// Passage text
    pub text_content: String,
}

impl SourceNode {
    /// Build a source node from a retrieved unit and its relevance score
    pub fn from_unit(unit: &IndexableUnit, score: f32) -> Self {
        Self {
            file_name: unit.file_name().unwrap_or("Unknown").to_string(),
            page_number: unit.page_number().unwrap_or(0),
            score,
            text_content: unit.text.clone(),
        }
    }
}

/// Answer plus the passages it was grounded on, by descending score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Generated answer
    pub answer: String,
    /// Supporting passages
    pub source_nodes: Vec<SourceNode>,
}

impl QueryResponse {
    pub fn new(answer: String, source_nodes: Vec<SourceNode>) -> Self {
        Self {
            answer,
            source_nodes,
        }
    }

    /// Response when retrieval found nothing to ground an answer on
    pub fn not_found() -> Self {
        Self {
            answer: "I couldn't find relevant information in the indexed documents to answer this question.".to_string(),
            source_nodes: Vec::new(),
        }
    }
}

/// Response from document upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Whether the document was indexed
    pub success: bool,
    /// Uploaded filename
    pub filename: String,
    /// Human-readable outcome
    pub message: String,
    /// Classification attached to the indexed units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_metadata: Option<DocumentMetadata>,
    /// Pages indexed
    pub pages_indexed: usize,
    /// Units written to the vector store
    pub chunks_indexed: usize,
    /// When indexing completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<DateTime<Utc>>,
}
