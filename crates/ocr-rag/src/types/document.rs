//! Page, metadata and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Metadata key holding the source file name of a unit
pub const FILE_NAME_KEY: &str = "file_name";
/// Metadata key holding the 1-based page number of a unit
pub const PAGE_NUMBER_KEY: &str = "page_number";
/// Metadata key holding the ingestion id shared by all units of one document
pub const DOCUMENT_ID_KEY: &str = "document_id";
/// Metadata key holding the unit's position within its page
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// Text extracted from one page by OCR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// 1-based page number
    pub page_number: u32,
    /// OCR output for the page
    pub text: String,
}

impl PageRecord {
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
        }
    }
}

/// Document type taxonomy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocType {
    Policy,
    Report,
    Manual,
    Contract,
    Memo,
    Legal,
    Financial,
    #[default]
    Unknown,
}

impl DocType {
    pub const ALL: &'static [DocType] = &[
        Self::Policy,
        Self::Report,
        Self::Manual,
        Self::Contract,
        Self::Memo,
        Self::Legal,
        Self::Financial,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Policy => "Policy",
            Self::Report => "Report",
            Self::Manual => "Manual",
            Self::Contract => "Contract",
            Self::Memo => "Memo",
            Self::Legal => "Legal",
            Self::Financial => "Financial",
            Self::Unknown => "Unknown",
        }
    }

    /// Case-insensitive match against the taxonomy, `Unknown` otherwise
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(label))
            .unwrap_or_default()
    }
}

/// Business category taxonomy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "HR")]
    Hr,
    Finance,
    Engineering,
    Sales,
    #[serde(rename = "IT")]
    It,
    Legal,
    General,
    #[default]
    Unknown,
}

impl Category {
    pub const ALL: &'static [Category] = &[
        Self::Hr,
        Self::Finance,
        Self::Engineering,
        Self::Sales,
        Self::It,
        Self::Legal,
        Self::General,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hr => "HR",
            Self::Finance => "Finance",
            Self::Engineering => "Engineering",
            Self::Sales => "Sales",
            Self::It => "IT",
            Self::Legal => "Legal",
            Self::General => "General",
            Self::Unknown => "Unknown",
        }
    }

    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(label))
            .unwrap_or_default()
    }
}

/// Publication status taxonomy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentStatus {
    Published,
    Draft,
    Archived,
    #[default]
    Unknown,
}

impl DocumentStatus {
    pub const ALL: &'static [DocumentStatus] =
        &[Self::Published, Self::Draft, Self::Archived, Self::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "Published",
            Self::Draft => "Draft",
            Self::Archived => "Archived",
            Self::Unknown => "Unknown",
        }
    }

    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(label))
            .unwrap_or_default()
    }
}

macro_rules! impl_display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

impl_display_as_str!(DocType, Category, DocumentStatus);

/// Title used when none could be extracted
pub const UNKNOWN_TITLE: &str = "N/A";

/// Document-level classification attached to every unit of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub doc_type: DocType,
    pub category: Category,
    pub status: DocumentStatus,
    pub title: String,
}

impl DocumentMetadata {
    /// The record used whenever extraction fails
    pub fn fallback() -> Self {
        Self {
            doc_type: DocType::Unknown,
            category: Category::Unknown,
            status: DocumentStatus::Unknown,
            title: UNKNOWN_TITLE.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        *self == Self::fallback()
    }

    /// Flatten into string-valued metadata entries
    pub fn to_metadata(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::with_capacity(4);
        map.insert("doc_type".to_string(), self.doc_type.as_str().into());
        map.insert("category".to_string(), self.category.as_str().into());
        map.insert("status".to_string(), self.status.as_str().into());
        map.insert("title".to_string(), self.title.clone().into());
        map
    }
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Sparse lexical vector (parallel index/value arrays)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Dot product against another sparse vector
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let lookup: HashMap<u32, f32> = other
            .indices
            .iter()
            .copied()
            .zip(other.values.iter().copied())
            .collect();

        self.indices
            .iter()
            .zip(self.values.iter())
            .filter_map(|(i, v)| lookup.get(i).map(|w| v * w))
            .sum()
    }
}

/// A bounded span of page text stored as one retrievable record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexableUnit {
    /// Unique unit ID (vector store point id)
    pub id: Uuid,
    /// Chunk text
    pub text: String,
    /// Document metadata merged with per-unit provenance fields
    pub metadata: HashMap<String, serde_json::Value>,
    /// Dense embedding (empty until embedded; not returned by searches)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dense: Vec<f32>,
    /// Lexical representation for hybrid search
    #[serde(default, skip_serializing_if = "SparseVector::is_empty")]
    pub sparse: SparseVector,
}

impl IndexableUnit {
    /// Create a unit from text and metadata
    pub fn new(text: impl Into<String>, metadata: HashMap<String, serde_json::Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            metadata,
            dense: Vec::new(),
            sparse: SparseVector::default(),
        }
    }

    /// Source file name, if recorded
    pub fn file_name(&self) -> Option<&str> {
        self.metadata.get(FILE_NAME_KEY).and_then(|v| v.as_str())
    }

    /// Source page number, if recorded
    pub fn page_number(&self) -> Option<u32> {
        self.metadata
            .get(PAGE_NUMBER_KEY)
            .and_then(|v| v.as_u64())
            .and_then(|p| u32::try_from(p).ok())
    }
}
