//! Configuration for the OCR RAG service
//!
//! Built once at startup and handed by reference to every component
//! constructor. Values come from an optional TOML file and are then
//! overridden by a small set of environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable naming the TOML config file
pub const CONFIG_PATH_ENV: &str = "OCR_RAG_CONFIG";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// OCR endpoint and rasterization
    pub ocr: OcrConfig,
    /// Chat/completion LLM
    pub llm: LlmConfig,
    /// Embedding model endpoint
    pub embeddings: EmbeddingConfig,
    /// Cross-encoder reranker endpoint
    pub reranker: RerankerConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Metadata extraction
    pub metadata: MetadataConfig,
    /// Vector database configuration
    pub vector_db: VectorDbConfig,
    /// Conversation memory
    pub memory: MemoryConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply env overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };

        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load using the path in `OCR_RAG_CONFIG`, if set
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).ok();
        Self::load(path.as_deref().map(Path::new))
    }

    /// Parse a TOML document; missing sections fall back to defaults
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (env in production, a map in tests)
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LLM_API_BASE") {
            self.llm.base_url = v;
        }
        if let Some(v) = lookup("LLM_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = lookup("LLM_MODEL_NAME") {
            self.llm.model = v;
        }
        if let Some(v) = lookup("OCR_API_ENDPOINT") {
            self.ocr.endpoint = v;
        }
        if let Some(v) = lookup("OCR_API_MODEL") {
            self.ocr.model = v;
        }
        if let Some(v) = lookup("QDRANT_URL") {
            self.vector_db.url = v;
        }
        if let Some(v) = lookup("QDRANT_COLLECTION_NAME") {
            self.vector_db.collection = v;
        }
        self
    }

    /// Reject combinations the pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be > 0".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.similarity_top_k == 0 || self.reranker.top_n == 0 {
            return Err(Error::Config(
                "retrieval.similarity_top_k and reranker.top_n must be > 0".into(),
            ));
        }
        if self.reranker.top_n > self.retrieval.similarity_top_k {
            return Err(Error::Config(format!(
                "reranker.top_n ({}) cannot exceed retrieval.similarity_top_k ({})",
                self.reranker.top_n, self.retrieval.similarity_top_k
            )));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be > 0".into()));
        }
        if self.ocr.max_concurrent_pages == 0 {
            return Err(Error::Config("ocr.max_concurrent_pages must be > 0".into()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
    /// Seconds between initialization attempts while the service is not ready
    pub init_retry_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024,
            init_retry_secs: 10,
        }
    }
}

/// OCR service and page rasterization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// OpenAI-style chat completions endpoint of the OCR model
    pub endpoint: String,
    /// OCR model name
    pub model: String,
    /// Instruction sent alongside each page image
    pub prompt: String,
    /// Per-page request timeout (OCR is slow)
    pub timeout_secs: u64,
    /// Rasterization resolution
    pub dpi: u32,
    /// Timeout for rasterizing a whole document
    pub rasterize_timeout_secs: u64,
    /// Pages OCR'd concurrently per document
    pub max_concurrent_pages: usize,
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn rasterize_timeout(&self) -> Duration {
        Duration::from_secs(self.rasterize_timeout_secs)
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/v1/chat/completions".to_string(),
            model: "typhoon-ocr-preview".to_string(),
            prompt: "Process this image".to_string(),
            timeout_secs: 300, // 5 minutes
            dpi: 200,
            rasterize_timeout_secs: 120,
            max_concurrent_pages: 4,
        }
    }
}

/// OpenAI-compatible LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API base URL (without `/chat/completions`)
    pub base_url: String,
    /// Bearer token
    pub api_key: Option<String>,
    /// Generation model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens per completion
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
    /// Context window size (tokens)
    pub context_window: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001/v1".to_string(),
            api_key: None,
            model: "ptm-gpt-oss-120b".to_string(),
            temperature: 0.5,
            max_tokens: 1500,
            timeout_secs: 120,
            max_retries: 2,
            context_window: 8192,
        }
    }
}

/// Embedding endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// OpenAI-compatible base URL (without `/embeddings`)
    pub base_url: String,
    /// Bearer token
    pub api_key: Option<String>,
    /// Model to use
    pub model: String,
    /// Embedding dimensions (1024 for bge-m3)
    pub dimensions: usize,
    /// Texts per embedding request
    pub batch_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/v1".to_string(),
            api_key: None,
            model: "BAAI/bge-m3".to_string(),
            dimensions: 1024,
            batch_size: 10,
            timeout_secs: 60,
        }
    }
}

/// Cross-encoder reranker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    /// Base URL of a TEI-style server exposing `/rerank`
    pub base_url: String,
    /// Model name (informational, TEI serves one model)
    pub model: String,
    /// Passages kept after reranking
    pub top_n: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8082".to_string(),
            model: "BAAI/bge-reranker-v2-m3".to_string(),
            top_n: 3,
            timeout_secs: 60,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 200,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Hybrid search candidates handed to the reranker
    pub similarity_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_top_k: 10,
        }
    }
}

/// Metadata extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Characters of the first page sent to the classifier
    pub max_chars: usize,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self { max_chars: 4000 }
    }
}

/// Vector backend selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Qdrant over its REST API
    #[default]
    Qdrant,
    /// Process-local store (tests, demos)
    Memory,
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Which backend to use
    pub backend: VectorBackend,
    /// Qdrant REST URL
    pub url: String,
    /// Qdrant API key
    pub api_key: Option<String>,
    /// Collection name
    pub collection: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Qdrant,
            url: "http://localhost:6333".to_string(),
            api_key: None,
            collection: "my_rag_collection".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Conversation memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Token budget for history fed into condensation
    pub token_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { token_limit: 8000 }
    }
}
