//! Indexing pipeline: OCR → metadata → chunking → embedding → vector store

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::document::{CHUNK_INDEX_KEY, DOCUMENT_ID_KEY, FILE_NAME_KEY, PAGE_NUMBER_KEY};
use crate::types::{DocumentMetadata, IndexableUnit, PageRecord};

use super::chunker::TextChunker;
use super::metadata::MetadataExtractor;
use super::ocr::DocumentOcr;
use super::sparse::SparseEncoder;

/// Result of indexing one document
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    /// Ingestion id shared by every unit of the document
    pub document_id: Uuid,
    /// Source filename
    pub file_name: String,
    /// Classification attached to every unit
    pub metadata: DocumentMetadata,
    /// Pages OCR'd
    pub pages: usize,
    /// Units written to the vector store
    pub units: usize,
    /// When the upsert completed
    pub indexed_at: DateTime<Utc>,
}

/// Turns PDF bytes into indexed, metadata-enriched units
pub struct Indexer {
    ocr: DocumentOcr,
    metadata: MetadataExtractor,
    chunker: TextChunker,
    sparse: SparseEncoder,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
}

impl Indexer {
    pub fn new(
        ocr: DocumentOcr,
        metadata: MetadataExtractor,
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
    ) -> Self {
        Self {
            ocr,
            metadata,
            chunker,
            sparse: SparseEncoder::new(),
            embedder,
            store,
        }
    }

    /// Index a PDF. The store is written only if every page was OCR'd.
    pub async fn index_document(&self, pdf: &[u8], file_name: &str) -> Result<IndexReport> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(Error::invalid_input("file name must not be empty"));
        }

        let started = Instant::now();
        tracing::info!("[{}] Indexing started ({} bytes)", file_name, pdf.len());

        let pages = self.ocr.extract_pages(pdf).await?;

        let metadata = match pages.first() {
            Some(first) if !first.text.trim().is_empty() => self.metadata.extract(&first.text).await,
            _ => DocumentMetadata::fallback(),
        };

        let document_id = Uuid::new_v4();
        let mut units = self.build_units(&pages, file_name, &metadata, document_id);
        if units.is_empty() {
            return Err(Error::internal(format!("{} produced no indexable text", file_name)));
        }

        self.attach_vectors(&mut units).await?;
        self.store.upsert(&units).await?;

        tracing::info!(
            "[{}] Indexed {} pages as {} units into {} in {:.1}s",
            file_name,
            pages.len(),
            units.len(),
            self.store.name(),
            started.elapsed().as_secs_f32()
        );

        Ok(IndexReport {
            document_id,
            file_name: file_name.to_string(),
            metadata,
            pages: pages.len(),
            units: units.len(),
            indexed_at: Utc::now(),
        })
    }

    /// Chunk every page and attach merged metadata.
    ///
    /// Provenance fields are inserted after the document metadata so they can
    /// never be shadowed by it.
    pub fn build_units(
        &self,
        pages: &[PageRecord],
        file_name: &str,
        metadata: &DocumentMetadata,
        document_id: Uuid,
    ) -> Vec<IndexableUnit> {
        let document_fields = metadata.to_metadata();
        let mut units = Vec::new();

        for page in pages {
            for (chunk_index, text) in self.chunker.chunk_text(&page.text).into_iter().enumerate() {
                let mut fields: HashMap<String, Value> = document_fields.clone();
                fields.insert(FILE_NAME_KEY.to_string(), file_name.into());
                fields.insert(PAGE_NUMBER_KEY.to_string(), page.page_number.into());
                fields.insert(DOCUMENT_ID_KEY.to_string(), document_id.to_string().into());
                fields.insert(CHUNK_INDEX_KEY.to_string(), chunk_index.into());
                units.push(IndexableUnit::new(text, fields));
            }
        }

        units
    }

    async fn attach_vectors(&self, units: &mut [IndexableUnit]) -> Result<()> {
        let texts: Vec<String> = units.iter().map(|u| u.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != units.len() {
            return Err(Error::embedding(format!(
                "{} returned {} embeddings for {} units",
                self.embedder.name(),
                embeddings.len(),
                units.len()
            )));
        }

        for (unit, dense) in units.iter_mut().zip(embeddings) {
            unit.sparse = self.sparse.encode_document(&unit.text);
            unit.dense = dense;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        sample_pdf, CountingStore, FakeRasterizer, HashEmbedder, ScriptedLlm, ScriptedOcr,
    };
    use crate::types::DocType;

    fn indexer(ocr: ScriptedOcr, llm: ScriptedLlm, store: Arc<CountingStore>) -> Indexer {
        indexer_with_chunker(ocr, llm, store, TextChunker::new(1024, 200))
    }

    fn indexer_with_chunker(
        ocr: ScriptedOcr,
        llm: ScriptedLlm,
        store: Arc<CountingStore>,
        chunker: TextChunker,
    ) -> Indexer {
        Indexer::new(
            DocumentOcr::new(Arc::new(FakeRasterizer::default()), Arc::new(ocr), 4),
            MetadataExtractor::new(Arc::new(llm), 4000),
            chunker,
            Arc::new(HashEmbedder::new(32)),
            store,
        )
    }

    #[tokio::test]
    async fn test_failed_page_never_touches_store() {
        let store = Arc::new(CountingStore::new());
        let indexer = indexer(ScriptedOcr::new().failing(2), ScriptedLlm::new(), store.clone());

        let result = indexer
            .index_document(&sample_pdf(&["a", "b", "c"]), "three.pdf")
            .await;

        assert!(matches!(result, Err(Error::OcrIncomplete { .. })));
        assert_eq!(store.upsert_calls(), 0);
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_provenance_on_every_unit() {
        let store = Arc::new(CountingStore::new());
        let ocr = ScriptedOcr::new().with_text(3, "Revenue grew 12% in the third quarter.");
        let indexer = indexer(ocr, ScriptedLlm::new(), store.clone());

        let report = indexer
            .index_document(&sample_pdf(&["a", "b", "c"]), "report.pdf")
            .await
            .unwrap();

        assert_eq!(report.pages, 3);
        assert_eq!(store.upsert_calls(), 1);

        let units = store.units();
        let page_three: Vec<_> = units
            .iter()
            .filter(|u| u.text.contains("Revenue grew"))
            .collect();
        assert!(!page_three.is_empty());
        for unit in page_three {
            assert_eq!(unit.file_name(), Some("report.pdf"));
            assert_eq!(unit.page_number(), Some(3));
        }
        assert!(units.iter().all(|u| u.dense.len() == 32 && !u.sparse.is_empty()));
    }

    #[tokio::test]
    async fn test_metadata_identical_across_units() {
        let store = Arc::new(CountingStore::new());
        let long_page = "The policy applies to all staff. ".repeat(40);
        let ocr = ScriptedOcr::new()
            .with_text(1, "Annual Leave Policy")
            .with_text(2, &long_page);
        let llm = ScriptedLlm::new().respond_to(
            "Classify",
            r#"{"doc_type": "Policy", "category": "HR", "status": "Published", "title": "Annual Leave Policy"}"#,
        );
        let indexer = indexer_with_chunker(ocr, llm, store.clone(), TextChunker::new(200, 40));

        let report = indexer
            .index_document(&sample_pdf(&["a", "b"]), "leave.pdf")
            .await
            .unwrap();

        assert_eq!(report.metadata.doc_type, DocType::Policy);
        let units = store.units();
        assert!(units.len() > 2);
        for unit in &units {
            assert_eq!(unit.metadata["doc_type"], "Policy");
            assert_eq!(unit.metadata["category"], "HR");
            assert_eq!(unit.metadata["title"], "Annual Leave Policy");
            assert_eq!(unit.metadata[DOCUMENT_ID_KEY], report.document_id.to_string());
            assert!(unit.text.chars().count() <= 200);
        }
    }

    #[tokio::test]
    async fn test_provenance_not_shadowed_by_document_fields() {
        let store = Arc::new(CountingStore::new());
        let indexer = indexer(ScriptedOcr::new(), ScriptedLlm::new(), store);

        let metadata = DocumentMetadata {
            title: "file_name".to_string(),
            ..DocumentMetadata::fallback()
        };
        let pages = vec![PageRecord::new(7, "Some text.")];
        let units = indexer.build_units(&pages, "x.pdf", &metadata, Uuid::new_v4());

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].file_name(), Some("x.pdf"));
        assert_eq!(units[0].page_number(), Some(7));
        assert_eq!(units[0].metadata[CHUNK_INDEX_KEY], 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_index_failure() {
        let store = Arc::new(CountingStore::failing());
        let indexer = indexer(ScriptedOcr::new(), ScriptedLlm::new(), store.clone());

        let result = indexer
            .index_document(&sample_pdf(&["only"]), "one.pdf")
            .await;

        assert!(matches!(result, Err(Error::VectorDb(_))));
        assert_eq!(store.upsert_calls(), 1);
    }

    #[tokio::test]
    async fn test_garbage_metadata_still_indexes() {
        let store = Arc::new(CountingStore::new());
        let llm = ScriptedLlm::new().respond_to("Classify", "no idea, sorry");
        let indexer = indexer(ScriptedOcr::new(), llm, store.clone());

        let report = indexer
            .index_document(&sample_pdf(&["only"]), "one.pdf")
            .await
            .unwrap();

        assert!(report.metadata.is_fallback());
        assert_eq!(store.units()[0].metadata["title"], "N/A");
    }
}
