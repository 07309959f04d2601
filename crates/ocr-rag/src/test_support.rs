//! Shared test doubles for the pipeline and server tests

use async_trait::async_trait;
use axum::Router;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::ingestion::{validate_pdf, PageImage, Rasterizer, SparseEncoder};
use crate::providers::{
    EmbeddingProvider, HybridQuery, InMemoryVectorStore, LlmProvider, PageOcr, Reranker,
    VectorSearchResult, VectorStoreProvider,
};
use crate::service::{Collaborators, RagService};
use crate::types::document::{FILE_NAME_KEY, PAGE_NUMBER_KEY};
use crate::types::IndexableUnit;

/// Serve a router on an ephemeral local port and return its base URL
pub(crate) async fn spawn_http(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A valid PDF with one page per entry, each page showing its text
pub(crate) fn sample_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// One-page PDF showing `text`
pub(crate) fn pdf_with_text(text: &str) -> Vec<u8> {
    sample_pdf(&[text])
}

/// Rasterizer that emits one placeholder image per PDF page
#[derive(Default)]
pub(crate) struct FakeRasterizer {
    drop_last: bool,
    calls: AtomicUsize,
}

impl FakeRasterizer {
    /// Emits one image fewer than the PDF has pages
    pub(crate) fn dropping_last() -> Self {
        Self {
            drop_last: true,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<PageImage>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let pages = validate_pdf(pdf)? as u32;
        let produced = if self.drop_last { pages - 1 } else { pages };

        Ok((1..=produced)
            .map(|page_number| PageImage {
                page_number,
                png: format!("page-{}", page_number).into_bytes(),
            })
            .collect())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

#[derive(Default)]
struct OcrScript {
    texts: HashMap<u32, String>,
    delays: HashMap<u32, Duration>,
    failing: HashSet<u32>,
}

/// Page OCR with per-page scripted text, delays, and failures
///
/// Clones share the script and the call counter.
#[derive(Clone, Default)]
pub(crate) struct ScriptedOcr {
    script: Arc<Mutex<OcrScript>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedOcr {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_text(self, page: u32, text: impl Into<String>) -> Self {
        self.script.lock().texts.insert(page, text.into());
        self
    }

    pub(crate) fn with_delay(self, page: u32, delay: Duration) -> Self {
        self.script.lock().delays.insert(page, delay);
        self
    }

    pub(crate) fn failing(self, page: u32) -> Self {
        self.script.lock().failing.insert(page);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageOcr for ScriptedOcr {
    async fn recognize(&self, page_number: u32, _png: &[u8]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (delay, fails, text) = {
            let script = self.script.lock();
            (
                script.delays.get(&page_number).copied(),
                script.failing.contains(&page_number),
                script.texts.get(&page_number).cloned(),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fails {
            return Err(Error::ocr(page_number, "scripted failure"));
        }
        Ok(text.unwrap_or_else(|| format!("text of page {}", page_number)))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Default completion when no rule matches
pub(crate) const SCRIPTED_ANSWER: &str = "Scripted answer.";

#[derive(Default)]
struct LlmScript {
    /// (needle, response); `None` fails the call
    rules: Vec<(String, Option<String>)>,
    prompts: Vec<String>,
}

/// LLM that answers by the first rule whose needle appears in the prompt
///
/// Clones share the rules and the prompt log.
#[derive(Clone, Default)]
pub(crate) struct ScriptedLlm {
    script: Arc<Mutex<LlmScript>>,
}

impl ScriptedLlm {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond_to(self, needle: &str, response: &str) -> Self {
        self.script
            .lock()
            .rules
            .push((needle.to_string(), Some(response.to_string())));
        self
    }

    pub(crate) fn failing_on(self, needle: &str) -> Self {
        self.script.lock().rules.push((needle.to_string(), None));
        self
    }

    /// Every prompt received, oldest first
    pub(crate) fn prompts(&self) -> Vec<String> {
        self.script.lock().prompts.clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut script = self.script.lock();
        script.prompts.push(prompt.to_string());

        let rule = script
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(needle, response)| (needle.clone(), response.clone()));

        match rule {
            Some((_, Some(response))) => Ok(response),
            Some((needle, None)) => Err(Error::llm(format!("scripted failure on {:?}", needle))),
            None => Ok(SCRIPTED_ANSWER.to_string()),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

/// Deterministic bag-of-words embedder
pub(crate) struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub(crate) fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        for word in text.unicode_words() {
            let slot = SparseEncoder::term_index(&word.to_lowercase()) as usize % self.dims;
            vector[slot] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Scores a passage by the share of query words it contains
pub(crate) struct OverlapReranker;

fn words(text: &str) -> HashSet<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

#[async_trait]
impl Reranker for OverlapReranker {
    async fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        let query = words(query);
        if query.is_empty() {
            return Ok(vec![0.0; passages.len()]);
        }
        Ok(passages
            .iter()
            .map(|passage| {
                let passage = words(passage);
                query.iter().filter(|w| passage.contains(*w)).count() as f32 / query.len() as f32
            })
            .collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "overlap"
    }
}

/// In-memory store that counts upserts and can be told to fail them
#[derive(Default)]
pub(crate) struct CountingStore {
    inner: InMemoryVectorStore,
    fail: bool,
    upserts: AtomicUsize,
}

impl CountingStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every upsert returns a vector db error
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub(crate) fn units(&self) -> Vec<IndexableUnit> {
        self.inner.units()
    }
}

#[async_trait]
impl VectorStoreProvider for CountingStore {
    async fn ensure_collection(&self) -> Result<()> {
        self.inner.ensure_collection().await
    }

    async fn upsert(&self, units: &[IndexableUnit]) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::vector_db("scripted upsert failure"));
        }
        self.inner.upsert(units).await
    }

    async fn hybrid_search(&self, query: &HybridQuery) -> Result<Vec<VectorSearchResult>> {
        self.inner.hybrid_search(query).await
    }

    async fn len(&self) -> Result<usize> {
        self.inner.len().await
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Store holding one unit per text; text `i` sits on page `i + 1`
pub(crate) async fn seeded_store(
    file_name: &str,
    texts: &[String],
    dims: usize,
) -> Arc<dyn VectorStoreProvider> {
    let embedder = HashEmbedder::new(dims);
    let sparse = SparseEncoder::new();

    let units: Vec<IndexableUnit> = texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let mut metadata = HashMap::new();
            metadata.insert(FILE_NAME_KEY.to_string(), file_name.into());
            metadata.insert(PAGE_NUMBER_KEY.to_string(), (i as u64 + 1).into());
            let mut unit = IndexableUnit::new(text.clone(), metadata);
            unit.dense = embedder.vector(text);
            unit.sparse = sparse.encode_document(text);
            unit
        })
        .collect();

    let store = InMemoryVectorStore::new();
    store.upsert(&units).await.unwrap();
    Arc::new(store)
}

/// Service over test doubles and a counting in-memory store
pub(crate) fn test_service(ocr: ScriptedOcr, llm: ScriptedLlm) -> (RagService, Arc<CountingStore>) {
    let store = Arc::new(CountingStore::new());
    let mut config = RagConfig::default();
    config.embeddings.dimensions = 32;

    let service = RagService::new(
        &config,
        Collaborators {
            rasterizer: Arc::new(FakeRasterizer::default()),
            ocr: Arc::new(ocr),
            llm: Arc::new(llm),
            embedder: Arc::new(HashEmbedder::new(32)),
            reranker: Arc::new(OverlapReranker),
            store: store.clone(),
        },
    );
    (service, store)
}
