//! LLM document classification with a fixed fallback
//!
//! `extract` never fails: an LLM error, unparseable output, or a non-object
//! JSON value all yield `DocumentMetadata::fallback()`.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};

use crate::generation::prompt::{PromptBuilder, MAX_TITLE_WORDS};
use crate::providers::LlmProvider;
use crate::types::document::UNKNOWN_TITLE;
use crate::types::{Category, DocType, DocumentMetadata, DocumentStatus};

/// Classifies a document from a bounded text sample
pub struct MetadataExtractor {
    llm: Arc<dyn LlmProvider>,
    max_chars: usize,
}

/// Outcome of parsing the classifier's raw output
#[derive(Debug, PartialEq)]
enum Parsed {
    Metadata(DocumentMetadata),
    NotJson,
    NotObject,
}

impl MetadataExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>, max_chars: usize) -> Self {
        Self { llm, max_chars }
    }

    /// Classify a document from its sample text
    pub async fn extract(&self, sample: &str) -> DocumentMetadata {
        let sample = truncate_chars(sample.trim(), self.max_chars);
        if sample.is_empty() {
            tracing::warn!("Empty metadata sample, using fallback");
            return DocumentMetadata::fallback();
        }

        let prompt = PromptBuilder::build_metadata_prompt(sample);
        let raw = match self.llm.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Metadata extraction LLM call failed: {}, using fallback", e);
                return DocumentMetadata::fallback();
            }
        };

        match parse_metadata(&raw) {
            Parsed::Metadata(metadata) => {
                tracing::info!(
                    "Extracted metadata: {} / {} / {} - {}",
                    metadata.doc_type,
                    metadata.category,
                    metadata.status,
                    metadata.title
                );
                metadata
            }
            Parsed::NotJson => {
                tracing::warn!("Metadata output is not JSON, using fallback");
                tracing::debug!("Raw metadata output: {}", raw);
                DocumentMetadata::fallback()
            }
            Parsed::NotObject => {
                tracing::warn!("Metadata output is not a JSON object, using fallback");
                DocumentMetadata::fallback()
            }
        }
    }
}

/// Longest prefix of at most `max_chars` characters
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// A whole reply wrapped in a Markdown code fence, with an optional info string
fn code_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\n?(.*?)\s*```$").expect("Invalid regex")
    })
}

/// Remove a surrounding markdown code fence (```json ... ```)
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    code_fence()
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |body| body.as_str().trim())
}

fn parse_metadata(raw: &str) -> Parsed {
    let cleaned = strip_code_fence(raw);

    let value = match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => value,
        // Tolerate prose around a single object
        Err(_) => match (cleaned.find('{'), cleaned.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                match serde_json::from_str::<Value>(&cleaned[start..=end]) {
                    Ok(value) => value,
                    Err(_) => return Parsed::NotJson,
                }
            }
            _ => return Parsed::NotJson,
        },
    };

    match value {
        Value::Object(map) => Parsed::Metadata(normalize(&map)),
        _ => Parsed::NotObject,
    }
}

fn field<'a>(map: &'a Map<String, Value>, key: &str) -> &'a str {
    map.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Map free-form labels onto the taxonomy and bound the title
fn normalize(map: &Map<String, Value>) -> DocumentMetadata {
    let words: Vec<&str> = field(map, "title").split_whitespace().collect();
    let title = if words.is_empty() {
        UNKNOWN_TITLE.to_string()
    } else {
        words
            .into_iter()
            .take(MAX_TITLE_WORDS)
            .collect::<Vec<_>>()
            .join(" ")
    };

    DocumentMetadata {
        doc_type: DocType::from_label(field(map, "doc_type")),
        category: Category::from_label(field(map, "category")),
        status: DocumentStatus::from_label(field(map, "status")),
        title,
    }
}
