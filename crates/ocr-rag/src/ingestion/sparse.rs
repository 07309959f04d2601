//! Hashed lexical sparse vectors for hybrid search
//!
//! Terms are lower-cased Unicode words. Scripts written without spaces (Thai,
//! Lao, Khmer, kana and CJK ideographs) segment into single letters, so runs in
//! those scripts contribute overlapping bigrams of adjacent segments instead.
//! Each term maps to a stable index (the
//! first four bytes of its SHA-256 digest), so indices agree across processes
//! and restarts. Document weights use BM25 term-frequency saturation; the
//! store applies IDF at query time. Query terms get unit weight.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use unicode_segmentation::UnicodeSegmentation;

use crate::types::SparseVector;

/// BM25 term-frequency saturation
const BM25_K1: f32 = 1.2;
/// BM25 length normalization
const BM25_B: f32 = 0.75;
/// Expected unit length in terms, used for length normalization
const AVG_DOC_TERMS: f32 = 150.0;

/// Encodes text into sparse lexical vectors
#[derive(Debug, Clone, Default)]
pub struct SparseEncoder;

impl SparseEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Stable index for a (lower-cased) term
    pub fn term_index(term: &str) -> u32 {
        let digest = Sha256::digest(term.as_bytes());
        u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
    }

    fn term_counts(text: &str) -> (BTreeMap<u32, u32>, usize) {
        let mut counts = BTreeMap::new();
        let mut total = 0usize;
        let mut add = |term: &str| {
            *counts.entry(Self::term_index(term)).or_insert(0) += 1;
            total += 1;
        };

        let mut run: Vec<&str> = Vec::new();
        for segment in text.split_word_bounds() {
            if !segment.chars().any(char::is_alphanumeric) {
                flush_run(&mut run, &mut add);
            } else if segment.chars().all(is_unsegmented) {
                run.push(segment);
            } else {
                flush_run(&mut run, &mut add);
                add(segment.to_lowercase().as_str());
            }
        }
        flush_run(&mut run, &mut add);
        (counts, total)
    }

    /// Sparse vector for an indexed unit
    pub fn encode_document(&self, text: &str) -> SparseVector {
        let (counts, total) = Self::term_counts(text);
        let length_norm = 1.0 - BM25_B + BM25_B * (total as f32 / AVG_DOC_TERMS);

        let mut vector = SparseVector::default();
        for (index, tf) in counts {
            let tf = tf as f32;
            vector.indices.push(index);
            vector
                .values
                .push(tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * length_norm));
        }
        vector
    }

    /// Sparse vector for a query: each distinct term weighs 1.0
    pub fn encode_query(&self, text: &str) -> SparseVector {
        let (counts, _) = Self::term_counts(text);
        SparseVector {
            values: vec![1.0; counts.len()],
            indices: counts.into_keys().collect(),
        }
    }
}

/// Characters of scripts that do not separate words with spaces
fn is_unsegmented(c: char) -> bool {
    matches!(
        c,
        '\u{0E00}'..='\u{0EFF}'
            | '\u{1780}'..='\u{17FF}'
            | '\u{3040}'..='\u{30FF}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{4E00}'..='\u{9FFF}'
    )
}

/// Emit a run of unsegmented-script segments as bigrams (a lone segment as itself)
fn flush_run(run: &mut Vec<&str>, add: &mut impl FnMut(&str)) {
    match run.len() {
        0 => {}
        1 => add(run[0]),
        _ => {
            for pair in run.windows(2) {
                add(pair.concat().as_str());
            }
        }
    }
    run.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_case_insensitive_and_stable() {
        assert_eq!(
            SparseEncoder::term_index("invoice"),
            SparseEncoder::term_index("invoice")
        );
        let encoder = SparseEncoder::new();
        assert_eq!(
            encoder.encode_query("Invoice").indices,
            encoder.encode_query("invoice").indices
        );
    }

    #[test]
    fn test_document_weights_saturate() {
        let encoder = SparseEncoder::new();
        let once = encoder.encode_document("due");
        let many = encoder.encode_document("due due due due due due");

        assert_eq!(once.len(), 1);
        assert_eq!(many.len(), 1);
        assert!(many.values[0] > once.values[0]);
        assert!(many.values[0] < BM25_K1 + 1.0);
    }

    #[test]
    fn test_query_matches_document_terms() {
        let encoder = SparseEncoder::new();
        let doc = encoder.encode_document("Invoice #123, Due 2024-01-01");
        let query = encoder.encode_query("What is the due date?");
        let unrelated = encoder.encode_query("quarterly revenue");

        assert!(query.dot(&doc) > 0.0);
        assert_eq!(unrelated.dot(&doc), 0.0);
    }

    #[test]
    fn test_empty_text() {
        let encoder = SparseEncoder::new();
        assert!(encoder.encode_document("  ").is_empty());
        assert!(encoder.encode_query("?!").is_empty());
    }

    #[test]
    fn test_thai_terms_are_bigrams() {
        let encoder = SparseEncoder::new();
        let query = encoder.encode_query("ใบแจ้งหนี้");
        let invoice = encoder.encode_document("ใบแจ้งหนี้เลขที่ 123");
        let letter = encoder.encode_document("หนังสือบริษัท");

        assert_eq!(query.len(), 6);
        assert!(query.indices.contains(&SparseEncoder::term_index("ใบ")));
        assert!(query.dot(&invoice) > 0.0);
        assert_eq!(query.dot(&letter), 0.0);
    }

    #[test]
    fn test_mixed_script_text() {
        let encoder = SparseEncoder::new();
        let doc = encoder.encode_document("Invoice ใบแจ้งหนี้ total 500");

        assert!(encoder.encode_query("invoice").dot(&doc) > 0.0);
        assert!(encoder.encode_query("TOTAL").dot(&doc) > 0.0);
        assert!(encoder.encode_query("แจ้งหนี้").dot(&doc) > 0.0);
    }
}
