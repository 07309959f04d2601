//! Sentence-aware text chunking with a hard size bound
//!
//! Sizes are measured in characters. Text is split on sentence boundaries;
//! a sentence longer than the bound is split on word boundaries, and a single
//! word longer than the bound is split on characters. Consecutive chunks share
//! up to `overlap` trailing characters, reduced when needed so that no chunk
//! exceeds `chunk_size`.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    overlap: usize,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl TextChunker {
    /// Create a new chunker. `overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split page text into ordered, overlapping chunks of at most `chunk_size` characters
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for piece in self.pieces(text) {
            let piece_len = char_len(piece);

            if current_len > 0 && current_len + piece_len > self.chunk_size {
                Self::push_chunk(&mut chunks, &current);

                // Overlap must leave room for the incoming piece
                let budget = self.overlap.min(self.chunk_size - piece_len);
                current = Self::overlap_text(&current, budget);
                current_len = char_len(&current);
            }

            current.push_str(piece);
            current_len += piece_len;
        }

        Self::push_chunk(&mut chunks, &current);
        chunks
    }

    fn push_chunk(chunks: &mut Vec<String>, text: &str) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
    }

    /// Sentence pieces, each at most `chunk_size` characters
    fn pieces<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut pieces = Vec::new();
        for sentence in text.split_sentence_bounds() {
            if char_len(sentence) <= self.chunk_size {
                pieces.push(sentence);
            } else {
                self.split_oversized(sentence, &mut pieces);
            }
        }
        pieces
    }

    /// Split an over-long sentence on word boundaries
    fn split_oversized<'a>(&self, sentence: &'a str, out: &mut Vec<&'a str>) {
        let mut start = 0usize;
        let mut len = 0usize;

        for (idx, word) in sentence.split_word_bound_indices() {
            let word_len = char_len(word);

            if word_len > self.chunk_size {
                if len > 0 {
                    out.push(&sentence[start..idx]);
                }
                self.split_chars(word, out);
                start = idx + word.len();
                len = 0;
                continue;
            }

            if len + word_len > self.chunk_size {
                out.push(&sentence[start..idx]);
                start = idx;
                len = 0;
            }
            len += word_len;
        }

        if len > 0 {
            out.push(&sentence[start..]);
        }
    }

    /// Last resort for a single word longer than the bound
    fn split_chars<'a>(&self, word: &'a str, out: &mut Vec<&'a str>) {
        let mut start = 0usize;
        for (count, (idx, _)) in word.char_indices().enumerate() {
            if count > 0 && count % self.chunk_size == 0 {
                out.push(&word[start..idx]);
                start = idx;
            }
        }
        out.push(&word[start..]);
    }

    /// Up to `budget` trailing characters, starting at a word boundary when possible
    fn overlap_text(text: &str, budget: usize) -> String {
        if budget == 0 {
            return String::new();
        }

        let total = char_len(text);
        if total <= budget {
            return text.to_string();
        }

        let start = text
            .char_indices()
            .nth(total - budget)
            .map(|(i, _)| i)
            .unwrap_or(0);
        let tail = &text[start..];

        match tail.find(char::is_whitespace) {
            Some(pos) if !tail[pos..].trim().is_empty() => tail[pos..].trim_start().to_string(),
            _ => tail.to_string(),
        }
    }
}
