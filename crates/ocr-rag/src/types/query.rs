//! Request types

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Stateless question against the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }
}

/// Question within a conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The latest user question
    pub question: String,
    /// Caller-chosen conversation key
    pub session_id: String,
}

impl ChatRequest {
    pub fn new(session_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            session_id: session_id.into(),
        }
    }
}

/// Trim a question and reject it if nothing is left
pub fn normalize_question(question: &str) -> Result<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_input("question must not be empty"));
    }
    Ok(trimmed)
}
