//! Condense-question chat engine
//!
//! Each turn: load the session, take the token-bounded window of history,
//! condense the follow-up into a standalone question, answer it with the
//! query engine, and only then commit the turn to history.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::LlmProvider;
use crate::retrieval::QueryEngine;
use crate::types::query::normalize_question;
use crate::types::QueryResponse;

use super::memory::{ChatMemoryBuffer, ChatMessage};
use super::session::SessionStore;

/// Drives the query engine with per-session conversational memory
pub struct ConversationManager {
    engine: Arc<QueryEngine>,
    llm: Arc<dyn LlmProvider>,
    memory: ChatMemoryBuffer,
    sessions: SessionStore,
}

impl ConversationManager {
    pub fn new(engine: Arc<QueryEngine>, llm: Arc<dyn LlmProvider>, token_limit: usize) -> Self {
        Self {
            engine,
            llm,
            memory: ChatMemoryBuffer::new(token_limit),
            sessions: SessionStore::new(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Answer one turn of a conversation
    pub async fn chat(&self, session_id: &str, question: &str) -> Result<QueryResponse> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(Error::invalid_input("session_id must not be empty"));
        }
        let question = normalize_question(question)?;

        let handle = self.sessions.handle(session_id);
        // Held until commit: one in-flight turn per session
        let mut history = handle.lock().await;

        let window = self.memory.window(&history);
        let standalone = if window.is_empty() {
            question.to_string()
        } else {
            self.condense(window, question).await?
        };
        tracing::debug!(
            "[session {}] {} history messages, standalone question: {}",
            session_id,
            window.len(),
            standalone
        );

        let response = self.engine.query(&standalone).await?;

        history.push(ChatMessage::user(question));
        history.push(ChatMessage::assistant(response.answer.clone()));
        tracing::info!(
            "[session {}] Turn committed ({} messages)",
            session_id,
            history.len()
        );

        Ok(response)
    }

    /// Rewrite a follow-up as a standalone question
    async fn condense(&self, window: &[ChatMessage], question: &str) -> Result<String> {
        let prompt =
            PromptBuilder::build_condense_prompt(&PromptBuilder::format_history(window), question);
        let condensed = self.llm.complete(&prompt).await?;
        let condensed = condensed.trim();

        if condensed.is_empty() {
            tracing::warn!("Condensation returned nothing, using the question as asked");
            return Ok(question.to_string());
        }
        Ok(condensed.to_string())
    }
}
