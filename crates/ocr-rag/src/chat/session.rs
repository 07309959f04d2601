//! Process-wide session histories
//!
//! Each session id maps to its own async mutex. A conversation turn holds the
//! lock from condensation to commit, so turns of one session are serialized
//! while different sessions proceed independently.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::memory::ChatMessage;

/// Shared handle to one session's history
pub type SessionHandle = Arc<Mutex<Vec<ChatMessage>>>;

/// Volatile, concurrency-safe map of session histories
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, SessionHandle>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for a session, created empty on first use
    pub fn handle(&self, session_id: &str) -> SessionHandle {
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Snapshot of a session's history (empty for unknown sessions)
    pub async fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        let handle = match self.sessions.get(session_id) {
            Some(entry) => entry.value().clone(),
            None => return Vec::new(),
        };
        let history = handle.lock().await;
        history.clone()
    }

    /// Forget a session; returns whether it existed
    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every session
    pub fn clear(&self) {
        self.sessions.clear();
    }
}
