//! Application state for the RAG server

use std::sync::Arc;

use crate::service::RagService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Indexing, query, and chat service
    service: Arc<RagService>,
}

impl AppState {
    /// Create application state around an already built service
    pub fn new(service: Arc<RagService>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { service }),
        }
    }

    /// Get the service
    pub fn service(&self) -> &Arc<RagService> {
        &self.inner.service
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        self.inner.service.is_ready()
    }
}
