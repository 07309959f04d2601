//! API routes for the RAG server

pub mod chat;
pub mod query;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Upload with a larger body limit for PDFs
        .route(
            "/upload",
            post(upload::upload_document).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/query", post(query::query_documents))
        .route("/chat", post(chat::chat))
        .route("/sessions/:id", delete(chat::clear_session))
        .route("/health", get(query::component_health))
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "ocr-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "OCR-based RAG over PDF documents with page-level citations",
        "endpoints": {
            "POST /api/upload": "Upload a PDF (multipart field `file`) for OCR and indexing",
            "POST /api/query": "Stateless question answering with source nodes",
            "POST /api/chat": "Conversational question answering keyed by session_id",
            "DELETE /api/sessions/:id": "Forget a chat session",
            "GET /api/health": "Health of external components"
        }
    }))
}
