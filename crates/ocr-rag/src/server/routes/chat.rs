//! Conversational query endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{ChatRequest, QueryResponse};

/// POST /api/chat - Answer a question in the context of a session
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<QueryResponse>> {
    tracing::info!("Chat [{}]: \"{}\"", request.session_id, request.question);

    let response = state
        .service()
        .answer_chat(&request.session_id, &request.question)
        .await?;

    Ok(Json(response))
}

/// DELETE /api/sessions/:id - Forget a session's history
pub async fn clear_session(State(state): State<AppState>, Path(id): Path<String>) -> Json<Value> {
    let cleared = state.service().clear_session(&id);
    tracing::info!("Session {} cleared: {}", id, cleared);
    Json(json!({ "cleared": cleared }))
}
