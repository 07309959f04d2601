//! Stateless query endpoint

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::service::ComponentHealth;
use crate::types::{QueryRequest, QueryResponse};

/// POST /api/query - Answer a question from the indexed documents
pub async fn query_documents(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();

    tracing::info!("Query: \"{}\"", request.question);

    let response = state.service().answer_query(&request.question).await?;

    tracing::info!(
        "Query answered in {:?} with {} sources",
        start.elapsed(),
        response.source_nodes.len()
    );

    Ok(Json(response))
}

/// GET /api/health - Check external components
pub async fn component_health(State(state): State<AppState>) -> Json<Vec<ComponentHealth>> {
    Json(state.service().health().await)
}
