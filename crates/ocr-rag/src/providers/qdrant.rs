//! Qdrant vector store over its REST API
//!
//! The collection carries a named dense vector (`dense`, cosine distance) and a
//! named sparse vector (`sparse`, IDF modifier). Hybrid search uses the Query
//! API: one prefetch per vector, fused server-side with reciprocal-rank fusion.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::types::{IndexableUnit, SparseVector};

use super::vector_store::{HybridQuery, VectorSearchResult, VectorStoreProvider};
use super::{http_client, join_url};

const DENSE_VECTOR: &str = "dense";
const SPARSE_VECTOR: &str = "sparse";

/// Qdrant REST client bound to one collection
pub struct QdrantStore {
    client: Client,
    url: String,
    api_key: Option<String>,
    collection: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct Point<'a> {
    id: String,
    vector: PointVectors<'a>,
    payload: Payload<'a>,
}

#[derive(Serialize)]
struct PointVectors<'a> {
    dense: &'a [f32],
    #[serde(skip_serializing_if = "no_terms")]
    sparse: &'a SparseVector,
}

fn no_terms(sparse: &&SparseVector) -> bool {
    sparse.is_empty()
}

#[derive(Serialize)]
struct Payload<'a> {
    text: &'a str,
    metadata: &'a HashMap<String, Value>,
}

#[derive(Deserialize)]
struct StoredPayload {
    text: String,
    #[serde(default)]
    metadata: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct ExistsResult {
    exists: bool,
}

#[derive(Deserialize)]
struct CountResult {
    count: usize,
}

#[derive(Deserialize)]
struct QueryResult {
    points: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Value>,
}

impl QdrantStore {
    pub fn new(config: &VectorDbConfig, dimensions: usize) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(config.timeout_secs))?,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            collection: config.collection.clone(),
            dimensions,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = join_url(&self.url, path);
        let request = self.client.request(method, url);
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    fn collection_path(&self, suffix: &str) -> String {
        format!("collections/{}{}", self.collection, suffix)
    }

    async fn send<T>(&self, request: RequestBuilder, action: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("{} request failed: {}", action, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!(
                "{} failed: HTTP {} - {}",
                action, status, body
            )));
        }

        let parsed: QdrantResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse {} response: {}", action, e)))?;

        Ok(parsed.result)
    }

    fn create_collection_body(&self) -> Value {
        json!({
            "vectors": {
                "dense": { "size": self.dimensions, "distance": "Cosine" }
            },
            "sparse_vectors": {
                "sparse": { "modifier": "idf" }
            }
        })
    }

    fn query_body(query: &HybridQuery) -> Value {
        let mut prefetch = vec![json!({
            "query": query.dense,
            "using": DENSE_VECTOR,
            "limit": query.limit,
        })];
        if !query.sparse.is_empty() {
            prefetch.push(json!({
                "query": { "indices": query.sparse.indices, "values": query.sparse.values },
                "using": SPARSE_VECTOR,
                "limit": query.limit,
            }));
        }

        json!({
            "prefetch": prefetch,
            "query": { "fusion": "rrf" },
            "limit": query.limit,
            "with_payload": true,
        })
    }
}

fn point_to_result(point: ScoredPoint) -> Result<VectorSearchResult> {
    let id = match &point.id {
        Value::String(s) => Uuid::parse_str(s)
            .map_err(|e| Error::vector_db(format!("Invalid point id {}: {}", s, e)))?,
        other => {
            return Err(Error::vector_db(format!(
                "Unexpected point id {} (units use UUIDs)",
                other
            )))
        }
    };

    let payload = point
        .payload
        .ok_or_else(|| Error::vector_db(format!("Point {} returned without payload", id)))?;
    let payload: StoredPayload = serde_json::from_value(payload)
        .map_err(|e| Error::vector_db(format!("Malformed payload on point {}: {}", id, e)))?;

    let mut unit = IndexableUnit::new(payload.text, payload.metadata);
    unit.id = id;

    Ok(VectorSearchResult {
        unit,
        similarity: point.score,
    })
}

#[async_trait]
impl VectorStoreProvider for QdrantStore {
    async fn ensure_collection(&self) -> Result<()> {
        let exists: ExistsResult = self
            .send(
                self.request(Method::GET, &self.collection_path("/exists")),
                "Collection exists",
            )
            .await?;

        if exists.exists {
            tracing::debug!("Qdrant collection '{}' already exists", self.collection);
            return Ok(());
        }

        let _: Value = self
            .send(
                self.request(Method::PUT, &self.collection_path(""))
                    .json(&self.create_collection_body()),
                "Create collection",
            )
            .await?;

        tracing::info!(
            "Created Qdrant collection '{}' (dense {}d + sparse)",
            self.collection,
            self.dimensions
        );
        Ok(())
    }

    async fn upsert(&self, units: &[IndexableUnit]) -> Result<()> {
        if units.is_empty() {
            return Ok(());
        }

        let mut points = Vec::with_capacity(units.len());
        for unit in units {
            if unit.dense.len() != self.dimensions {
                return Err(Error::vector_db(format!(
                    "Unit {} has {} dense dimensions, collection expects {}",
                    unit.id,
                    unit.dense.len(),
                    self.dimensions
                )));
            }
            points.push(Point {
                id: unit.id.to_string(),
                vector: PointVectors {
                    dense: &unit.dense,
                    sparse: &unit.sparse,
                },
                payload: Payload {
                    text: &unit.text,
                    metadata: &unit.metadata,
                },
            });
        }

        let _: Value = self
            .send(
                self.request(Method::PUT, &self.collection_path("/points?wait=true"))
                    .json(&json!({ "points": points })),
                "Upsert",
            )
            .await?;

        tracing::debug!("Upserted {} points into '{}'", units.len(), self.collection);
        Ok(())
    }

    async fn hybrid_search(&self, query: &HybridQuery) -> Result<Vec<VectorSearchResult>> {
        let result: QueryResult = self
            .send(
                self.request(Method::POST, &self.collection_path("/points/query"))
                    .json(&Self::query_body(query)),
                "Query",
            )
            .await?;

        result.points.into_iter().map(point_to_result).collect()
    }

    async fn len(&self) -> Result<usize> {
        let result: CountResult = self
            .send(
                self.request(Method::POST, &self.collection_path("/points/count"))
                    .json(&json!({ "exact": true })),
                "Count",
            )
            .await?;
        Ok(result.count)
    }

    async fn health_check(&self) -> Result<bool> {
        match self.request(Method::GET, "healthz").send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}
