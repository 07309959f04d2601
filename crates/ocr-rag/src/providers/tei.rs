//! Cross-encoder reranker served by text-embeddings-inference (TEI)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::RerankerConfig;
use crate::error::{Error, Result};

use super::reranker::Reranker;
use super::{http_client, join_url};

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
    truncate: bool,
}

#[derive(Deserialize)]
struct RerankHit {
    index: usize,
    score: f32,
}

/// Reranker posting `{query, texts}` to a TEI `/rerank` endpoint
pub struct TeiReranker {
    client: Client,
    base_url: String,
}

impl TeiReranker {
    pub fn new(config: &RerankerConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(config.timeout_secs))?,
            base_url: config.base_url.clone(),
        })
    }
}

/// Map `(index, score)` hits back onto input order
fn scores_in_input_order(hits: Vec<RerankHit>, count: usize) -> Result<Vec<f32>> {
    let mut scores: Vec<Option<f32>> = vec![None; count];
    for hit in hits {
        match scores.get_mut(hit.index) {
            Some(slot) => *slot = Some(hit.score),
            None => {
                return Err(Error::rerank(format!(
                    "Score for index {} but only {} passages sent",
                    hit.index, count
                )))
            }
        }
    }

    scores
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.ok_or_else(|| Error::rerank(format!("No score for passage {}", i))))
        .collect()
}

#[async_trait]
impl Reranker for TeiReranker {
    async fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let url = join_url(&self.base_url, "rerank");
        let request = RerankRequest {
            query,
            texts: passages,
            truncate: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::rerank(format!("Rerank request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::rerank(format!("HTTP {} - {}", status, body)));
        }

        let hits: Vec<RerankHit> = response
            .json()
            .await
            .map_err(|e| Error::rerank(format!("Failed to parse rerank response: {}", e)))?;

        scores_in_input_order(hits, passages.len())
    }

    async fn health_check(&self) -> Result<bool> {
        let url = join_url(&self.base_url, "health");
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "tei"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_http;
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_scores_returned_in_input_order() {
        // TEI returns hits sorted by score, not by index
        let router = Router::new().route(
            "/rerank",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["query"], "due date");
                Json(json!([
                    {"index": 2, "score": 0.9},
                    {"index": 0, "score": 0.5},
                    {"index": 1, "score": 0.1}
                ]))
            }),
        );
        let base = spawn_http(router).await;
        let reranker = TeiReranker::new(&RerankerConfig {
            base_url: base,
            ..RerankerConfig::default()
        })
        .unwrap();

        let passages: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let scores = reranker.score("due date", &passages).await.unwrap();

        assert_eq!(scores, vec![0.5, 0.1, 0.9]);
    }

    #[tokio::test]
    async fn test_empty_passages_skip_request() {
        let reranker = TeiReranker::new(&RerankerConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            ..RerankerConfig::default()
        })
        .unwrap();

        assert!(reranker.score("q", &[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_missing_score_is_error() {
        let hits = vec![RerankHit { index: 0, score: 0.3 }];
        assert!(scores_in_input_order(hits, 2).is_err());

        let hits = vec![RerankHit { index: 5, score: 0.3 }];
        assert!(scores_in_input_order(hits, 2).is_err());
    }
}
