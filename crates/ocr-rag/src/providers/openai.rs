//! OpenAI-compatible LLM and embedding clients with retry logic

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;
use super::{http_client, join_url};

/// Retry an operation with exponential backoff (1s, 2s, 4s, ...)
pub(crate) async fn retry_request<F, Fut, T>(max_retries: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..=max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt < max_retries {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt + 1,
                        max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::internal("retry loop ran zero attempts")))
}

fn with_bearer(request: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) => request.bearer_auth(key),
        None => request,
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// `/chat/completions` response envelope
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice, if any
    pub fn into_content(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.message.content)
    }
}

/// LLM client for any OpenAI-compatible chat completions server
pub struct OpenAiCompatLlm {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
}

impl OpenAiCompatLlm {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(config.timeout_secs))?,
            url: join_url(&config.base_url, "chat/completions"),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }

    async fn complete_once(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = with_bearer(self.client.post(&self.url), self.api_key.as_deref())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("LLM request to {}", self.url))
                } else {
                    Error::llm(format!("Completion request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::llm(format!(
                "Completion failed: HTTP {} - {}",
                status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Failed to parse completion response: {}", e)))?;

        chat.into_content()
            .ok_or_else(|| Error::llm("Completion response has no content"))
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        tracing::debug!("Completing {} prompt chars with {}", prompt.len(), self.model);
        retry_request(self.max_retries, || self.complete_once(prompt)).await
    }

    async fn health_check(&self) -> Result<bool> {
        let url = self.url.replace("chat/completions", "models");
        match with_bearer(self.client.get(&url), self.api_key.as_deref())
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "openai-compat"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

/// Embedding client for OpenAI-compatible `/embeddings` servers
pub struct OpenAiCompatEmbedder {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
    batch_size: usize,
    max_retries: u32,
}

impl OpenAiCompatEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(config.timeout_secs))?,
            url: join_url(&config.base_url, "embeddings"),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
            max_retries: 2,
        })
    }

    async fn embed_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = with_bearer(self.client.post(&self.url), self.api_key.as_deref())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::embedding(format!(
                "Embedding failed: HTTP {} - {}",
                status, body
            )));
        }

        let mut parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

        if parsed.data.len() != texts.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));

        parsed
            .data
            .into_iter()
            .map(|d| {
                if d.embedding.len() == self.dimensions {
                    Ok(d.embedding)
                } else {
                    Err(Error::embedding(format!(
                        "Expected {} dimensions, got {}",
                        self.dimensions,
                        d.embedding.len()
                    )))
                }
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        self.embed_batch(&texts)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vectors = retry_request(self.max_retries, || self.embed_request(batch)).await?;
            embeddings.extend(vectors);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.embed("health").await.is_ok())
    }

    fn name(&self) -> &str {
        "openai-compat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_http;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn llm_config(base_url: String, max_retries: u32) -> LlmConfig {
        LlmConfig {
            base_url,
            api_key: Some("sk-test".to_string()),
            max_retries,
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn test_complete_sends_single_user_message() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["messages"].as_array().map(|m| m.len()), Some(1));
                assert_eq!(body["messages"][0]["role"], "user");
                let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
                Json(json!({
                    "choices": [{"message": {"role": "assistant", "content": format!("echo: {}", prompt)}}]
                }))
            }),
        );
        let base = spawn_http(router).await;

        let llm = OpenAiCompatLlm::new(&llm_config(format!("{}/v1", base), 0)).unwrap();
        let answer = llm.complete("hello").await.unwrap();

        assert_eq!(answer, "echo: hello");
    }

    #[tokio::test]
    async fn test_complete_error_status() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = spawn_http(router).await;

        let llm = OpenAiCompatLlm::new(&llm_config(format!("{}/v1", base), 0)).unwrap();
        let err = llm.complete("hello").await.unwrap_err();

        assert!(matches!(err, Error::Llm(_)));
    }

    #[tokio::test]
    async fn test_complete_retries_after_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let router = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})))
                    } else {
                        (
                            StatusCode::OK,
                            Json(json!({"choices": [{"message": {"content": "ok"}}]})),
                        )
                    }
                }
            }),
        );
        let base = spawn_http(router).await;

        let llm = OpenAiCompatLlm::new(&llm_config(format!("{}/v1", base), 1)).unwrap();

        assert_eq!(llm.complete("hi").await.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_embed_batch_splits_and_orders() {
        let router = Router::new().route(
            "/embeddings",
            post(|Json(body): Json<Value>| async move {
                let inputs = body["input"].as_array().cloned().unwrap_or_default();
                assert!(inputs.len() <= 2);
                // Reverse order with explicit indices
                let data: Vec<Value> = inputs
                    .iter()
                    .enumerate()
                    .rev()
                    .map(|(i, text)| {
                        let len = text.as_str().map(|s| s.len()).unwrap_or(0) as f32;
                        json!({"index": i, "embedding": [len, 1.0, 0.0]})
                    })
                    .collect();
                Json(json!({ "data": data }))
            }),
        );
        let base = spawn_http(router).await;

        let config = EmbeddingConfig {
            base_url: base,
            dimensions: 3,
            batch_size: 2,
            ..EmbeddingConfig::default()
        };
        let embedder = OpenAiCompatEmbedder::new(&config).unwrap();
        let texts: Vec<String> = ["a", "bb", "ccc"].iter().map(|s| s.to_string()).collect();

        let vectors = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0][0], 1.0);
        assert_eq!(vectors[1][0], 2.0);
        assert_eq!(vectors[2][0], 3.0);
    }

    #[tokio::test]
    async fn test_embed_rejects_wrong_dimensions() {
        let router = Router::new().route(
            "/embeddings",
            post(|| async { Json(json!({"data": [{"index": 0, "embedding": [1.0, 2.0]}]})) }),
        );
        let base = spawn_http(router).await;

        let config = EmbeddingConfig {
            base_url: base,
            dimensions: 3,
            ..EmbeddingConfig::default()
        };
        let mut embedder = OpenAiCompatEmbedder::new(&config).unwrap();
        embedder.max_retries = 0;

        assert!(matches!(
            embedder.embed("x").await,
            Err(Error::Embedding(_))
        ));
    }
}
