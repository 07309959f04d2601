//! Page OCR adapter for vision-language OCR models (Typhoon OCR)
//!
//! Each page image is sent as a base64 PNG data URL inside an OpenAI-style
//! chat completions envelope. Any failure is reported for that page only.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::Serialize;

use crate::config::OcrConfig;
use crate::error::{Error, Result};

use super::http_client;
use super::openai::ChatResponse;

/// Trait for single-page image-to-text extraction
///
/// Implementations:
/// - `TyphoonOcrClient`: OpenAI-compatible vision endpoint
#[async_trait]
pub trait PageOcr: Send + Sync {
    /// Extract text from one PNG page image.
    ///
    /// Returns `Error::Ocr { page, .. }` for transport failures, non-success
    /// statuses, malformed envelopes, and empty text.
    async fn recognize(&self, page_number: u32, png: &[u8]) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

#[derive(Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    messages: [OcrMessage<'a>; 1],
}

#[derive(Serialize)]
struct OcrMessage<'a> {
    role: &'static str,
    content: [ContentPart<'a>; 2],
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

/// Encode PNG bytes as a `data:` URL
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}

/// OCR client for Typhoon OCR (or any OpenAI-compatible vision model)
pub struct TyphoonOcrClient {
    client: Client,
    endpoint: String,
    model: String,
    prompt: String,
}

impl TyphoonOcrClient {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout())?,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            prompt: config.prompt.clone(),
        })
    }
}

#[async_trait]
impl PageOcr for TyphoonOcrClient {
    async fn recognize(&self, page_number: u32, png: &[u8]) -> Result<String> {
        let request = OcrRequest {
            model: &self.model,
            messages: [OcrMessage {
                role: "user",
                content: [
                    ContentPart::Text { text: &self.prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: png_data_url(png),
                        },
                    },
                ],
            }],
        };

        tracing::debug!(
            "OCR page {} ({} bytes) via {}",
            page_number,
            png.len(),
            self.model
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::ocr(page_number, "request timed out")
                } else {
                    Error::ocr(page_number, format!("request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(Error::ocr(
                page_number,
                format!("HTTP {}", response.status()),
            ));
        }

        let envelope: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::ocr(page_number, format!("malformed response: {}", e)))?;

        let text = envelope
            .into_content()
            .ok_or_else(|| Error::ocr(page_number, "response has no message content"))?;

        if text.trim().is_empty() {
            return Err(Error::ocr(page_number, "empty text"));
        }

        Ok(text)
    }

    fn name(&self) -> &str {
        "typhoon-ocr"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_http;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    fn client_for(base: &str) -> TyphoonOcrClient {
        TyphoonOcrClient::new(&OcrConfig {
            endpoint: format!("{}/v1/chat/completions", base),
            ..OcrConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_png_data_url() {
        assert_eq!(png_data_url(b"abc"), "data:image/png;base64,YWJj");
    }

    #[tokio::test]
    async fn test_recognize_sends_envelope_and_reads_content() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<Value>| async move {
                let content = &body["messages"][0]["content"];
                let ok = body["model"] == "typhoon-ocr-preview"
                    && body["messages"][0]["role"] == "user"
                    && content[0]["type"] == "text"
                    && content[0]["text"] == "Process this image"
                    && content[1]["type"] == "image_url"
                    && content[1]["image_url"]["url"] == "data:image/png;base64,UE5H";
                let text = if ok { "Invoice #123, Due 2024-01-01" } else { "bad envelope" };
                Json(json!({"choices": [{"message": {"role": "assistant", "content": text}}]}))
            }),
        );
        let base = spawn_http(router).await;

        let text = client_for(&base).recognize(1, b"PNG").await.unwrap();

        assert_eq!(text, "Invoice #123, Due 2024-01-01");
    }

    #[tokio::test]
    async fn test_error_status_is_page_failure() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "overloaded") }),
        );
        let base = spawn_http(router).await;

        let err = client_for(&base).recognize(2, b"PNG").await.unwrap_err();

        assert!(matches!(err, Error::Ocr { page: 2, .. }));
    }

    #[tokio::test]
    async fn test_malformed_envelope_is_page_failure() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({"result": "text without choices"})) }),
        );
        let base = spawn_http(router).await;

        let err = client_for(&base).recognize(3, b"PNG").await.unwrap_err();

        assert!(matches!(err, Error::Ocr { page: 3, .. }));
    }

    #[tokio::test]
    async fn test_blank_content_is_page_failure() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({"choices": [{"message": {"content": "  \n"}}]})) }),
        );
        let base = spawn_http(router).await;

        assert!(client_for(&base).recognize(1, b"PNG").await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_page_failure() {
        let client = client_for("http://127.0.0.1:1");
        assert!(matches!(
            client.recognize(4, b"PNG").await,
            Err(Error::Ocr { page: 4, .. })
        ));
    }
}
