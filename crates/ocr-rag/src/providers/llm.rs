//! LLM provider trait for single-shot completions

use async_trait::async_trait;

use crate::error::Result;

/// Trait for prompt-in, text-out LLM completion
///
/// Used for metadata classification, question condensation, and grounded
/// answer synthesis. Implementations:
/// - `OpenAiCompatLlm`: any OpenAI-compatible `/chat/completions` server
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a fully rendered prompt
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
