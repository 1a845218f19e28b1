//! Completion Provider trait: the abstraction over the planner's language model.
//!
//! The planning loop treats the model as a black box: a prompt goes in, a
//! completion comes out, and the call may fail. Model selection, sampling
//! parameters and credentials belong to the implementation.
//!
//! Implementations: OpenAI-compatible endpoints (Gemini, OpenAI, OpenRouter, Ollama).

use async_trait::async_trait;

use crate::error::ProviderError;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Complete a text prompt.
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}
