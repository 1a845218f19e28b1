//! Sampling replies: the tool server asks the client to complete text.
//!
//! Tools like `summarize_channel` gather messages on the server and hand
//! them back as a sampling payload; the client turns that payload into a
//! prompt for its own completion provider.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use huddle_core::error::{ProviderError, ToolError};
use huddle_core::provider::CompletionProvider;

/// A request for the client to complete text on the server's behalf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingRequest {
    /// Lines of source text (messages, usually `user: text`)
    #[serde(default)]
    pub sampled_text: Vec<String>,

    /// What to do with the text
    #[serde(default)]
    pub instructions: String,
}

/// Why a sampling request could not be answered.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SamplingError {
    #[error("No messages to sample")]
    NothingToSample,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl From<SamplingError> for ToolError {
    fn from(err: SamplingError) -> Self {
        ToolError::InvocationFailed {
            tool_name: "sampling".into(),
            reason: err.to_string(),
        }
    }
}

impl SamplingRequest {
    pub fn new(sampled_text: Vec<String>, instructions: impl Into<String>) -> Self {
        Self {
            sampled_text,
            instructions: instructions.into(),
        }
    }

    /// Build the MCP `sampling/createMessage` params into a request.
    ///
    /// Every text message becomes a line; the system prompt becomes the
    /// instructions.
    pub fn from_create_message(params: &Value) -> Self {
        let sampled_text = params
            .get("messages")
            .and_then(Value::as_array)
            .map(|messages| {
                messages
                    .iter()
                    .filter_map(|m| m.get("content"))
                    .filter_map(|c| c.get("text").and_then(Value::as_str))
                    .filter(|t| !t.trim().is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let instructions = params
            .get("systemPrompt")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            sampled_text,
            instructions,
        }
    }

    /// `instructions`, a blank line, then every sampled line.
    pub fn prompt(&self) -> Result<String, SamplingError> {
        if self.sampled_text.is_empty() {
            return Err(SamplingError::NothingToSample);
        }
        Ok(format!(
            "{}\n\n{}",
            self.instructions,
            self.sampled_text.join("\n")
        ))
    }

    /// Answer the request through a completion provider.
    pub async fn reply(&self, provider: &dyn CompletionProvider) -> Result<String, SamplingError> {
        let prompt = self.prompt()?;
        tracing::debug!(
            lines = self.sampled_text.len(),
            provider = provider.name(),
            "Answering sampling request"
        );
        Ok(provider.complete(&prompt).await?)
    }
}
