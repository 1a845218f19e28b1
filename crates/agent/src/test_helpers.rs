//! Shared test helpers for agent tests.

use async_trait::async_trait;
use huddle_core::error::{ProviderError, ToolError};
use huddle_core::provider::CompletionProvider;
use huddle_core::result::ToolResult;
use huddle_core::tool::{ToolArguments, ToolDescriptor, ToolProvider};
use std::collections::HashMap;
use std::sync::Mutex;

/// A completion provider that returns a sequence of scripted completions.
///
/// Each call to `complete` returns the next entry in the queue and records
/// the prompt it was given. Panics if more calls are made than entries provided.
pub struct ScriptedCompletionProvider {
    responses: Vec<Result<String, ProviderError>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletionProvider {
    pub fn new(responses: Vec<&str>) -> Self {
        Self::with_results(responses.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn with_results(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses,
            prompts: Mutex::new(vec![]),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletionProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let mut prompts = self.prompts.lock().unwrap();
        let call = prompts.len();
        if call >= self.responses.len() {
            panic!(
                "ScriptedCompletionProvider: no more responses (call #{}, have {})",
                call,
                self.responses.len()
            );
        }
        prompts.push(prompt.to_string());
        self.responses[call].clone()
    }
}

/// A tool provider that records every call and answers from a canned table.
pub struct RecordingToolProvider {
    names: Vec<String>,
    responses: HashMap<String, ToolResult>,
    failures: HashMap<String, String>,
    calls: Mutex<Vec<(String, ToolArguments)>>,
}

impl RecordingToolProvider {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            responses: HashMap::new(),
            failures: HashMap::new(),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn respond(mut self, tool: &str, result: ToolResult) -> Self {
        self.responses.insert(tool.to_string(), result);
        self
    }

    pub fn fail(mut self, tool: &str, reason: &str) -> Self {
        self.failures.insert(tool.to_string(), reason.to_string());
        self
    }

    pub fn catalogue(&self) -> Vec<ToolDescriptor> {
        self.names
            .iter()
            .map(|n| ToolDescriptor::new(n, format!("The {n} tool")))
            .collect()
    }

    pub fn calls(&self) -> Vec<(String, ToolArguments)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolProvider for RecordingToolProvider {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        Ok(self.catalogue())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: ToolArguments,
    ) -> Result<ToolResult, ToolError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));

        if let Some(reason) = self.failures.get(name) {
            return Err(ToolError::InvocationFailed {
                tool_name: name.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self
            .responses
            .get(name)
            .cloned()
            .unwrap_or_else(|| ToolResult::json(&serde_json::json!({"ok": true}))))
    }
}
