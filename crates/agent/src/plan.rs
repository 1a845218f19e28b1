//! Plans and the plan parser.
//!
//! The planner answers each round with either a JSON plan or plain prose.
//! Prose is a conversational reply, not an error. A reply that looks like a
//! plan but does not parse is an error that ends the turn.

use serde::{Deserialize, Deserializer, Serialize};

use huddle_core::error::PlanError;
use huddle_core::tool::ToolArguments;

/// One planned tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Catalogue name of the tool. Empty when the planner left it out.
    #[serde(default)]
    pub tool: String,

    /// Literal values or `$`-references.
    #[serde(default, deserialize_with = "null_as_default")]
    pub args: ToolArguments,

    /// Context slot that receives the result (and `<name>_data`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_as: Option<String>,
}

impl Action {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            args: ToolArguments::new(),
            save_as: None,
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn save_as(mut self, name: impl Into<String>) -> Self {
        self.save_as = Some(name.into());
        self
    }

    /// The save slot, ignoring blank names.
    pub fn slot(&self) -> Option<&str> {
        self.save_as.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// A planner decision for one round.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Evaluated in order; later actions may reference earlier results.
    #[serde(default, deserialize_with = "null_as_default")]
    pub actions: Vec<Action>,

    /// User-facing text for this round.
    #[serde(default)]
    pub response: Option<String>,

    /// Whether the task is finished. Absent means finished.
    #[serde(default)]
    pub done: Option<bool>,
}

impl Plan {
    /// `done`, defaulting to true when the planner left it out.
    pub fn is_done(&self) -> bool {
        self.done.unwrap_or(true)
    }

    /// The response text, if present and not blank.
    pub fn response_text(&self) -> Option<&str> {
        self.response.as_deref().filter(|s| !s.trim().is_empty())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// What the planner said.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerOutput {
    Plan(Plan),
    /// Prose with no plan in it.
    TextOnly(String),
}

/// Remove a surrounding code fence, with or without a language tag.
pub fn strip_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Language tag runs up to the first whitespace or the object itself.
        let tag_len = rest
            .find(|c: char| c.is_whitespace() || c == '{')
            .unwrap_or(rest.len());
        text = &rest[tag_len..];
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse a completion into a plan or a text-only reply.
pub fn parse_plan(raw: &str) -> Result<PlannerOutput, PlanError> {
    let text = strip_fence(raw);
    if !text.starts_with('{') {
        return Ok(PlannerOutput::TextOnly(text.to_string()));
    }

    serde_json::from_str::<Plan>(text)
        .map(PlannerOutput::Plan)
        .map_err(|e| PlanError::Parse {
            reason: e.to_string(),
            raw: raw.to_string(),
        })
}
