//! The planning prompt.
//!
//! Every round the planner sees the user's request, the live tool
//! catalogue, and the whole working context as JSON, followed by the plan
//! schema and the rules for filling it in.

use huddle_core::tool::ToolDescriptor;

/// The schema every planning prompt asks for.
pub const PLAN_SCHEMA: &str = r#"{
  "actions": [
    {
      "tool": "<tool_name>",
      "args": {"param": "value"},
      "save_as": "<optional_context_name or null>"
    }
  ],
  "response": "<text to show the user, with ACTUAL data, or null>",
  "done": true
}"#;

/// Rules carried in every prompt, before any configured extras.
pub const BASE_RULES: &[&str] = &[
    "Return only the JSON plan, with no extra text, whenever a tool action is needed. If no tool action is needed, you may reply in plain text instead.",
    "When showing data in \"response\", use the ACTUAL values from the context, never template syntax like {{variable}}.",
    "Format lists as plain text lines like \"• general\\n• random\".",
    "If you need data, fetch it with a tool action and set \"done\" to false; use that data in the next round.",
    "Reference saved results with $name_data (for example $channels_data[0].id).",
    "Give channel names in args without the # (\"social\", not \"#social\").",
    "Thread timestamps look like \"1234567890.123456\".",
];

/// Builds planning prompts.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    assistant_name: String,
    extra_rules: Vec<String>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            assistant_name: "Slack assistant".into(),
            extra_rules: vec![],
        }
    }
}

impl PromptBuilder {
    pub fn new(assistant_name: impl Into<String>) -> Self {
        Self {
            assistant_name: assistant_name.into(),
            extra_rules: vec![],
        }
    }

    /// Append rules after the built-in ones.
    pub fn with_extra_rules(mut self, rules: Vec<String>) -> Self {
        self.extra_rules = rules;
        self
    }

    pub fn build(&self, user_input: &str, catalogue: &[ToolDescriptor], context_json: &str) -> String {
        let catalogue_json =
            serde_json::to_string_pretty(catalogue).unwrap_or_else(|_| "[]".into());

        let rules = BASE_RULES
            .iter()
            .map(|r| r.to_string())
            .chain(self.extra_rules.iter().cloned())
            .enumerate()
            .map(|(i, r)| format!("{}. {}", i + 1, r))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a {name}. The user asked: \"{input}\".\n\
             Available tools (latest from the tool server):\n\
             {catalogue_json}\n\n\
             Current context from previous tool calls:\n\
             {context_json}\n\n\
             Return a JSON plan in this exact format:\n\
             {PLAN_SCHEMA}\n\n\
             CRITICAL RULES:\n\
             {rules}\n",
            name = self.assistant_name,
            input = user_input,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalogue() -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new("list_channels", "List channels")]
    }

    #[test]
    fn prompt_embeds_request_catalogue_and_context() {
        let prompt = PromptBuilder::default().build(
            "list channels",
            &catalogue(),
            r#"{"chans_data": []}"#,
        );
        assert!(prompt.starts_with("You are a Slack assistant."));
        assert!(prompt.contains("The user asked: \"list channels\""));
        assert!(prompt.contains("\"name\": \"list_channels\""));
        assert!(prompt.contains("\"description\": \"List channels\""));
        assert!(prompt.contains(r#"{"chans_data": []}"#));
    }

    #[test]
    fn prompt_states_schema_and_plain_text_allowance() {
        let prompt = PromptBuilder::default().build("hi", &[], "{}");
        assert!(prompt.contains("\"actions\""));
        assert!(prompt.contains("\"save_as\""));
        assert!(prompt.contains("\"done\": true"));
        assert!(prompt.contains("you may reply in plain text"));
        assert!(prompt.contains("$name_data"));
    }

    #[test]
    fn extra_rules_are_numbered_after_base_rules() {
        let prompt = PromptBuilder::new("workspace helper")
            .with_extra_rules(vec!["Answer in French.".into()])
            .build("hi", &[], "{}");
        assert!(prompt.starts_with("You are a workspace helper."));
        assert!(prompt.contains(&format!("{}. Answer in French.", BASE_RULES.len() + 1)));
    }
}
