//! Tool results as they come back from a Tool Provider.
//!
//! A result is a boundary payload: zero or more content items (text, images,
//! embedded resources), an error flag, and optionally a structured JSON
//! value. Text items frequently carry JSON that needs a second parse; the
//! agent's normalizer takes care of that.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single item of tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    /// Plain text (often a JSON document).
    Text { text: String },

    /// Base64-encoded image data.
    Image { data: String, mime_type: String },

    /// An embedded resource, optionally carrying its text.
    Resource {
        uri: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// The text carried by this item, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Resource { text, .. } => text.as_deref(),
            Self::Image { .. } => None,
        }
    }

    /// The item's type tag (`text`, `image`, `resource`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Resource { .. } => "resource",
        }
    }

    /// Look up a named field of this item.
    pub fn field(&self, name: &str) -> Option<Value> {
        match (self, name) {
            (_, "type") => Some(Value::String(self.kind().to_string())),
            (Self::Text { text }, "text") => Some(Value::String(text.clone())),
            (Self::Image { data, .. }, "data") => Some(Value::String(data.clone())),
            (Self::Image { mime_type, .. }, "mime_type") => Some(Value::String(mime_type.clone())),
            (Self::Resource { uri, .. }, "uri") => Some(Value::String(uri.clone())),
            (Self::Resource { mime_type, .. }, "mime_type") => {
                mime_type.clone().map(Value::String)
            }
            (Self::Resource { text, .. }, "text") => text.clone().map(Value::String),
            _ => None,
        }
    }
}

/// The content shape of a result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolContent {
    /// A collection of items (the usual case).
    Items(Vec<ContentItem>),

    /// A single item not wrapped in a collection.
    Single(ContentItem),

    /// No recognizable content.
    #[default]
    Empty,
}

/// The result of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The output content
    #[serde(default)]
    pub content: ToolContent,

    /// Whether the provider flagged this result as an error
    #[serde(default)]
    pub is_error: bool,

    /// Optional structured data returned alongside the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl ToolResult {
    /// A result with one text item.
    pub fn text(text: impl Into<String>) -> Self {
        Self::items(vec![ContentItem::text(text)])
    }

    /// A result whose single text item is the JSON encoding of `value`.
    ///
    /// This is how tool servers ship return values over the wire.
    pub fn json(value: &Value) -> Self {
        Self::text(value.to_string())
    }

    pub fn items(items: Vec<ContentItem>) -> Self {
        Self {
            content: ToolContent::Items(items),
            is_error: false,
            structured_content: None,
        }
    }

    pub fn single(item: ContentItem) -> Self {
        Self {
            content: ToolContent::Single(item),
            is_error: false,
            structured_content: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            content: ToolContent::Empty,
            is_error: false,
            structured_content: None,
        }
    }

    pub fn with_structured_content(mut self, value: Value) -> Self {
        self.structured_content = Some(value);
        self
    }

    pub fn with_error_flag(mut self, is_error: bool) -> Self {
        self.is_error = is_error;
        self
    }

    /// All text carried by the content items, joined with newlines.
    pub fn text_content(&self) -> String {
        let items: &[ContentItem] = match &self.content {
            ToolContent::Items(items) => items,
            ToolContent::Single(item) => std::slice::from_ref(item),
            ToolContent::Empty => &[],
        };
        items
            .iter()
            .filter_map(ContentItem::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl std::fmt::Display for ToolResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(self) {
            Ok(encoded) => f.write_str(&encoded),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_result_wraps_encoded_text() {
        let result = ToolResult::json(&json!([{"id": "C1", "name": "general"}]));
        assert_eq!(result.text_content(), r#"[{"id":"C1","name":"general"}]"#);
        assert!(!result.is_error);
    }

    #[test]
    fn content_item_fields() {
        let item = ContentItem::Resource {
            uri: "slack://C1".into(),
            mime_type: Some("application/json".into()),
            text: None,
        };
        assert_eq!(item.field("type"), Some(json!("resource")));
        assert_eq!(item.field("uri"), Some(json!("slack://C1")));
        assert_eq!(item.field("text"), None);
        assert_eq!(item.as_text(), None);
    }

    #[test]
    fn result_deserializes_wire_shape() {
        let raw = json!({
            "content": [{"type": "text", "text": "hello"}],
            "is_error": false
        });
        let result: ToolResult = serde_json::from_value(raw).unwrap();
        assert_eq!(result, ToolResult::text("hello"));
    }

    #[test]
    fn missing_content_defaults_to_empty() {
        assert_eq!(ToolContent::default(), ToolContent::Empty);
        let result: ToolResult = serde_json::from_value(json!({"is_error": true})).unwrap();
        assert_eq!(result.content, ToolContent::Empty);
        assert!(result.is_error);
    }

    #[test]
    fn empty_result_displays_as_json() {
        let shown = ToolResult::empty().to_string();
        assert!(shown.contains("\"content\":null"));
    }
}
