//! Result normalization: tool results to plain JSON.
//!
//! Text items are parsed as JSON when they hold JSON and kept as strings
//! otherwise. A collection that normalizes to exactly one element collapses
//! to that element, so planners write `$x_data.field` instead of
//! `$x_data[0].field`.

use serde_json::{Map, Value};

use huddle_core::context::{ContextValue, WorkingContext};
use huddle_core::result::{ContentItem, ToolContent, ToolResult};

/// Normalize one tool result.
pub fn normalize(result: &ToolResult) -> Value {
    match &result.content {
        ToolContent::Items(items) => {
            let mut values: Vec<Value> = items.iter().map(normalize_item).collect();
            if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            }
        }
        ToolContent::Single(item) => normalize_item(item),
        ToolContent::Empty => Value::String(result.to_string()),
    }
}

/// Normalize one content item.
///
/// Items without text (images, bare resources) become their serialized form.
pub fn normalize_item(item: &ContentItem) -> Value {
    match item.as_text() {
        Some(text) => parse_or_text(text),
        None => serde_json::to_value(item).unwrap_or_else(|_| Value::String(format!("{item:?}"))),
    }
}

fn parse_or_text(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Normalize every entry of the context into one JSON mapping.
pub fn normalize_context(context: &WorkingContext) -> Value {
    let map: Map<String, Value> = context
        .iter()
        .map(|(name, value)| {
            let normalized = match value {
                ContextValue::Raw(result) => normalize(result),
                ContextValue::Json(value) => value.clone(),
            };
            (name.to_string(), normalized)
        })
        .collect();
    Value::Object(map)
}

/// The context as pretty JSON, ready to embed in a prompt.
pub fn serialize_context(context: &WorkingContext) -> String {
    serde_json::to_string_pretty(&normalize_context(context)).unwrap_or_else(|_| "{}".into())
}
