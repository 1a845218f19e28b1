//! The working context: named results accumulated by the planning loop.
//!
//! Every `save_as` of name `N` writes two entries: `N` holds the raw tool
//! result, `N_data` holds its normalized JSON. The context grows across
//! turns of one conversation; entries are only replaced by an explicit
//! overwrite or removed by `clear`.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::result::ToolResult;

/// Suffix of the derived name that holds normalized data.
pub const DATA_SUFFIX: &str = "_data";

/// The derived name under which the normalized form of `name` is stored.
pub fn data_key(name: &str) -> String {
    format!("{name}{DATA_SUFFIX}")
}

/// A stored context value.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    /// The exact result returned by the Tool Provider.
    Raw(ToolResult),

    /// A plain JSON value (normalized results, caller-seeded values).
    Json(Value),
}

impl ContextValue {
    pub fn as_raw(&self) -> Option<&ToolResult> {
        match self {
            Self::Raw(result) => Some(result),
            Self::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }
}

/// Named values owned by one conversation session.
#[derive(Debug, Clone, Default)]
pub struct WorkingContext {
    entries: BTreeMap<String, ContextValue>,
}

impl WorkingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a tool result under `name` and its normalized form under `name_data`.
    pub fn store_result(&mut self, name: &str, raw: ToolResult, normalized: Value) {
        self.entries.insert(name.to_string(), ContextValue::Raw(raw));
        self.entries
            .insert(data_key(name), ContextValue::Json(normalized));
    }

    /// Store a plain JSON value under `name`.
    pub fn insert_json(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), ContextValue::Json(value));
    }

    pub fn get(&self, name: &str) -> Option<&ContextValue> {
        self.entries.get(name)
    }

    /// The raw result saved under `name`, if it is one.
    pub fn raw(&self, name: &str) -> Option<&ToolResult> {
        self.get(name).and_then(ContextValue::as_raw)
    }

    /// The normalized data saved for `name` (looked up under `name_data`).
    pub fn data(&self, name: &str) -> Option<&Value> {
        self.get(&data_key(name)).and_then(ContextValue::as_json)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. Never called by the loop itself.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn store_result_writes_raw_and_data() {
        let mut ctx = WorkingContext::new();
        let raw = ToolResult::json(&json!([{"id": "C1"}]));
        ctx.store_result("chans", raw.clone(), json!([{"id": "C1"}]));

        assert_eq!(ctx.raw("chans"), Some(&raw));
        assert_eq!(ctx.data("chans"), Some(&json!([{"id": "C1"}])));
        assert!(ctx.contains("chans_data"));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn overwrite_replaces_entry() {
        let mut ctx = WorkingContext::new();
        ctx.store_result("x", ToolResult::text("one"), json!("one"));
        ctx.store_result("x", ToolResult::text("two"), json!("two"));
        assert_eq!(ctx.data("x"), Some(&json!("two")));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn entries_survive_until_cleared() {
        let mut ctx = WorkingContext::new();
        ctx.insert_json("user", json!({"name": "ada"}));
        ctx.store_result("chans", ToolResult::text("[]"), json!([]));
        assert_eq!(ctx.names(), vec!["chans", "chans_data", "user"]);
        ctx.clear();
        assert!(ctx.is_empty());
    }

    #[test]
    fn data_key_appends_suffix() {
        assert_eq!(data_key("threads"), "threads_data");
    }
}
