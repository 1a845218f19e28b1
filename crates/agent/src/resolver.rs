//! Reference resolution: `$name.path[0].field` against the working context.
//!
//! A reference starts with `$`. The first segment names a context entry;
//! each following segment is either a non-negative integer (sequence index)
//! or a name (mapping key or record field). `[` and `]` are separators, so
//! `$a.b[0].c` and `$a.b.0.c` address the same value.
//!
//! Resolution always walks the live context. Nothing is cached.

use serde_json::{Map, Value};

use huddle_core::context::{ContextValue, WorkingContext};
use huddle_core::error::ReferenceError;
use huddle_core::result::{ContentItem, ToolContent, ToolResult};

use crate::normalizer;

/// The reference sigil.
pub const SIGIL: char = '$';

/// Whether a string is a reference rather than a literal.
pub fn is_reference(raw: &str) -> bool {
    raw.starts_with(SIGIL)
}

/// Split a reference body into path segments.
///
/// Empty segments (from `a[0]` → `a.0.` or doubled dots) are dropped.
pub fn segments(body: &str) -> Vec<&str> {
    body.split(['.', '[', ']'])
        .filter(|s| !s.is_empty())
        .collect()
}

/// Resolve `raw` against `context`.
///
/// Strings without the sigil are literals and come back unchanged.
pub fn resolve(raw: &str, context: &WorkingContext) -> Result<Value, ReferenceError> {
    let Some(body) = raw.strip_prefix(SIGIL) else {
        return Ok(Value::String(raw.to_string()));
    };

    let path = segments(body);
    let root = path.first().copied().unwrap_or_default();
    let entry = context.get(root).ok_or_else(|| ReferenceError::NotFound {
        reference: raw.to_string(),
        root: root.to_string(),
    })?;

    let mut node = Node::from(entry);
    for segment in path.iter().skip(1) {
        node = step(node, segment).map_err(|miss| miss.into_error(raw, segment))?;
    }
    Ok(node.into_value())
}

fn step(node: Node, segment: &str) -> Result<Node, Miss> {
    if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
        let index = segment
            .parse::<usize>()
            .map_err(|_| Miss::Index("index too large".into()))?;
        node.index(index)
    } else {
        node.member(segment)
    }
}

/// A resolvable value.
///
/// JSON values split into mappings, sequences and scalars; raw tool results
/// and their content items are records with named fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Mapping(Map<String, Value>),
    Sequence(Vec<Node>),
    Scalar(Value),
    Record(ToolResult),
    Content(ContentItem),
}

/// Why one step of a path failed.
#[derive(Debug)]
enum Miss {
    Index(String),
    Field(String),
}

impl Miss {
    fn into_error(self, reference: &str, segment: &str) -> ReferenceError {
        match self {
            Miss::Index(reason) => ReferenceError::Index {
                reference: reference.to_string(),
                segment: segment.to_string(),
                reason,
            },
            Miss::Field(reason) => ReferenceError::Field {
                reference: reference.to_string(),
                segment: segment.to_string(),
                reason,
            },
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Node::Mapping(map),
            Value::Array(items) => Node::Sequence(items.into_iter().map(Node::from).collect()),
            scalar => Node::Scalar(scalar),
        }
    }
}

impl From<&ContextValue> for Node {
    fn from(value: &ContextValue) -> Self {
        match value {
            ContextValue::Raw(result) => Node::Record(result.clone()),
            ContextValue::Json(value) => Node::from(value.clone()),
        }
    }
}

impl Node {
    fn kind(&self) -> &'static str {
        match self {
            Node::Mapping(_) => "mapping",
            Node::Sequence(_) => "sequence",
            Node::Scalar(Value::Null) => "null",
            Node::Scalar(_) => "scalar",
            Node::Record(_) => "tool result",
            Node::Content(_) => "content item",
        }
    }

    /// Look up a named member.
    fn member(self, name: &str) -> Result<Node, Miss> {
        let kind = self.kind();
        match self {
            Node::Mapping(mut map) => map
                .remove(name)
                .map(Node::from)
                .ok_or_else(|| Miss::Field(format!("no key '{name}' in mapping"))),
            Node::Record(result) => record_field(result, name),
            Node::Content(item) => item
                .field(name)
                .map(Node::from)
                .ok_or_else(|| Miss::Field(format!("{} item has no field '{name}'", item.kind()))),
            Node::Sequence(_) | Node::Scalar(_) => {
                Err(Miss::Field(format!("{kind} has no field '{name}'")))
            }
        }
    }

    /// Index into an ordered sequence.
    fn index(self, index: usize) -> Result<Node, Miss> {
        match self {
            Node::Sequence(items) => {
                let len = items.len();
                items
                    .into_iter()
                    .nth(index)
                    .ok_or_else(|| Miss::Index(format!("index {index} out of range (len {len})")))
            }
            other => Err(Miss::Index(format!("{} is not indexable", other.kind()))),
        }
    }

    /// The JSON form of this node.
    ///
    /// Raw results surface as their normalized value so they can be passed
    /// straight into tool arguments.
    pub fn into_value(self) -> Value {
        match self {
            Node::Mapping(map) => Value::Object(map),
            Node::Sequence(items) => Value::Array(items.into_iter().map(Node::into_value).collect()),
            Node::Scalar(value) => value,
            Node::Record(result) => normalizer::normalize(&result),
            Node::Content(item) => normalizer::normalize_item(&item),
        }
    }
}

fn record_field(result: ToolResult, name: &str) -> Result<Node, Miss> {
    match name {
        "content" => Ok(match result.content {
            ToolContent::Items(items) => {
                Node::Sequence(items.into_iter().map(Node::Content).collect())
            }
            ToolContent::Single(item) => Node::Content(item),
            ToolContent::Empty => Node::Scalar(Value::Null),
        }),
        "is_error" | "isError" => Ok(Node::Scalar(Value::Bool(result.is_error))),
        "structured_content" | "structuredContent" => result
            .structured_content
            .map(Node::from)
            .ok_or_else(|| Miss::Field("tool result has no structured content".into())),
        other => Err(Miss::Field(format!("tool result has no field '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> WorkingContext {
        let mut ctx = WorkingContext::new();
        let threads = json!([
            {"ts": "1700000000.000100", "replies": [{"text": "first reply"}, {"text": "second"}]},
            {"ts": "1700000001.000200", "replies": []}
        ]);
        ctx.store_result("threads", ToolResult::json(&threads), threads);
        ctx.insert_json("user", json!({"name": "ada", "id": "U1"}));
        ctx
    }

    #[test]
    fn literal_strings_pass_through() {
        let ctx = context();
        assert_eq!(resolve("general", &ctx).unwrap(), json!("general"));
    }

    #[test]
    fn segments_split_on_dots_and_brackets() {
        assert_eq!(segments("a.b[0].c"), vec!["a", "b", "0", "c"]);
        assert_eq!(segments("a[0][1]"), vec!["a", "0", "1"]);
    }

    #[test]
    fn dotted_and_bracketed_forms_agree() {
        let ctx = context();
        let bracketed = resolve("$threads_data[0].replies[1].text", &ctx).unwrap();
        let dotted = resolve("$threads_data.0.replies.1.text", &ctx).unwrap();
        assert_eq!(bracketed, json!("second"));
        assert_eq!(bracketed, dotted);
    }

    #[test]
    fn whole_entry_resolves() {
        let ctx = context();
        assert_eq!(resolve("$user", &ctx).unwrap(), json!({"name": "ada", "id": "U1"}));
    }

    #[test]
    fn missing_root_is_not_found() {
        let ctx = context();
        let err = resolve("$missing_data.field", &ctx).unwrap_err();
        assert_eq!(
            err,
            ReferenceError::NotFound {
                reference: "$missing_data.field".into(),
                root: "missing_data".into(),
            }
        );
    }

    #[test]
    fn bare_sigil_is_not_found() {
        let ctx = context();
        assert!(matches!(resolve("$", &ctx), Err(ReferenceError::NotFound { .. })));
    }

    #[test]
    fn out_of_range_is_an_index_error() {
        let ctx = context();
        let err = resolve("$threads_data[5]", &ctx).unwrap_err();
        assert!(matches!(err, ReferenceError::Index { ref segment, .. } if segment == "5"));
    }

    #[test]
    fn indexing_a_mapping_is_an_index_error() {
        let ctx = context();
        assert!(matches!(
            resolve("$user[0]", &ctx),
            Err(ReferenceError::Index { .. })
        ));
    }

    #[test]
    fn missing_key_is_a_field_error() {
        let ctx = context();
        assert!(matches!(
            resolve("$user.email", &ctx),
            Err(ReferenceError::Field { .. })
        ));
        assert!(matches!(
            resolve("$user.name.first", &ctx),
            Err(ReferenceError::Field { .. })
        ));
    }

    #[test]
    fn raw_results_expose_record_fields() {
        let ctx = context();
        let text = resolve("$threads.content[0].text", &ctx).unwrap();
        assert!(text.as_str().unwrap().contains("1700000000.000100"));
        assert_eq!(resolve("$threads.is_error", &ctx).unwrap(), json!(false));
        assert_eq!(resolve("$threads.content[0].type", &ctx).unwrap(), json!("text"));
    }

    #[test]
    fn raw_result_resolves_to_normalized_value() {
        let ctx = context();
        let value = resolve("$threads", &ctx).unwrap();
        assert_eq!(value[0]["ts"], json!("1700000000.000100"));
    }

    #[test]
    fn unknown_record_field_is_a_field_error() {
        let ctx = context();
        assert!(matches!(
            resolve("$threads.replies", &ctx),
            Err(ReferenceError::Field { .. })
        ));
    }

    #[test]
    fn resolution_sees_live_context() {
        let mut ctx = context();
        assert!(resolve("$later_data", &ctx).is_err());
        ctx.store_result("later", ToolResult::text("42"), json!(42));
        assert_eq!(resolve("$later_data", &ctx).unwrap(), json!(42));
    }
}
