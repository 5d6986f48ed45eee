//! Prompt message content and its normalization.
//!
//! Servers disagree on how a prompt message's `content` is shaped. Observed
//! in the wild:
//!
//! - a bare string: `"content": "You are..."`
//! - a single content object: `"content": {"type": "text", "text": "..."}`
//! - a list of content objects: `"content": [{"type": "text", "text": "..."}]`
//! - nothing at all
//!
//! [`PromptContent`] captures all of them as one tagged union, and
//! [`PromptContent::to_text`] turns any of them into a single string. The
//! conversion from raw JSON is total, so decoding content never fails.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One content object inside a prompt message.
///
/// Only `type` and `text` are interpreted; every other member is kept so
/// that non-text blocks can still be displayed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Content type tag, usually `"text"`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Text payload, for text blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Any other members of the block.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentBlock {
    /// Create a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: Some("text".to_string()),
            text: Some(text.into()),
            extra: Map::new(),
        }
    }

    /// The block's text, or its JSON rendering when it carries no text.
    #[must_use]
    pub fn to_text(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => Value::from(self.clone()).to_string(),
        }
    }
}

impl From<Value> for ContentBlock {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(mut map) => {
                let kind = take_string(&mut map, "type");
                let text = take_string(&mut map, "text");
                Self {
                    kind,
                    text,
                    extra: map,
                }
            }
            Value::String(text) => Self {
                kind: None,
                text: Some(text),
                extra: Map::new(),
            },
            other => Self {
                kind: None,
                text: Some(other.to_string()),
                extra: Map::new(),
            },
        }
    }
}

impl From<ContentBlock> for Value {
    fn from(block: ContentBlock) -> Self {
        let mut map = block.extra;
        if let Some(kind) = block.kind {
            map.insert("type".to_string(), Self::String(kind));
        }
        if let Some(text) = block.text {
            map.insert("text".to_string(), Self::String(text));
        }
        Self::Object(map)
    }
}

// Removes `key` only when it holds a string; anything else stays in `extra`.
fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(_)) => match map.remove(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        },
        _ => None,
    }
}

/// The content of a prompt message, in any of the shapes servers send.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum PromptContent {
    /// A bare string.
    Text(String),
    /// A single content object.
    Block(ContentBlock),
    /// A non-empty ordered list of content objects.
    Blocks(Vec<ContentBlock>),
    /// No content.
    #[default]
    Empty,
}

impl PromptContent {
    /// Normalize to a single string.
    ///
    /// Blocks are joined with a newline. Empty content yields `""`.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Block(block) => block.to_text(),
            Self::Blocks(blocks) => blocks
                .iter()
                .map(ContentBlock::to_text)
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Empty => String::new(),
        }
    }

    /// Check whether there is no content at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<Value> for PromptContent {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::String(text) => Self::Text(text),
            Value::Object(_) => Self::Block(ContentBlock::from(value)),
            Value::Array(items) if items.is_empty() => Self::Empty,
            Value::Array(items) => {
                Self::Blocks(items.into_iter().map(ContentBlock::from).collect())
            }
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<PromptContent> for Value {
    fn from(content: PromptContent) -> Self {
        match content {
            PromptContent::Text(text) => Self::String(text),
            PromptContent::Block(block) => block.into(),
            PromptContent::Blocks(blocks) => {
                Self::Array(blocks.into_iter().map(Self::from).collect())
            }
            PromptContent::Empty => Self::Null,
        }
    }
}

impl From<&str> for PromptContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for PromptContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<ContentBlock> for PromptContent {
    fn from(block: ContentBlock) -> Self {
        Self::Block(block)
    }
}

/// Normalize a raw `content` member of unknown shape to a single string.
///
/// Absent content yields the empty string.
#[must_use]
pub fn normalize_content(content: Option<&Value>) -> String {
    content
        .cloned()
        .map(PromptContent::from)
        .unwrap_or_default()
        .to_text()
}

/// Shorten text for single-line display.
///
/// Newlines become spaces and the result is cut to at most `max_chars`
/// characters, with `...` appended when something was cut.
#[must_use]
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.replace(['\r', '\n'], " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn shapes() -> Vec<Value> {
        vec![
            json!("plain text"),
            json!({"type": "text", "text": "single object"}),
            json!([{"type": "text", "text": "first"}, {"type": "text", "text": "second"}]),
            json!([]),
            Value::Null,
            json!({"type": "image", "data": "aGk=", "mimeType": "image/png"}),
            json!(["bare", 42]),
            json!(17),
        ]
    }

    #[test]
    fn test_each_shape_normalizes() {
        let texts: Vec<String> = shapes()
            .iter()
            .map(|v| normalize_content(Some(v)))
            .collect();
        assert_eq!(texts[0], "plain text");
        assert_eq!(texts[1], "single object");
        assert_eq!(texts[2], "first\nsecond");
        assert_eq!(texts[3], "");
        assert_eq!(texts[4], "");
        assert!(texts[5].contains("\"type\":\"image\""));
        assert_eq!(texts[6], "bare\n42");
        assert_eq!(texts[7], "17");
    }

    #[test]
    fn test_absent_content_is_empty_sentinel() {
        assert_eq!(normalize_content(None), "");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for shape in shapes() {
            let once = normalize_content(Some(&shape));
            let twice = normalize_content(Some(&Value::String(once.clone())));
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_shapes_map_to_variants() {
        assert!(matches!(
            PromptContent::from(json!("x")),
            PromptContent::Text(_)
        ));
        assert!(matches!(
            PromptContent::from(json!({"text": "x"})),
            PromptContent::Block(_)
        ));
        assert!(matches!(
            PromptContent::from(json!([{"text": "x"}])),
            PromptContent::Blocks(_)
        ));
        assert!(PromptContent::from(json!([])).is_empty());
    }

    #[test]
    fn test_non_string_text_member_is_kept_as_extra() {
        let block = ContentBlock::from(json!({"type": "text", "text": 5}));
        assert_eq!(block.text, None);
        assert_eq!(block.extra.get("text"), Some(&json!(5)));
    }

    #[test]
    fn test_block_serializes_back_to_object() {
        let content = PromptContent::Blocks(vec![ContentBlock::text("hello")]);
        assert_eq!(
            serde_json::to_value(&content).unwrap(),
            json!([{"type": "text", "text": "hello"}])
        );
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("line one\nline two", 100), "line one line two");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("ééééé", 2), "éé...");
    }
}
