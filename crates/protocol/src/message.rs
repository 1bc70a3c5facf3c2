use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Stable identifier for one message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Creates a typed message identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Allocates a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message tag as carried on the wire under the `type` key.
///
/// Tags outside the known set are kept verbatim in `Other` so they survive a
/// decode/encode cycle; renderers treat them like assistant output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    User,
    Assistant,
    ToolCall,
    Other(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::ToolCall => "tool_call",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for MessageKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "tool_call" => Self::ToolCall,
            _ => Self::Other(tag),
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

/// Borrowed view over the tool fields of a `tool_call` message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolDetails<'a> {
    pub name: Option<&'a str>,
    pub arguments: Option<&'a Map<String, Value>>,
    pub result: Option<&'a Value>,
}

/// One entry of a conversation.
///
/// `tool`, `arguments` and `result` only carry meaning for `tool_call`
/// messages, `is_streaming` only for assistant messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub content: String,
    #[serde(
        rename = "isStreaming",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_streaming: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Map<String, Value>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
}

impl Message {
    pub fn new(id: MessageId, kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            content: content.into(),
            is_streaming: None,
            tool: None,
            arguments: None,
            result: None,
        }
    }

    pub fn user(id: MessageId, content: impl Into<String>) -> Self {
        Self::new(id, MessageKind::User, content)
    }

    /// Creates a completed assistant message.
    pub fn assistant(id: MessageId, content: impl Into<String>) -> Self {
        Self::new(id, MessageKind::Assistant, content)
    }

    /// Creates an assistant message that is still being filled in.
    pub fn assistant_streaming(id: MessageId, content: impl Into<String>) -> Self {
        let mut message = Self::new(id, MessageKind::Assistant, content);
        message.is_streaming = Some(true);
        message
    }

    pub fn tool_call(
        id: MessageId,
        tool: impl Into<String>,
        arguments: Option<Map<String, Value>>,
    ) -> Self {
        let mut message = Self::new(id, MessageKind::ToolCall, String::new());
        message.tool = Some(tool.into());
        message.arguments = arguments;
        message
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Returns the raw streaming flag, treating an absent flag as `false`.
    pub fn is_streaming(&self) -> bool {
        self.is_streaming.unwrap_or(false)
    }

    /// Returns tool fields for `tool_call` messages and `None` for every other tag.
    pub fn tool_details(&self) -> Option<ToolDetails<'_>> {
        if self.kind != MessageKind::ToolCall {
            return None;
        }

        Some(ToolDetails {
            name: self.tool.as_deref(),
            arguments: self.arguments.as_ref(),
            result: self.result.as_ref(),
        })
    }
}

/// Keeps a present field as `Some`, even when its value is JSON `null`.
pub(crate) fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_wire_field_names() {
        let message: Message = serde_json::from_value(json!({
            "id": "m-1",
            "type": "assistant",
            "content": "partial",
            "isStreaming": true
        }))
        .unwrap();

        assert_eq!(message.id, MessageId::new("m-1"));
        assert_eq!(message.kind, MessageKind::Assistant);
        assert!(message.is_streaming());
        assert!(message.tool_details().is_none());
    }

    #[test]
    fn unknown_tag_is_preserved() {
        let message: Message = serde_json::from_value(json!({
            "id": "m-2",
            "type": "system_notice",
            "content": "maintenance tonight"
        }))
        .unwrap();

        assert_eq!(message.kind, MessageKind::Other("system_notice".to_string()));
        let encoded = serde_json::to_value(&message).unwrap();
        assert_eq!(encoded["type"], "system_notice");
        assert!(encoded.get("isStreaming").is_none());
    }

    #[test]
    fn tool_details_only_for_tool_calls() {
        let mut arguments = Map::new();
        arguments.insert("customer_id".to_string(), json!("c-42"));
        let tool = Message::tool_call(MessageId::new("t-1"), "lookup_account", Some(arguments))
            .with_result(json!({ "plan": "gold" }));

        let details = tool.tool_details().unwrap();
        assert_eq!(details.name, Some("lookup_account"));
        assert_eq!(details.arguments.unwrap()["customer_id"], "c-42");
        assert_eq!(details.result, Some(&json!({ "plan": "gold" })));

        let mut user = Message::user(MessageId::new("u-1"), "hi");
        user.tool = Some("ignored".to_string());
        assert!(user.tool_details().is_none());
    }

    #[test]
    fn null_tool_result_is_kept_distinct_from_a_missing_one() {
        let completed: Message = serde_json::from_value(json!({
            "id": "t-1",
            "type": "tool_call",
            "content": "",
            "tool": "lookup",
            "result": null
        }))
        .unwrap();
        assert_eq!(completed.result, Some(Value::Null));
        let encoded = serde_json::to_value(&completed).unwrap();
        assert_eq!(encoded.get("result"), Some(&Value::Null));

        let pending: Message = serde_json::from_value(json!({
            "id": "t-2",
            "type": "tool_call",
            "content": "",
            "tool": "lookup"
        }))
        .unwrap();
        assert_eq!(pending.result, None);
        assert!(serde_json::to_value(&pending).unwrap().get("result").is_none());
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(MessageId::generate(), MessageId::generate());
    }
}
