use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use snafu::ResultExt;

use crate::error::{DecodeEventSnafu, ProtocolResult};

/// One increment of a streaming exchange, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default)]
        finished: bool,
    },
    ToolCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        arguments: Option<Map<String, Value>>,
        #[serde(
            default,
            deserialize_with = "crate::message::deserialize_present",
            skip_serializing_if = "Option::is_none"
        )]
        result: Option<Value>,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Meta {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
}

impl ChatEvent {
    pub fn text(fragment: impl Into<String>) -> Self {
        Self::Text {
            message: Some(fragment.into()),
            finished: false,
        }
    }

    /// Terminal text event closing the current assistant turn.
    pub fn finished() -> Self {
        Self::Text {
            message: None,
            finished: true,
        }
    }

    pub fn tool_call(tool: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self::ToolCall {
            tool: Some(tool.into()),
            arguments: Some(arguments),
            result: None,
        }
    }

    pub fn tool_result(tool: impl Into<String>, result: Value) -> Self {
        Self::ToolCall {
            tool: Some(tool.into()),
            arguments: None,
            result: Some(result),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: Some(message.into()),
        }
    }

    pub fn meta(session_id: impl Into<String>) -> Self {
        Self::Meta {
            session_id: Some(session_id.into()),
        }
    }

    pub fn from_json(raw: &str) -> ProtocolResult<Self> {
        serde_json::from_str(raw).context(DecodeEventSnafu {
            stage: "decode-chat-event",
            line: 1usize,
        })
    }

    /// Returns true for events after which no more output belongs to the turn.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Text { finished: true, .. } | Self::Error { .. }
        )
    }
}

/// Line-oriented decoder for JSON-lines and server-sent-event framing.
#[derive(Debug, Default)]
pub struct EventDecoder {
    line: usize,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one physical line.
    ///
    /// Returns `Ok(None)` for lines that only carry framing: blank lines, SSE
    /// comments, `event:`/`id:`/`retry:` fields and the `[DONE]` sentinel.
    pub fn decode_line(&mut self, raw: &str) -> ProtocolResult<Option<ChatEvent>> {
        self.line += 1;

        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with(':') {
            return Ok(None);
        }

        if ["event:", "id:", "retry:"]
            .iter()
            .any(|field| trimmed.starts_with(field))
        {
            return Ok(None);
        }

        let payload = trimmed
            .strip_prefix("data:")
            .map(str::trim)
            .unwrap_or(trimmed);
        if payload.is_empty() || payload == "[DONE]" {
            return Ok(None);
        }

        let event = serde_json::from_str(payload).context(DecodeEventSnafu {
            stage: "decode-event-line",
            line: self.line,
        })?;
        Ok(Some(event))
    }

    /// Decodes every event in `text`, stopping at the first malformed line.
    pub fn decode_all(text: &str) -> ProtocolResult<Vec<ChatEvent>> {
        let mut decoder = Self::new();
        let mut events = Vec::new();

        for raw in text.lines() {
            if let Some(event) = decoder.decode_line(raw)? {
                events.push(event);
            }
        }

        Ok(events)
    }
}
