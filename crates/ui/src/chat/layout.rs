use chatpane_protocol::{Message, MessageId, MessageKind, ToolDetails};

/// Fixed content of every tool-call bubble, whatever the message carries.
pub const TOOL_PLACEHOLDER: &str = "Looking up information for you...";
pub const WELCOME_TITLE: &str = "Welcome";
pub const WELCOME_BODY: &str =
    "I'm your AI assistant. Ask me questions or request information to get started.";

/// Clickable prompt offered in the empty state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestedQuestion {
    /// Text handed to the suggestion callback.
    pub prompt: &'static str,
    /// Text shown on the row.
    pub label: &'static str,
}

pub const SUGGESTED_QUESTIONS: [SuggestedQuestion; 2] = [
    SuggestedQuestion {
        prompt: "What can you help me with?",
        label: "Try asking \"What can you help me with?\"",
    },
    SuggestedQuestion {
        prompt: "Tell me about my account",
        label: "Or \"Tell me about my account\"",
    },
];

impl SuggestedQuestion {
    pub fn get(index: usize) -> Option<Self> {
        SUGGESTED_QUESTIONS.get(index).copied()
    }

    /// Hands the prompt to `handler` when one is installed.
    ///
    /// Returns whether a handler ran; a missing handler is a silent no-op.
    pub fn send_to<F>(self, handler: Option<F>) -> bool
    where
        F: FnOnce(&'static str),
    {
        match handler {
            Some(handler) => {
                handler(self.prompt);
                true
            }
            None => false,
        }
    }
}

/// Renderer branch picked for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BubbleKind {
    User,
    Tool,
    Assistant,
}

impl BubbleKind {
    pub fn for_message(kind: &MessageKind) -> Self {
        match kind {
            MessageKind::User => Self::User,
            MessageKind::ToolCall => Self::Tool,
            MessageKind::Assistant | MessageKind::Other(_) => Self::Assistant,
        }
    }
}

/// Everything the bubble renderer receives for one message.
#[derive(Debug, Clone, PartialEq)]
pub struct BubbleProps<'a> {
    pub key: &'a MessageId,
    pub kind: BubbleKind,
    pub content: &'a str,
    /// Only set for assistant bubbles.
    pub is_streaming: Option<bool>,
    /// Only set for tool bubbles.
    pub tool: Option<ToolDetails<'a>>,
}

impl<'a> BubbleProps<'a> {
    pub fn from_message(message: &'a Message) -> Self {
        let kind = BubbleKind::for_message(&message.kind);
        if let MessageKind::Other(tag) = &message.kind {
            tracing::debug!(
                message_id = %message.id,
                tag = %tag,
                "rendering message with unknown tag as assistant output"
            );
        }

        match kind {
            BubbleKind::User => Self {
                key: &message.id,
                kind,
                content: &message.content,
                is_streaming: None,
                tool: None,
            },
            BubbleKind::Tool => Self {
                key: &message.id,
                kind,
                content: TOOL_PLACEHOLDER,
                is_streaming: None,
                tool: Some(ToolDetails {
                    name: message.tool.as_deref(),
                    arguments: message.arguments.as_ref(),
                    result: message.result.as_ref(),
                }),
            },
            BubbleKind::Assistant => Self {
                key: &message.id,
                kind,
                content: &message.content,
                is_streaming: message.is_streaming,
                tool: None,
            },
        }
    }
}

/// What the conversation view shows for a given input.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationLayout<'a> {
    Welcome,
    Thread {
        bubbles: Vec<BubbleProps<'a>>,
        show_thinking_indicator: bool,
    },
}

impl<'a> ConversationLayout<'a> {
    pub fn build(messages: &'a [Message], is_processing: bool) -> Self {
        if messages.is_empty() {
            return Self::Welcome;
        }

        let bubbles = messages.iter().map(BubbleProps::from_message).collect();
        // The pulsing dots only stand in while no reply text is streaming yet.
        let show_thinking_indicator =
            is_processing && !messages.iter().any(Message::is_streaming);

        Self::Thread {
            bubbles,
            show_thinking_indicator,
        }
    }

    pub fn is_welcome(&self) -> bool {
        matches!(self, Self::Welcome)
    }

    pub fn bubbles(&self) -> &[BubbleProps<'a>] {
        match self {
            Self::Welcome => &[],
            Self::Thread { bubbles, .. } => bubbles,
        }
    }

    pub fn thinking_indicator_count(&self) -> usize {
        match self {
            Self::Thread {
                show_thinking_indicator: true,
                ..
            } => 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::{Map, json};

    use super::*;

    fn id(raw: &str) -> MessageId {
        MessageId::new(raw)
    }

    fn conversation() -> Vec<Message> {
        let mut arguments = Map::new();
        arguments.insert("customer_id".to_string(), json!("c-42"));

        let mut tool = Message::tool_call(id("t-1"), "lookup_account", Some(arguments))
            .with_result(json!({ "plan": "gold" }));
        tool.content = "raw tool payload".to_string();

        vec![
            Message::user(id("u-1"), "Tell me about my account"),
            tool,
            Message::assistant(id("a-1"), "You are on the gold plan."),
        ]
    }

    #[test]
    fn empty_sequence_renders_only_the_welcome_panel() {
        let layout = ConversationLayout::build(&[], false);
        assert!(layout.is_welcome());
        assert!(layout.bubbles().is_empty());
        assert_eq!(layout.thinking_indicator_count(), 0);

        let layout = ConversationLayout::build(&[], true);
        assert!(layout.is_welcome());
        assert_eq!(layout.thinking_indicator_count(), 0);
    }

    #[test]
    fn one_bubble_per_message_in_order() {
        let messages = conversation();
        let layout = ConversationLayout::build(&messages, false);

        let keys = layout
            .bubbles()
            .iter()
            .map(|bubble| bubble.key.as_str())
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["u-1", "t-1", "a-1"]);

        let kinds = layout
            .bubbles()
            .iter()
            .map(|bubble| bubble.kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![BubbleKind::User, BubbleKind::Tool, BubbleKind::Assistant]
        );
    }

    #[test]
    fn tool_bubble_always_shows_placeholder_with_metadata() {
        let messages = conversation();
        let layout = ConversationLayout::build(&messages, false);
        let tool = &layout.bubbles()[1];

        assert_eq!(tool.content, TOOL_PLACEHOLDER);
        assert_eq!(tool.is_streaming, None);
        let details = tool.tool.unwrap();
        assert_eq!(details.name, Some("lookup_account"));
        assert_eq!(details.arguments.unwrap()["customer_id"], "c-42");
        assert_eq!(details.result, Some(&json!({ "plan": "gold" })));
    }

    #[test]
    fn unknown_tags_fall_through_to_assistant() {
        let mut notice = Message::assistant(id("n-1"), "maintenance tonight");
        notice.kind = MessageKind::Other("notice".to_string());
        notice.is_streaming = Some(true);
        let messages = vec![notice];

        let layout = ConversationLayout::build(&messages, false);
        let bubble = &layout.bubbles()[0];
        assert_eq!(bubble.kind, BubbleKind::Assistant);
        assert_eq!(bubble.content, "maintenance tonight");
        assert_eq!(bubble.is_streaming, Some(true));
    }

    #[test]
    fn streaming_flag_only_reaches_assistant_bubbles() {
        let mut user = Message::user(id("u-1"), "hi");
        user.is_streaming = Some(true);
        let messages = vec![user, Message::assistant_streaming(id("a-1"), "Hel")];

        let layout = ConversationLayout::build(&messages, false);
        assert_eq!(layout.bubbles()[0].is_streaming, None);
        assert_eq!(layout.bubbles()[1].is_streaming, Some(true));
    }

    #[test]
    fn thinking_indicator_requires_processing_without_streaming() {
        let messages = conversation();
        assert_eq!(
            ConversationLayout::build(&messages, true).thinking_indicator_count(),
            1
        );
        assert_eq!(
            ConversationLayout::build(&messages, false).thinking_indicator_count(),
            0
        );

        let mut streaming = conversation();
        streaming.push(Message::assistant_streaming(id("a-2"), "Work"));
        assert_eq!(
            ConversationLayout::build(&streaming, true).thinking_indicator_count(),
            0
        );
    }

    #[test]
    fn suggestions_send_fixed_prompts() {
        let received = RefCell::new(Vec::new());

        for index in 0..SUGGESTED_QUESTIONS.len() {
            let question = SuggestedQuestion::get(index).unwrap();
            let sent = question.send_to(Some(|prompt: &'static str| {
                received.borrow_mut().push(prompt);
            }));
            assert!(sent);
        }

        assert_eq!(
            received.into_inner(),
            vec!["What can you help me with?", "Tell me about my account"]
        );
    }

    #[test]
    fn suggestion_without_handler_is_a_no_op() {
        let question = SuggestedQuestion::get(0).unwrap();
        assert!(!question.send_to(None::<fn(&'static str)>));
        assert!(SuggestedQuestion::get(2).is_none());
    }
}
