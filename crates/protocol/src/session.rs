use serde_json::{Map, Value};

use crate::event::ChatEvent;
use crate::message::{Message, MessageId, MessageKind};
use crate::request::ChatRequest;

/// Shown when the backend reports an error without a message.
pub const ERROR_FALLBACK_TEXT: &str = "Something went wrong while answering. Please try again.";

/// Conversation state assembled from user prompts and backend events.
///
/// The session owns the ordered message list and the processing flag that
/// the conversation view renders. At most one assistant message is open for
/// streaming at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    customer_id: String,
    session_id: Option<String>,
    messages: Vec<Message>,
    is_processing: bool,
    open_stream: Option<MessageId>,
}

impl ChatSession {
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            session_id: None,
            messages: Vec::new(),
            is_processing: false,
            open_stream: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    /// Records a user prompt and returns the request to send for it.
    ///
    /// Blank prompts and prompts submitted while a turn is still in flight are
    /// rejected with `None`.
    pub fn submit(&mut self, prompt: &str) -> Option<ChatRequest> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return None;
        }

        if self.is_processing {
            tracing::warn!(
                session_id = ?self.session_id,
                "ignoring prompt while a turn is still in flight"
            );
            return None;
        }

        self.messages
            .push(Message::user(MessageId::generate(), prompt));
        self.is_processing = true;

        Some(ChatRequest::new(
            self.session_id.clone(),
            self.customer_id.clone(),
            prompt,
        ))
    }

    /// Folds one backend event into the conversation.
    pub fn apply(&mut self, event: ChatEvent) {
        tracing::debug!(?event, message_count = self.messages.len(), "applying chat event");

        match event {
            ChatEvent::Meta { session_id } => {
                if let Some(session_id) = session_id.filter(|id| !id.trim().is_empty()) {
                    self.session_id = Some(session_id);
                }
            }
            ChatEvent::Text { message, finished } => {
                if let Some(fragment) = message.filter(|fragment| !fragment.is_empty()) {
                    self.append_fragment(fragment);
                }

                if finished {
                    self.close_stream();
                    self.is_processing = false;
                }
            }
            ChatEvent::ToolCall {
                tool,
                arguments,
                result,
            } => {
                self.close_stream();
                self.apply_tool_call(tool.unwrap_or_default(), arguments, result);
            }
            ChatEvent::Error { message } => {
                self.close_stream();
                let text = match message.filter(|message| !message.trim().is_empty()) {
                    Some(message) => format!("Error: {message}"),
                    None => ERROR_FALLBACK_TEXT.to_string(),
                };
                self.messages
                    .push(Message::assistant(MessageId::generate(), text));
                self.is_processing = false;
            }
        }
    }

    /// Stops the current turn locally, keeping whatever text already arrived.
    pub fn cancel(&mut self) {
        self.close_stream();
        self.is_processing = false;
    }

    /// Starts over with an empty conversation and no backend session.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.session_id = None;
        self.is_processing = false;
        self.open_stream = None;
    }

    fn append_fragment(&mut self, fragment: String) {
        if let Some(message) = self.open_stream_message_mut() {
            message.content.push_str(&fragment);
            return;
        }

        let id = MessageId::generate();
        self.messages
            .push(Message::assistant_streaming(id.clone(), fragment));
        self.open_stream = Some(id);
    }

    fn apply_tool_call(
        &mut self,
        tool: String,
        arguments: Option<Map<String, Value>>,
        result: Option<Value>,
    ) {
        let Some(result) = result else {
            self.messages
                .push(Message::tool_call(MessageId::generate(), tool, arguments));
            return;
        };

        // A result completes the latest pending call to the same tool.
        let pending = self
            .messages
            .iter_mut()
            .rev()
            .find(|message| message.kind == MessageKind::ToolCall && message.result.is_none())
            .filter(|message| message.tool.as_deref() == Some(tool.as_str()));

        if let Some(message) = pending {
            message.result = Some(result);
            if message.arguments.is_none() {
                message.arguments = arguments;
            }
            return;
        }

        self.messages.push(
            Message::tool_call(MessageId::generate(), tool, arguments).with_result(result),
        );
    }

    fn open_stream_message_mut(&mut self) -> Option<&mut Message> {
        let open_id = self.open_stream.as_ref()?;
        self.messages
            .iter_mut()
            .rev()
            .find(|message| &message.id == open_id)
    }

    fn close_stream(&mut self) {
        if let Some(message) = self.open_stream_message_mut() {
            message.is_streaming = Some(false);
        }
        self.open_stream = None;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn kinds(session: &ChatSession) -> Vec<MessageKind> {
        session
            .messages()
            .iter()
            .map(|message| message.kind.clone())
            .collect()
    }

    #[test]
    fn submit_records_prompt_and_builds_request() {
        let mut session = ChatSession::new("c-42");
        let request = session.submit("  What can you help me with?  ").unwrap();

        assert_eq!(request.prompt, "What can you help me with?");
        assert_eq!(request.customer_id, "c-42");
        assert_eq!(request.session_id, None);
        assert!(session.is_processing());
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].kind, MessageKind::User);
        assert_eq!(session.messages()[0].content, "What can you help me with?");
    }

    #[test]
    fn submit_rejects_blank_and_concurrent_prompts() {
        let mut session = ChatSession::new("c-42");
        assert!(session.submit("   ").is_none());
        assert!(session.messages().is_empty());

        assert!(session.submit("first").is_some());
        assert!(session.submit("second").is_none());
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn meta_session_is_sent_with_next_request() {
        let mut session = ChatSession::new("c-42");
        session.submit("hello");
        session.apply(ChatEvent::meta("s-7"));
        session.apply(ChatEvent::Meta { session_id: None });
        session.apply(ChatEvent::finished());

        let request = session.submit("again").unwrap();
        assert_eq!(request.session_id.as_deref(), Some("s-7"));
    }

    #[test]
    fn text_fragments_stream_into_one_message() {
        let mut session = ChatSession::new("c-42");
        session.submit("hello");
        session.apply(ChatEvent::text("Hel"));
        session.apply(ChatEvent::text("lo"));

        assert_eq!(session.messages().len(), 2);
        let reply = &session.messages()[1];
        assert_eq!(reply.kind, MessageKind::Assistant);
        assert_eq!(reply.content, "Hello");
        assert!(reply.is_streaming());
        assert!(session.is_processing());

        session.apply(ChatEvent::Text {
            message: Some("!".to_string()),
            finished: true,
        });
        let reply = &session.messages()[1];
        assert_eq!(reply.content, "Hello!");
        assert!(!reply.is_streaming());
        assert!(!session.is_processing());
    }

    #[test]
    fn tool_call_closes_stream_and_result_fills_pending_call() {
        let mut session = ChatSession::new("c-42");
        session.submit("Tell me about my account");
        session.apply(ChatEvent::text("Let me check."));

        let mut arguments = Map::new();
        arguments.insert("customer_id".to_string(), json!("c-42"));
        session.apply(ChatEvent::tool_call("lookup_account", arguments));
        session.apply(ChatEvent::tool_result("lookup_account", json!({ "plan": "gold" })));
        session.apply(ChatEvent::text("You are on the gold plan."));
        session.apply(ChatEvent::finished());

        assert_eq!(
            kinds(&session),
            vec![
                MessageKind::User,
                MessageKind::Assistant,
                MessageKind::ToolCall,
                MessageKind::Assistant
            ]
        );
        assert!(!session.messages()[1].is_streaming());

        let tool = session.messages()[2].tool_details().unwrap();
        assert_eq!(tool.name, Some("lookup_account"));
        assert_eq!(tool.arguments.unwrap()["customer_id"], "c-42");
        assert_eq!(tool.result, Some(&json!({ "plan": "gold" })));
        assert_eq!(session.messages()[3].content, "You are on the gold plan.");
    }

    #[test]
    fn result_for_a_different_tool_appends_a_new_message() {
        let mut session = ChatSession::new("c-42");
        session.submit("hi");
        session.apply(ChatEvent::tool_call("search_docs", Map::new()));
        session.apply(ChatEvent::tool_result("lookup_account", json!(null)));

        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[1].result, None);
        assert_eq!(session.messages()[2].tool.as_deref(), Some("lookup_account"));
    }

    #[test]
    fn error_ends_the_turn() {
        let mut session = ChatSession::new("c-42");
        session.submit("hi");
        session.apply(ChatEvent::text("partial"));
        session.apply(ChatEvent::error("backend unavailable"));

        assert!(!session.is_processing());
        assert!(!session.messages()[1].is_streaming());
        assert_eq!(session.messages()[2].content, "Error: backend unavailable");

        session.submit("retry");
        session.apply(ChatEvent::Error { message: None });
        assert_eq!(
            session.messages().last().unwrap().content,
            ERROR_FALLBACK_TEXT
        );
    }

    #[test]
    fn cancel_and_reset() {
        let mut session = ChatSession::new("c-42");
        session.submit("hi");
        session.apply(ChatEvent::meta("s-1"));
        session.apply(ChatEvent::text("par"));
        session.cancel();

        assert!(!session.is_processing());
        assert!(!session.messages()[1].is_streaming());

        session.apply(ChatEvent::text("late"));
        assert_eq!(session.messages().len(), 3);

        session.reset();
        assert!(session.messages().is_empty());
        assert_eq!(session.session_id(), None);
        assert_eq!(session.customer_id(), "c-42");
    }

    #[test]
    fn null_result_completes_the_pending_tool_call() {
        let mut session = ChatSession::new("c-42");
        session.submit("look it up");
        session.apply(ChatEvent::from_json(r#"{"type":"tool_call","tool":"lookup"}"#).unwrap());
        session.apply(
            ChatEvent::from_json(r#"{"type":"tool_call","tool":"lookup","result":null}"#).unwrap(),
        );

        let tools = session
            .messages()
            .iter()
            .filter(|message| message.kind == MessageKind::ToolCall)
            .collect::<Vec<_>>();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].result, Some(serde_json::Value::Null));
    }
}
