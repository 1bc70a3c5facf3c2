pub mod conversation_view;
/// Event contracts between the input box and the shell.
pub mod events;
/// Framework-independent rendering decisions for the conversation view.
pub mod layout;
pub mod message_bubble;
pub mod message_input;
pub mod scroll_manager;
pub mod thinking_indicator;

pub use conversation_view::ConversationView;
pub use events::{Stop, Submit};
pub use layout::{
    BubbleKind, BubbleProps, ConversationLayout, SUGGESTED_QUESTIONS, SuggestedQuestion,
};
pub use message_bubble::MessageBubble;
pub use message_input::MessageInput;
pub use scroll_manager::{ScrollManager, ScrollReason, ScrollTrigger};
pub use thinking_indicator::ThinkingIndicator;
