#![deny(unsafe_code)]

//! Chat data shapes shared by the conversation view and the streaming backend.

pub mod error;
/// Streaming events emitted by a chat backend and their wire decoding.
pub mod event;
/// Messages as the conversation view consumes them.
pub mod message;
pub mod request;
/// Folding of streaming events into an ordered message list.
pub mod session;

pub use error::{ProtocolError, ProtocolResult};
pub use event::{ChatEvent, EventDecoder};
pub use message::{Message, MessageId, MessageKind, ToolDetails};
pub use request::ChatRequest;
pub use session::{ChatSession, ERROR_FALLBACK_TEXT};
