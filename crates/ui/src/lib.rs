#![deny(unsafe_code)]

/// Window shell wiring the conversation, the input box and the backend together.
pub mod app;
/// Conversation view and its components.
pub mod chat;
/// Settings persistence.
pub mod settings;
