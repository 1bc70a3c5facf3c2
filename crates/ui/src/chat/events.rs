/// Emitted when the user submits a prompt from the input box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submit {
    pub content: String,
}

impl Submit {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Emitted when the user stops the assistant turn in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stop;
