use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{EncodeRequestSnafu, ProtocolResult};

/// Outbound prompt for one assistant turn.
///
/// `session_id` is sent as `null` until the backend has announced a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub customer_id: String,
    pub prompt: String,
}

impl ChatRequest {
    pub fn new(
        session_id: Option<String>,
        customer_id: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            customer_id: customer_id.into(),
            prompt: prompt.into(),
        }
    }

    pub fn to_json(&self) -> ProtocolResult<String> {
        serde_json::to_string(self).context(EncodeRequestSnafu {
            stage: "encode-chat-request",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_session_is_encoded_as_null() {
        let request = ChatRequest::new(None, "c-42", "Tell me about my account");
        let encoded: serde_json::Value =
            serde_json::from_str(&request.to_json().unwrap()).unwrap();

        assert!(encoded["session_id"].is_null());
        assert_eq!(encoded["customer_id"], "c-42");
        assert_eq!(encoded["prompt"], "Tell me about my account");
    }
}
