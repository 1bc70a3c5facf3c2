use std::path::Path;
use std::time::Duration;

use chatpane_protocol::{ChatEvent, ChatRequest, EventDecoder};
use futures::StreamExt;
use serde_json::{Map, json};
use snafu::{ResultExt, ensure};
use tokio::sync::{mpsc, oneshot};

use super::provider::{
    BackendConfig, BackendResult, BackendStreamHandle, BackendWorker, ChatBackend,
    DecodeScriptSnafu, EmptyPromptSnafu, EmptyScriptSnafu, ReadScriptSnafu, make_event_stream,
};

pub const SCRIPTED_BACKEND_ID: &str = "scripted";

const CAPABILITIES_TEXT: &str = "I can answer questions about your account, look up recent \
activity, and explain how our products work. What would you like to know?";
const ACCOUNT_PREAMBLE_TEXT: &str = "Let me pull up your account details.";
const ACCOUNT_SUMMARY_TEXT: &str = "Your account is active on the Standard plan, and your next \
statement closes on the 28th.";
const ACCOUNT_TOOL_NAME: &str = "lookup_account";

/// Canned assistant turns used when no script file is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedReply {
    Capabilities,
    Account,
}

impl ScriptedReply {
    /// Picks the canned turn that best matches a prompt.
    pub fn for_prompt(prompt: &str) -> Self {
        if prompt.to_lowercase().contains("account") {
            Self::Account
        } else {
            Self::Capabilities
        }
    }

    pub fn events(self, customer_id: &str) -> Vec<ChatEvent> {
        match self {
            Self::Capabilities => {
                let mut events = text_chunks(CAPABILITIES_TEXT);
                events.push(ChatEvent::finished());
                events
            }
            Self::Account => {
                let mut arguments = Map::new();
                arguments.insert("customer_id".to_string(), json!(customer_id));

                let mut events = text_chunks(ACCOUNT_PREAMBLE_TEXT);
                events.push(ChatEvent::tool_call(ACCOUNT_TOOL_NAME, arguments));
                events.push(ChatEvent::tool_result(
                    ACCOUNT_TOOL_NAME,
                    json!({
                        "customer_id": customer_id,
                        "status": "active",
                        "plan": "Standard",
                        "statement_day": 28,
                    }),
                ));
                events.extend(text_chunks(ACCOUNT_SUMMARY_TEXT));
                events.push(ChatEvent::finished());
                events
            }
        }
    }
}

/// Streams canned or file-provided event sequences as assistant turns.
pub struct ScriptedBackend {
    script: Option<Vec<ChatEvent>>,
    chunk_delay: Duration,
}

impl ScriptedBackend {
    /// Backend answering from the built-in replies.
    pub fn new(chunk_delay: Duration) -> Self {
        Self {
            script: None,
            chunk_delay,
        }
    }

    /// Backend replaying the same event sequence for every prompt.
    pub fn with_script(script: Vec<ChatEvent>, chunk_delay: Duration) -> Self {
        Self {
            script: Some(script),
            chunk_delay,
        }
    }

    pub fn from_config(config: &BackendConfig) -> BackendResult<Self> {
        match &config.script_path {
            Some(path) => Ok(Self::with_script(
                Self::load_script(path)?,
                config.chunk_delay,
            )),
            None => Ok(Self::new(config.chunk_delay)),
        }
    }

    /// Reads a JSON-lines or server-sent-event transcript of chat events.
    pub fn load_script(path: &Path) -> BackendResult<Vec<ChatEvent>> {
        let text = std::fs::read_to_string(path).context(ReadScriptSnafu {
            stage: "read-script-file",
            path: path.to_path_buf(),
        })?;

        let events = EventDecoder::decode_all(&text).context(DecodeScriptSnafu {
            stage: "decode-script-file",
            path: path.to_path_buf(),
        })?;

        ensure!(
            !events.is_empty(),
            EmptyScriptSnafu {
                stage: "validate-script-file",
                path: path.to_path_buf(),
            }
        );

        tracing::info!(path = ?path, event_count = events.len(), "loaded chat script");
        Ok(events)
    }

    fn reply_for(&self, request: &ChatRequest) -> Vec<ChatEvent> {
        let mut events = Vec::new();

        if request.session_id.is_none() {
            events.push(ChatEvent::meta(uuid::Uuid::new_v4().to_string()));
        }

        match &self.script {
            Some(script) => events.extend(script.iter().cloned()),
            None => events.extend(
                ScriptedReply::for_prompt(&request.prompt).events(&request.customer_id),
            ),
        }

        // Every turn ends with a terminal event so the caller can clear its processing state.
        if !events.last().is_some_and(ChatEvent::is_terminal) {
            events.push(ChatEvent::finished());
        }

        events
    }

    async fn run_script_worker(
        events: Vec<ChatEvent>,
        chunk_delay: Duration,
        event_tx: mpsc::UnboundedSender<ChatEvent>,
        mut cancel_rx: oneshot::Receiver<()>,
    ) {
        let total = events.len();
        let mut events = futures::stream::iter(events).enumerate();

        while let Some((index, event)) = events.next().await {
            if event_tx.send(event).is_err() {
                return;
            }

            if index + 1 == total {
                break;
            }

            tokio::select! {
                _ = &mut cancel_rx => {
                    tracing::debug!(sent = index + 1, total, "scripted stream cancelled");
                    return;
                }
                _ = tokio::time::sleep(chunk_delay) => {}
            }
        }

        tracing::debug!(total, "scripted stream finished");
    }
}

impl ChatBackend for ScriptedBackend {
    fn id(&self) -> &str {
        SCRIPTED_BACKEND_ID
    }

    fn name(&self) -> &str {
        "Scripted replies"
    }

    fn stream_chat(&self, request: ChatRequest) -> BackendResult<BackendStreamHandle> {
        ensure!(
            !request.prompt.trim().is_empty(),
            EmptyPromptSnafu {
                stage: "stream-chat",
                customer_id: request.customer_id.clone(),
            }
        );

        let events = self.reply_for(&request);
        let (event_tx, stream, cancel_rx) = make_event_stream();
        let worker: BackendWorker = Box::pin(Self::run_script_worker(
            events,
            self.chunk_delay,
            event_tx,
            cancel_rx,
        ));

        Ok(BackendStreamHandle { stream, worker })
    }
}

/// Splits text into word-sized `text` events, keeping the separating spaces.
fn text_chunks(text: &str) -> Vec<ChatEvent> {
    text.split_inclusive(' ').map(ChatEvent::text).collect()
}
