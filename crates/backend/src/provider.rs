use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use chatpane_protocol::{ChatEvent, ChatRequest, ProtocolError};
use snafu::Snafu;
use tokio::sync::{mpsc, oneshot};

/// Pause between streamed chunks when the configuration does not name one.
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(40);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub backend_id: String,
    pub script_path: Option<PathBuf>,
    pub chunk_delay: Duration,
}

impl BackendConfig {
    pub fn new(backend_id: impl Into<String>) -> Self {
        Self {
            backend_id: backend_id.into().trim().to_string(),
            script_path: None,
            chunk_delay: DEFAULT_CHUNK_DELAY,
        }
    }

    pub fn with_script_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.script_path = Some(path.into());
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }
}

pub type BackendWorker = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BackendError {
    #[snafu(display("backend '{backend_id}' is not supported"))]
    UnsupportedBackend {
        stage: &'static str,
        backend_id: String,
    },
    #[snafu(display("chat request for customer '{customer_id}' has an empty prompt"))]
    EmptyPrompt {
        stage: &'static str,
        customer_id: String,
    },
    #[snafu(display("failed to read chat script at {path:?} on `{stage}`: {source}"))]
    ReadScript {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to decode chat script at {path:?} on `{stage}`: {source}"))]
    DecodeScript {
        stage: &'static str,
        path: PathBuf,
        source: ProtocolError,
    },
    #[snafu(display("chat script at {path:?} contains no events"))]
    EmptyScript { stage: &'static str, path: PathBuf },
}

/// Receiving half of one streamed assistant turn.
///
/// Dropping the stream signals cancellation to the worker producing it.
pub struct BackendEventStream {
    events: mpsc::UnboundedReceiver<ChatEvent>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

pub struct BackendStreamHandle {
    pub stream: BackendEventStream,
    pub worker: BackendWorker,
}

impl BackendEventStream {
    pub(crate) fn new(
        events: mpsc::UnboundedReceiver<ChatEvent>,
        cancel_tx: oneshot::Sender<()>,
    ) -> Self {
        Self {
            events,
            cancel_tx: Some(cancel_tx),
        }
    }

    pub async fn recv(&mut self) -> Option<ChatEvent> {
        self.events.recv().await
    }

    pub fn cancel(&mut self) -> bool {
        self.cancel_tx
            .take()
            .map(|tx| tx.send(()).is_ok())
            .unwrap_or(false)
    }
}

impl Drop for BackendEventStream {
    fn drop(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
    }
}

pub trait ChatBackend: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    /// Starts one assistant turn. The returned worker must be spawned on a
    /// tokio runtime; events arrive on the returned stream.
    fn stream_chat(&self, request: ChatRequest) -> BackendResult<BackendStreamHandle>;
}

pub(crate) fn make_event_stream() -> (
    mpsc::UnboundedSender<ChatEvent>,
    BackendEventStream,
    oneshot::Receiver<()>,
) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = oneshot::channel();
    (
        event_tx,
        BackendEventStream::new(event_rx, cancel_tx),
        cancel_rx,
    )
}
