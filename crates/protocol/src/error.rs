use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ProtocolError {
    #[snafu(display("failed to decode chat event on line {line} at `{stage}`: {source}"))]
    DecodeEvent {
        stage: &'static str,
        line: usize,
        source: serde_json::Error,
    },
    #[snafu(display("failed to encode chat request at `{stage}`: {source}"))]
    EncodeRequest {
        stage: &'static str,
        source: serde_json::Error,
    },
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
