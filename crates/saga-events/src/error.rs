use thiserror::Error;

/// Errors raised while decoding an inbound message (§7, `DECODE_ERROR`).
#[derive(Debug, Error)]
pub enum EventsError {
    #[error("malformed event payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unrecognized inbound topic: {0}")]
    UnknownTopic(String),
}
