use thiserror::Error;

/// Errors raised by a broker adapter (`TRANSIENT_IO`/`FATAL_PUBLISH`, §7).
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker connection failed: {0}")]
    Connection(String),

    #[error("publish failed on topic {topic}: {source}")]
    Publish {
        topic: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("could not encode outbound event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("unsupported messaging provider: {0} (recognized but not implemented in this build)")]
    UnsupportedProvider(String),
}

pub type Result<T> = std::result::Result<T, BrokerError>;
