use thiserror::Error;

/// Errors at the ingress boundary — everything below either surfaces from a
/// broker adapter failure or is forwarded from decoding/coordination.
#[derive(Debug, Error)]
pub enum IngressError {
    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("malformed event payload: {0}")]
    Decode(#[from] saga_events::EventsError),

    #[error("coordinator error: {0}")]
    Coordinator(#[from] saga_coordinator::SagaError),
}

pub type Result<T> = std::result::Result<T, IngressError>;
