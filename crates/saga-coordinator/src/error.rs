use common::OrderId;
use thiserror::Error;

/// Errors that can occur while the coordinator handles an inbound event
/// (§7's error taxonomy, folded into one `thiserror` enum per the corpus's
/// layered-error idiom).
#[derive(Debug, Error)]
pub enum SagaError {
    /// `DECODE_ERROR` — malformed envelope or body.
    #[error("malformed event payload: {0}")]
    Decode(#[from] saga_events::EventsError),

    /// A step event referred to an order with no saga row, and the event
    /// was not one of the terminal-lifecycle events that tolerate a miss.
    #[error("no saga found for order {0}")]
    UnknownSaga(OrderId),

    /// `CONFLICT` / `TRANSIENT_IO` — the store or broker hit a recoverable
    /// error; the caller should let the message be redelivered.
    #[error("saga store error: {0}")]
    Store(#[from] saga_store::StoreError),

    /// `FATAL_PUBLISH` / `TRANSIENT_IO` — the broker adapter failed.
    #[error("broker error: {0}")]
    Broker(#[from] saga_broker::BrokerError),

    /// `DECODE_ERROR` — a decoded event carried a value that doesn't parse
    /// into a domain type (e.g. a malformed `totalAmount`).
    #[error("invalid event data: {0}")]
    InvalidEventData(#[from] common::CommonError),
}

/// What the ingress layer should do with a [`SagaError`]: re-raise so the
/// broker redelivers, or log and acknowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Redeliver,
    Drop,
}

impl SagaError {
    pub fn disposition(&self) -> Disposition {
        match self {
            SagaError::Decode(_) => Disposition::Drop,
            SagaError::UnknownSaga(_) => Disposition::Drop,
            SagaError::Store(saga_store::StoreError::AlreadyExists(_)) => Disposition::Drop,
            SagaError::Store(saga_store::StoreError::NotFound(_)) => Disposition::Drop,
            SagaError::Store(saga_store::StoreError::Conflict { .. }) => Disposition::Redeliver,
            SagaError::Store(saga_store::StoreError::Database(_)) => Disposition::Redeliver,
            SagaError::Store(saga_store::StoreError::Migration(_)) => Disposition::Redeliver,
            SagaError::Store(saga_store::StoreError::Serialization(_)) => Disposition::Drop,
            SagaError::Broker(_) => Disposition::Redeliver,
            SagaError::InvalidEventData(_) => Disposition::Drop,
        }
    }
}

pub type Result<T> = std::result::Result<T, SagaError>;
