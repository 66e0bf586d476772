use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("saga store error: {0}")]
    Store(#[from] saga_store::StoreError),

    #[error("saga coordinator error: {0}")]
    Coordinator(#[from] saga_coordinator::SagaError),
}

pub type Result<T> = std::result::Result<T, ReconcilerError>;
