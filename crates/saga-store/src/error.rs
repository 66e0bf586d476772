use common::OrderId;
use thiserror::Error;

/// Errors that can occur when interacting with the saga state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `create` was called for an order that already has a saga row
    /// (unique constraint on `order_id`); maps to `ALREADY_EXISTS` (§7).
    #[error("saga already exists for order {0}")]
    AlreadyExists(OrderId),

    /// `save` or `delete` was called for a row with no matching order id.
    #[error("no saga row found for order {0}")]
    NotFound(OrderId),

    /// Optimistic concurrency check failed on `save`: maps to `CONFLICT`
    /// (§7) and the caller should reload and retry.
    #[error("version conflict for order {order_id}: expected {expected}, found {actual}")]
    Conflict {
        order_id: OrderId,
        expected: i64,
        actual: i64,
    },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for saga store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
