use thiserror::Error;

/// Errors raised while constructing a value type in this crate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommonError {
    #[error("amount must be non-negative, got {0} cents")]
    NegativeAmount(i64),

    #[error("could not parse monetary amount: {0}")]
    InvalidAmount(String),

    #[error("currency code must be 3 ASCII letters, got {0:?}")]
    InvalidCurrency(String),
}
