//! Tunables for the coordinator's retry policy (§4.3 "Retry policy",
//! §6.4 `saga.retry.maxAttempts`).

/// How many times a failed step is retried before the coordinator gives up
/// and starts compensation.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: i32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}
