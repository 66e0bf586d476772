use std::time::Duration;

/// Tunables for the two sweep timers (§4.5, §6.4).
#[derive(Debug, Clone, Copy)]
pub struct ReconcilerConfig {
    /// `saga.scheduler.stuck-sagas-rate`, default 15 minutes.
    pub stuck_sweep_interval: Duration,
    /// `saga.stuck.threshold`, default 30 minutes.
    pub stuck_threshold: Duration,
    /// `saga.scheduler.retry-sagas-rate`, default 5 minutes.
    pub retry_sweep_interval: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            stuck_sweep_interval: Duration::from_secs(900),
            stuck_threshold: Duration::from_secs(1800),
            retry_sweep_interval: Duration::from_secs(300),
        }
    }
}
