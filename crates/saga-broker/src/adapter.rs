use async_trait::async_trait;
use saga_events::Headers;

use crate::Result;

/// Capability set a broker implementation must expose (§4.4).
///
/// The outbound publisher is polymorphic over this trait; `AmqpBroker` and
/// `InMemoryBroker` are its two compiled variants.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    /// Publishes `body` to `exchange` with routing key `routing_key` and
    /// the given headers (always including `X-Correlation-Id`).
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
        headers: &Headers,
    ) -> Result<()>;

    /// Lightweight liveness check for readiness reporting.
    async fn is_healthy(&self) -> bool;

    /// A short name identifying the adapter variant, for logging/metrics.
    fn provider_name(&self) -> &'static str;

    /// Performs any one-time setup (e.g. exchange declaration). Called once
    /// at startup before the first publish.
    async fn initialize(&self) -> Result<()>;

    /// Releases held resources (connections, channels) during graceful
    /// shutdown.
    async fn shutdown(&self) -> Result<()>;
}
