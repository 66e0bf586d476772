//! The ingress-side counterpart of `saga_broker::BrokerAdapter`: a seam for
//! "how do we receive the next message", so the coordinator's dispatch loop
//! runs identically against AMQP or a test double.

use async_trait::async_trait;
use saga_events::Headers;

use crate::error::Result;

/// One message pulled off the broker, not yet acknowledged. The dispatch
/// loop consumes `self` into exactly one of `ack`/`nack`, so a delivery can
/// never be accidentally resolved twice.
#[async_trait]
pub trait PendingDelivery: Send + Sync {
    /// The logical topic this message arrived on (the AMQP routing key).
    fn topic(&self) -> &str;
    fn body(&self) -> &[u8];
    fn headers(&self) -> &Headers;

    /// Acknowledge successful (or intentionally dropped) processing.
    async fn ack(self: Box<Self>) -> Result<()>;

    /// Reject the message. `requeue` distinguishes a transient failure
    /// (broker should redeliver) from a permanent one (dead-letter/drop).
    async fn nack(self: Box<Self>, requeue: bool) -> Result<()>;
}

/// Subscribes to a fixed set of logical topics and hands back deliveries one
/// at a time. Implementations own their own internal buffering; `recv`
/// simply awaits the next delivery across every subscribed topic.
#[async_trait]
pub trait IngressAdapter: Send + Sync {
    async fn subscribe(&self, topics: &[String]) -> Result<()>;

    async fn recv(&self) -> Result<Box<dyn PendingDelivery>>;
}
