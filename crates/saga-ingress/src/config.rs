//! Ingress wiring config: which topics to subscribe to and how many
//! parallel workers to run against the shared adapter (§5 "target 2-5").

/// The fixed set of inbound topics this system understands (§6.1).
pub const INBOUND_TOPICS: &[&str] = &[
    "order.created",
    "payment.processed",
    "payment.failed",
    "inventory.reserved",
    "inventory.failed",
    "shipping.prepared",
    "shipping.failed",
    "order.cancelled",
    "order.shipped",
    "order.delivered",
    "order.deleted",
];

#[derive(Debug, Clone)]
pub struct IngressConfig {
    pub worker_count: usize,
    pub queue: String,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            worker_count: 3,
            queue: "saga.ingress".to_string(),
        }
    }
}
