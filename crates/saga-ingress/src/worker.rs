//! The dispatch loop (C1): pulls one delivery at a time, decodes it,
//! dispatches to the coordinator, and resolves ack/nack per §7's
//! redeliver-vs-drop classification.

use std::sync::Arc;

use chrono::Utc;
use saga_coordinator::{Disposition, SagaCoordinator};
use saga_events::{decode_inbound, IngressContext, ProcessingStatus};

use crate::adapter::{IngressAdapter, PendingDelivery};
use crate::error::Result;

/// One worker pulling from a shared [`IngressAdapter`]. Stateless beyond its
/// two `Arc` handles, so the service binary spawns 2–5 of these against the
/// same adapter and coordinator (§5).
pub struct IngressWorker {
    adapter: Arc<dyn IngressAdapter>,
    coordinator: Arc<SagaCoordinator>,
}

impl IngressWorker {
    pub fn new(adapter: Arc<dyn IngressAdapter>, coordinator: Arc<SagaCoordinator>) -> Self {
        Self { adapter, coordinator }
    }

    /// Runs until the adapter's channel closes or `recv` hits an
    /// unrecoverable connection error.
    pub async fn run(&self) -> Result<()> {
        loop {
            let delivery = self.adapter.recv().await?;
            self.process(delivery).await;
        }
    }

    /// Processes exactly one delivery. Never returns an error — every
    /// failure path resolves to an ack or a nack on the delivery itself.
    async fn process(&self, delivery: Box<dyn PendingDelivery>) {
        let topic = delivery.topic().to_string();
        let received_at = Utc::now();

        let (event, correlation_id) = match decode_inbound(&topic, delivery.body(), delivery.headers()) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "dropping undecodable message");
                metrics::counter!("ingress_events_total", "topic" => topic.clone(), "outcome" => "decode_error")
                    .increment(1);
                let _ = delivery.ack().await;
                return;
            }
        };

        let ctx = IngressContext::new(correlation_id, received_at, topic.clone());

        match self.coordinator.handle(event, ctx).await {
            Ok(status) => {
                metrics::counter!("ingress_events_total", "topic" => topic.clone(), "outcome" => processing_status_label(status))
                    .increment(1);
                let _ = delivery.ack().await;
            }
            Err(e) => match e.disposition() {
                Disposition::Redeliver => {
                    tracing::warn!(topic = %topic, error = %e, "redelivering after recoverable error");
                    metrics::counter!("ingress_events_total", "topic" => topic.clone(), "outcome" => "redeliver")
                        .increment(1);
                    let _ = delivery.nack(true).await;
                }
                Disposition::Drop => {
                    tracing::error!(topic = %topic, error = %e, "dropping message after unrecoverable error");
                    metrics::counter!("ingress_events_total", "topic" => topic.clone(), "outcome" => "error_dropped")
                        .increment(1);
                    let _ = delivery.ack().await;
                }
            },
        }
    }
}

fn processing_status_label(status: ProcessingStatus) -> &'static str {
    match status {
        ProcessingStatus::Applied => "applied",
        ProcessingStatus::Ignored => "ignored",
        ProcessingStatus::Dropped => "dropped",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;
    use saga_broker::{InMemoryBroker, Publisher};
    use saga_coordinator::RetryConfig;
    use saga_events::Headers;
    use saga_store::InMemorySagaStore;
    use serde_json::json;

    use crate::memory::{DeliveryOutcome, InMemoryIngressAdapter};

    fn harness() -> (Arc<InMemoryIngressAdapter>, IngressWorker) {
        let adapter = Arc::new(InMemoryIngressAdapter::new());
        let store = Arc::new(InMemorySagaStore::new());
        let broker = Arc::new(InMemoryBroker::new());
        let publisher = Publisher::new(broker, "saga.events");
        let coordinator = Arc::new(SagaCoordinator::new(store, publisher, RetryConfig::default()));
        let worker = IngressWorker::new(adapter.clone(), coordinator);
        (adapter, worker)
    }

    #[tokio::test]
    async fn valid_order_created_is_acked() {
        let (adapter, worker) = harness();
        let order_id = OrderId::new();
        let body = json!({
            "orderId": order_id,
            "customerId": "cust-1",
            "orderNumber": "ORD-1",
            "totalAmount": "99.99",
            "currency": "USD",
            "createdAt": Utc::now(),
            "items": [],
            "shippingAddress": {},
            "billingAddress": {},
        });
        adapter
            .push("order.created", body.to_string().into_bytes(), Headers::new())
            .await;

        let delivery = adapter.recv().await.unwrap();
        worker.process(delivery).await;

        let outcomes = adapter.outcomes().await;
        assert_eq!(outcomes, vec![DeliveryOutcome::Acked("order.created".to_string())]);
    }

    #[tokio::test]
    async fn malformed_payload_is_acked_not_requeued() {
        let (adapter, worker) = harness();
        adapter.push("order.created", b"not json".to_vec(), Headers::new()).await;

        let delivery = adapter.recv().await.unwrap();
        worker.process(delivery).await;

        let outcomes = adapter.outcomes().await;
        assert_eq!(outcomes, vec![DeliveryOutcome::Acked("order.created".to_string())]);
    }

    #[tokio::test]
    async fn unknown_saga_step_event_is_acked() {
        let (adapter, worker) = harness();
        let body = json!({
            "orderId": OrderId::new(),
            "paymentId": "pay-1",
            "amount": "10.00",
            "processedAt": Utc::now(),
        });
        adapter
            .push("payment.processed", body.to_string().into_bytes(), Headers::new())
            .await;

        let delivery = adapter.recv().await.unwrap();
        worker.process(delivery).await;

        let outcomes = adapter.outcomes().await;
        assert_eq!(outcomes, vec![DeliveryOutcome::Acked("payment.processed".to_string())]);
    }
}
