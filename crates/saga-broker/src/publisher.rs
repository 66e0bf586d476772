//! The outbound publisher (C4): one typed method per outbound topic,
//! fronting a polymorphic [`BrokerAdapter`].

use std::sync::Arc;

use chrono::Utc;
use common::CorrelationId;
use saga_events::outbound::{
    InventoryReleaseCommand, InventoryReservationCommand, OrderCompletedNotification,
    OrderFailedNotification, OrderStatusChangedNotification, PaymentProcessingCommand,
    PaymentRefundCommand, ShippingCancellationCommand, ShippingPreparationCommand,
};
use saga_events::{Headers, OutboundEvent};
use serde_json::Value;

use crate::adapter::BrokerAdapter;
use crate::Result;

/// Publishes outbound saga events to a single topic exchange, stamping
/// every body with an ISO-8601 timestamp and every header set with
/// `X-Correlation-Id` (§4.4).
pub struct Publisher {
    adapter: Arc<dyn BrokerAdapter>,
    exchange: String,
}

impl Publisher {
    pub fn new(adapter: Arc<dyn BrokerAdapter>, exchange: impl Into<String>) -> Self {
        Self {
            adapter,
            exchange: exchange.into(),
        }
    }

    async fn publish_event(&self, event: OutboundEvent, correlation_id: &CorrelationId) -> Result<()> {
        let topic = event.topic();
        let mut body = body_value(&event)?;
        if let Value::Object(ref mut map) = body {
            map.insert("timestamp".to_string(), Value::String(Utc::now().to_rfc3339()));
        }
        let bytes = serde_json::to_vec(&body)?;

        let mut headers = Headers::new();
        headers.insert("X-Correlation-Id", correlation_id.as_str());

        self.adapter
            .publish(&self.exchange, topic, &bytes, &headers)
            .await
    }

    pub async fn publish_payment_processing(
        &self,
        correlation_id: &CorrelationId,
        command: PaymentProcessingCommand,
    ) -> Result<()> {
        self.publish_event(OutboundEvent::PaymentProcessing(command), correlation_id)
            .await
    }

    pub async fn publish_inventory_reservation(
        &self,
        correlation_id: &CorrelationId,
        command: InventoryReservationCommand,
    ) -> Result<()> {
        self.publish_event(OutboundEvent::InventoryReservation(command), correlation_id)
            .await
    }

    pub async fn publish_shipping_preparation(
        &self,
        correlation_id: &CorrelationId,
        command: ShippingPreparationCommand,
    ) -> Result<()> {
        self.publish_event(OutboundEvent::ShippingPreparation(command), correlation_id)
            .await
    }

    pub async fn publish_payment_refund(
        &self,
        correlation_id: &CorrelationId,
        command: PaymentRefundCommand,
    ) -> Result<()> {
        self.publish_event(OutboundEvent::PaymentRefund(command), correlation_id)
            .await
    }

    pub async fn publish_inventory_release(
        &self,
        correlation_id: &CorrelationId,
        command: InventoryReleaseCommand,
    ) -> Result<()> {
        self.publish_event(OutboundEvent::InventoryRelease(command), correlation_id)
            .await
    }

    pub async fn publish_shipping_cancellation(
        &self,
        correlation_id: &CorrelationId,
        command: ShippingCancellationCommand,
    ) -> Result<()> {
        self.publish_event(OutboundEvent::ShippingCancellation(command), correlation_id)
            .await
    }

    pub async fn publish_order_status_changed(
        &self,
        correlation_id: &CorrelationId,
        notification: OrderStatusChangedNotification,
    ) -> Result<()> {
        self.publish_event(OutboundEvent::OrderStatusChanged(notification), correlation_id)
            .await
    }

    pub async fn publish_order_completed(
        &self,
        correlation_id: &CorrelationId,
        notification: OrderCompletedNotification,
    ) -> Result<()> {
        self.publish_event(OutboundEvent::OrderCompleted(notification), correlation_id)
            .await
    }

    pub async fn publish_order_failed(
        &self,
        correlation_id: &CorrelationId,
        notification: OrderFailedNotification,
    ) -> Result<()> {
        self.publish_event(OutboundEvent::OrderFailed(notification), correlation_id)
            .await
    }
}

/// The JSON body for an outbound event, without the enum's own variant tag
/// — only the inner command/notification fields go on the wire.
fn body_value(event: &OutboundEvent) -> Result<Value> {
    Ok(match event {
        OutboundEvent::PaymentProcessing(d) => serde_json::to_value(d)?,
        OutboundEvent::InventoryReservation(d) => serde_json::to_value(d)?,
        OutboundEvent::ShippingPreparation(d) => serde_json::to_value(d)?,
        OutboundEvent::PaymentRefund(d) => serde_json::to_value(d)?,
        OutboundEvent::InventoryRelease(d) => serde_json::to_value(d)?,
        OutboundEvent::ShippingCancellation(d) => serde_json::to_value(d)?,
        OutboundEvent::OrderStatusChanged(d) => serde_json::to_value(d)?,
        OutboundEvent::OrderCompleted(d) => serde_json::to_value(d)?,
        OutboundEvent::OrderFailed(d) => serde_json::to_value(d)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBroker;
    use common::OrderId;

    #[tokio::test]
    async fn publish_stamps_timestamp_and_correlation_header() {
        let broker = Arc::new(InMemoryBroker::new());
        let publisher = Publisher::new(broker.clone(), "saga.events");
        let correlation_id = CorrelationId::new("corr-1");

        publisher
            .publish_payment_processing(
                &correlation_id,
                PaymentProcessingCommand {
                    order_id: OrderId::new(),
                    customer_id: "cust-1".to_string(),
                    amount: "9.99".to_string(),
                    currency: "USD".to_string(),
                },
            )
            .await
            .unwrap();

        let captured = &broker.published().await[0];
        assert_eq!(captured.routing_key, "payment.processing");
        let body: Value = serde_json::from_slice(&captured.body).unwrap();
        assert!(body.get("timestamp").is_some());
        assert!(captured
            .headers
            .iter()
            .any(|(k, v)| k == "X-Correlation-Id" && v == "corr-1"));
    }
}
