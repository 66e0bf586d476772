//! Outbound event shapes produced on the topics of §6.2.
//!
//! Every variant's payload is later wrapped by the publisher with an
//! ISO-8601 timestamp and an `X-Correlation-Id` header carrying the saga's
//! stored correlation id (I4) — that wrapping is the publisher's job, not
//! this type's, so these structs hold only the body fields.

use common::OrderId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutboundEvent {
    PaymentProcessing(PaymentProcessingCommand),
    InventoryReservation(InventoryReservationCommand),
    ShippingPreparation(ShippingPreparationCommand),
    PaymentRefund(PaymentRefundCommand),
    InventoryRelease(InventoryReleaseCommand),
    ShippingCancellation(ShippingCancellationCommand),
    OrderStatusChanged(OrderStatusChangedNotification),
    OrderCompleted(OrderCompletedNotification),
    OrderFailed(OrderFailedNotification),
}

impl OutboundEvent {
    /// The routing key / logical topic name this event publishes to.
    pub fn topic(&self) -> &'static str {
        match self {
            OutboundEvent::PaymentProcessing(_) => "payment.processing",
            OutboundEvent::InventoryReservation(_) => "inventory.reservation",
            OutboundEvent::ShippingPreparation(_) => "shipping.preparation",
            OutboundEvent::PaymentRefund(_) => "payment.refund",
            OutboundEvent::InventoryRelease(_) => "inventory.release",
            OutboundEvent::ShippingCancellation(_) => "shipping.cancellation",
            OutboundEvent::OrderStatusChanged(_) => "order.status.changed",
            OutboundEvent::OrderCompleted(_) => "order.completed",
            OutboundEvent::OrderFailed(_) => "order.failed",
        }
    }

    /// The order id carried by every outbound event.
    pub fn order_id(&self) -> OrderId {
        match self {
            OutboundEvent::PaymentProcessing(d) => d.order_id,
            OutboundEvent::InventoryReservation(d) => d.order_id,
            OutboundEvent::ShippingPreparation(d) => d.order_id,
            OutboundEvent::PaymentRefund(d) => d.order_id,
            OutboundEvent::InventoryRelease(d) => d.order_id,
            OutboundEvent::ShippingCancellation(d) => d.order_id,
            OutboundEvent::OrderStatusChanged(d) => d.order_id,
            OutboundEvent::OrderCompleted(d) => d.order_id,
            OutboundEvent::OrderFailed(d) => d.order_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentProcessingCommand {
    pub order_id: OrderId,
    pub customer_id: String,
    pub amount: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryReservationCommand {
    pub order_id: OrderId,
    pub items: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingPreparationCommand {
    pub order_id: OrderId,
    pub shipping_address: serde_json::Value,
    pub billing_address: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRefundCommand {
    pub order_id: OrderId,
    pub payment_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryReleaseCommand {
    pub order_id: OrderId,
    pub reservation_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingCancellationCommand {
    pub order_id: OrderId,
    pub shipping_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusChangedNotification {
    pub order_id: OrderId,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCompletedNotification {
    pub order_id: OrderId,
    pub shipping_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFailedNotification {
    pub order_id: OrderId,
    pub reason: String,
    pub failure_step: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names_match_the_outbound_table() {
        let order_id = OrderId::new();
        assert_eq!(
            OutboundEvent::PaymentProcessing(PaymentProcessingCommand {
                order_id,
                customer_id: "c".into(),
                amount: "1.00".into(),
                currency: "USD".into(),
            })
            .topic(),
            "payment.processing"
        );
        assert_eq!(
            OutboundEvent::OrderFailed(OrderFailedNotification {
                order_id,
                reason: "x".into(),
                failure_step: "payment".into(),
            })
            .topic(),
            "order.failed"
        );
    }
}
