//! Inbound event shapes consumed off the topics of §6.1.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

/// One decoded inbound event, tagged with the logical topic it arrived on.
///
/// Modeled as tagged variants rather than a loosely-typed map per the
/// design notes — each variant carries exactly the fields its topic
/// defines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InboundEvent {
    OrderCreated(OrderCreatedData),
    PaymentProcessed(PaymentProcessedData),
    PaymentFailed(PaymentFailedData),
    InventoryReserved(InventoryReservedData),
    InventoryFailed(InventoryFailedData),
    ShippingPrepared(ShippingPreparedData),
    ShippingFailed(ShippingFailedData),
    OrderCancelled(OrderCancelledData),
    OrderShipped(OrderStatusData),
    OrderDelivered(OrderStatusData),
    OrderDeleted(OrderDeletedData),
}

impl InboundEvent {
    /// The logical topic name this event was decoded from, for logging and
    /// the audit log.
    pub fn topic(&self) -> &'static str {
        match self {
            InboundEvent::OrderCreated(_) => "order.created",
            InboundEvent::PaymentProcessed(_) => "payment.processed",
            InboundEvent::PaymentFailed(_) => "payment.failed",
            InboundEvent::InventoryReserved(_) => "inventory.reserved",
            InboundEvent::InventoryFailed(_) => "inventory.failed",
            InboundEvent::ShippingPrepared(_) => "shipping.prepared",
            InboundEvent::ShippingFailed(_) => "shipping.failed",
            InboundEvent::OrderCancelled(_) => "order.cancelled",
            InboundEvent::OrderShipped(_) => "order.shipped",
            InboundEvent::OrderDelivered(_) => "order.delivered",
            InboundEvent::OrderDeleted(_) => "order.deleted",
        }
    }

    /// The order id every inbound event carries, regardless of topic.
    pub fn order_id(&self) -> OrderId {
        match self {
            InboundEvent::OrderCreated(d) => d.order_id,
            InboundEvent::PaymentProcessed(d) => d.order_id,
            InboundEvent::PaymentFailed(d) => d.order_id,
            InboundEvent::InventoryReserved(d) => d.order_id,
            InboundEvent::InventoryFailed(d) => d.order_id,
            InboundEvent::ShippingPrepared(d) => d.order_id,
            InboundEvent::ShippingFailed(d) => d.order_id,
            InboundEvent::OrderCancelled(d) => d.order_id,
            InboundEvent::OrderShipped(d) => d.order_id,
            InboundEvent::OrderDelivered(d) => d.order_id,
            InboundEvent::OrderDeleted(d) => d.order_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedData {
    pub order_id: OrderId,
    #[serde(default)]
    pub correlation_id: Option<String>,
    pub customer_id: String,
    pub order_number: String,
    pub total_amount: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub items: serde_json::Value,
    #[serde(default)]
    pub shipping_address: serde_json::Value,
    #[serde(default)]
    pub billing_address: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentProcessedData {
    pub order_id: OrderId,
    pub payment_id: String,
    pub amount: String,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentFailedData {
    pub order_id: OrderId,
    pub reason: String,
    #[serde(default)]
    pub error_code: Option<String>,
    pub failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryReservedData {
    pub order_id: OrderId,
    pub reservation_id: String,
    pub reserved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryFailedData {
    pub order_id: OrderId,
    pub reason: String,
    #[serde(default)]
    pub error_code: Option<String>,
    pub failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingPreparedData {
    pub order_id: OrderId,
    pub shipping_id: String,
    pub tracking_number: String,
    pub prepared_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingFailedData {
    pub order_id: OrderId,
    pub reason: String,
    #[serde(default)]
    pub error_code: Option<String>,
    pub failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelledData {
    pub order_id: OrderId,
    pub reason: String,
    #[serde(default)]
    pub correlation_id: Option<String>,
    pub cancelled_at: DateTime<Utc>,
}

/// Shared body shape for `order.shipped` and `order.delivered`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusData {
    pub order_id: OrderId,
    pub new_status: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDeletedData {
    pub order_id: OrderId,
    pub reason: String,
    #[serde(default)]
    pub correlation_id: Option<String>,
    pub deleted_at: DateTime<Utc>,
}
