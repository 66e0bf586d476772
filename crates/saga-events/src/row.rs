//! The saga row — the only persistent entity in the system (§3).

use chrono::{DateTime, Utc};
use common::{CorrelationId, Currency, Money, OrderId, SagaId};
use serde::{Deserialize, Serialize};

use crate::state::{SagaStatus, Step};

/// A saga row as persisted by the saga state store.
///
/// `order_items`, `shipping_address`, and `billing_address` are kept as
/// opaque JSON exactly as they arrived on `order.created` — the coordinator
/// never calls back to the originating service, it replays these payloads
/// into the outbound commands it emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaRow {
    pub saga_id: SagaId,
    pub order_id: OrderId,
    pub customer_id: String,
    pub order_number: String,
    pub total_amount: Money,
    pub currency: Currency,
    pub status: SagaStatus,
    pub current_step: Step,
    pub payment_id: Option<String>,
    pub inventory_reservation_id: Option<String>,
    pub shipping_id: Option<String>,
    pub order_items: serde_json::Value,
    pub shipping_address: serde_json::Value,
    pub billing_address: serde_json::Value,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub correlation_id: CorrelationId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: i64,
}

/// Fields needed to create a new saga row; everything else (status, step,
/// resource ids, retry count, version) starts from its initial value.
pub struct NewSaga {
    pub order_id: OrderId,
    pub customer_id: String,
    pub order_number: String,
    pub total_amount: Money,
    pub currency: Currency,
    pub order_items: serde_json::Value,
    pub shipping_address: serde_json::Value,
    pub billing_address: serde_json::Value,
    pub correlation_id: CorrelationId,
    pub created_at: DateTime<Utc>,
}

impl SagaRow {
    /// Creates a new saga row in `PAYMENT_PROCESSING`, fusing the transient
    /// `CREATED` state with the first transition per §4.3.
    pub fn create(new: NewSaga) -> Self {
        Self {
            saga_id: SagaId::new(),
            order_id: new.order_id,
            customer_id: new.customer_id,
            order_number: new.order_number,
            total_amount: new.total_amount,
            currency: new.currency,
            status: SagaStatus::PaymentProcessing,
            current_step: Step::Payment,
            payment_id: None,
            inventory_reservation_id: None,
            shipping_id: None,
            order_items: new.order_items,
            shipping_address: new.shipping_address,
            billing_address: new.billing_address,
            retry_count: 0,
            error_message: None,
            correlation_id: new.correlation_id,
            created_at: new.created_at,
            updated_at: new.created_at,
            completed_at: None,
            version: 0,
        }
    }

    /// Invariant 6 check: is another retry permitted without exceeding
    /// `max_retries`?
    pub fn retry_allowed(&self, max_retries: i32) -> bool {
        self.status.retry_eligible() && self.retry_count < max_retries
    }

    /// The set of resource ids acquired so far, in acquisition order
    /// (payment, then inventory, then shipping) — used to compute the
    /// compensation set (I5).
    pub fn acquired_resources(&self) -> Vec<(&'static str, &str)> {
        let mut acquired = Vec::new();
        if let Some(id) = &self.payment_id {
            acquired.push(("payment", id.as_str()));
        }
        if let Some(id) = &self.inventory_reservation_id {
            acquired.push(("inventory", id.as_str()));
        }
        if let Some(id) = &self.shipping_id {
            acquired.push(("shipping", id.as_str()));
        }
        acquired
    }

    /// The failure step reported on `order.failed`: the first resource slot
    /// among payment/inventory/shipping that is still null.
    pub fn failure_step(&self) -> &'static str {
        if self.payment_id.is_none() {
            "payment"
        } else if self.inventory_reservation_id.is_none() {
            "inventory"
        } else {
            "shipping"
        }
    }

    /// Invariant 3: completion requires both a completion timestamp and a
    /// shipping id.
    pub fn is_validly_completed(&self) -> bool {
        self.status == SagaStatus::Completed
            && self.completed_at.is_some()
            && self.shipping_id.is_some()
    }
}
