//! Saga status and step enums (§4.3, §3 of the specification).

use serde::{Deserialize, Serialize};

/// The state of an order-fulfillment saga in its lifecycle.
///
/// ```text
/// (none) ──► PaymentProcessing ──► PaymentCompleted ──┐
///                   │                                 │
///                   ▼                                 ▼
///              Compensating                  InventoryProcessing ──► InventoryCompleted
///                   │                                                         │
///                   ▼                                                        ▼
///              Compensated                                         ShippingProcessing ──► Completed
/// ```
///
/// `Created` is transient: in practice the handler for `order.created`
/// fuses creation with the first `PaymentProcessing` transition in the same
/// transaction, but the state exists so intermediate observers (e.g. the
/// audit log) can see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SagaStatus {
    Created,
    PaymentProcessing,
    PaymentCompleted,
    InventoryProcessing,
    InventoryCompleted,
    ShippingProcessing,
    Completed,
    Failed,
    Compensating,
    Compensated,
}

impl SagaStatus {
    /// Terminal states: no further event can mutate the saga.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SagaStatus::Completed | SagaStatus::Failed | SagaStatus::Compensated
        )
    }

    /// States eligible for the stuck-sweep (§4.5): mid-flight waiting on a
    /// downstream service reply.
    pub fn is_processing(&self) -> bool {
        matches!(
            self,
            SagaStatus::PaymentProcessing
                | SagaStatus::InventoryProcessing
                | SagaStatus::ShippingProcessing
        )
    }

    /// Invariant 4: retry is never eligible once compensation has begun or
    /// finished, or once the saga has failed outright.
    pub fn retry_eligible(&self) -> bool {
        !matches!(
            self,
            SagaStatus::Compensating | SagaStatus::Compensated | SagaStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStatus::Created => "CREATED",
            SagaStatus::PaymentProcessing => "PAYMENT_PROCESSING",
            SagaStatus::PaymentCompleted => "PAYMENT_COMPLETED",
            SagaStatus::InventoryProcessing => "INVENTORY_PROCESSING",
            SagaStatus::InventoryCompleted => "INVENTORY_COMPLETED",
            SagaStatus::ShippingProcessing => "SHIPPING_PROCESSING",
            SagaStatus::Completed => "COMPLETED",
            SagaStatus::Failed => "FAILED",
            SagaStatus::Compensating => "COMPENSATING",
            SagaStatus::Compensated => "COMPENSATED",
        }
    }
}

impl std::fmt::Display for SagaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The step a saga is currently attempting or has last completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Step {
    Payment,
    Inventory,
    Shipping,
    Completed,
}

impl Step {
    /// The step that follows this one on success, per the fixed sequence
    /// payment → inventory → shipping → completed.
    pub fn next(&self) -> Step {
        match self {
            Step::Payment => Step::Inventory,
            Step::Inventory => Step::Shipping,
            Step::Shipping => Step::Completed,
            Step::Completed => Step::Completed,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Step::Payment => "payment",
            Step::Inventory => "inventory",
            Step::Shipping => "shipping",
            Step::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// Outcome recorded for a processed inbound event in the audit log (§3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    /// The event caused a state transition.
    Applied,
    /// The event matched a saga but was idempotently dropped (terminal
    /// state, already-passed step, or a compensating saga).
    Ignored,
    /// The event could not be matched to any action (e.g. unknown saga for
    /// a non-lifecycle event) and was dropped without touching a row.
    Dropped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(SagaStatus::Completed.is_terminal());
        assert!(SagaStatus::Failed.is_terminal());
        assert!(SagaStatus::Compensated.is_terminal());
        assert!(!SagaStatus::PaymentProcessing.is_terminal());
    }

    #[test]
    fn processing_states() {
        assert!(SagaStatus::PaymentProcessing.is_processing());
        assert!(SagaStatus::InventoryProcessing.is_processing());
        assert!(SagaStatus::ShippingProcessing.is_processing());
        assert!(!SagaStatus::Completed.is_processing());
    }

    #[test]
    fn retry_eligibility_excludes_compensation_and_terminal_failure() {
        assert!(SagaStatus::PaymentProcessing.retry_eligible());
        assert!(!SagaStatus::Compensating.retry_eligible());
        assert!(!SagaStatus::Compensated.retry_eligible());
        assert!(!SagaStatus::Failed.retry_eligible());
    }

    #[test]
    fn step_sequence_is_fixed_and_monotonic() {
        assert_eq!(Step::Payment.next(), Step::Inventory);
        assert_eq!(Step::Inventory.next(), Step::Shipping);
        assert_eq!(Step::Shipping.next(), Step::Completed);
        assert_eq!(Step::Completed.next(), Step::Completed);
    }

    #[test]
    fn status_serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&SagaStatus::PaymentProcessing).unwrap();
        assert_eq!(json, "\"PAYMENT_PROCESSING\"");
    }
}
