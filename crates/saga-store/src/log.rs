//! The append-only audit log of every inbound event the coordinator has
//! seen (§3.1).

use chrono::{DateTime, Utc};
use common::{CorrelationId, OrderId, SagaId};
use saga_events::ProcessingStatus;

/// One row of `saga_event_log`: a record of an inbound event the ingress
/// layer handed to the coordinator, and what it did about it.
///
/// `saga_id` is `None` for events that never matched a saga at all (e.g. a
/// step event for an unknown order), per §3.1.
#[derive(Debug, Clone)]
pub struct EventLogEntry {
    pub saga_id: Option<SagaId>,
    pub order_id: OrderId,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub correlation_id: CorrelationId,
    pub processing_status: ProcessingStatus,
    pub recorded_at: DateTime<Utc>,
}

impl EventLogEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        saga_id: Option<SagaId>,
        order_id: OrderId,
        event_type: impl Into<String>,
        payload: serde_json::Value,
        correlation_id: CorrelationId,
        processing_status: ProcessingStatus,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            saga_id,
            order_id,
            event_type: event_type.into(),
            payload,
            correlation_id,
            processing_status,
            recorded_at,
        }
    }
}
