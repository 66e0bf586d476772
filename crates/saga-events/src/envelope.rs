//! Envelope decoding and correlation id extraction (§4.1 steps 1–2).

use chrono::{DateTime, Utc};
use common::CorrelationId;
use serde::Deserialize;
use serde_json::Value;

use crate::error::EventsError;
use crate::headers::Headers;
use crate::inbound::InboundEvent;

/// The `{id, topic, data, timestamp, correlationId}` wrapper shape that
/// `order.created` may arrive in.
#[derive(Debug, Deserialize)]
struct EnvelopeWrapper {
    #[allow(dead_code)]
    id: Option<String>,
    #[allow(dead_code)]
    topic: Option<String>,
    data: Value,
    #[allow(dead_code)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "correlationId")]
    correlation_id: Option<String>,
}

/// Heuristic for "this is the envelope wrapper, not the event body itself":
/// the wrapper's three extra keys (`id`, `topic`, `data`) don't collide with
/// any inbound event's own field names, so their joint presence is
/// unambiguous.
fn looks_like_envelope(value: &Value) -> bool {
    value.is_object()
        && value.get("data").is_some()
        && value.get("topic").is_some()
        && value.get("id").is_some()
}

/// Decodes one inbound message body for `topic`, and resolves the
/// correlation id to bind to the logging context for this handler
/// invocation, in priority order: event body field, envelope field, the
/// `X-Correlation-ID` header, or a freshly generated id.
pub fn decode_inbound(
    topic: &str,
    body: &[u8],
    headers: &Headers,
) -> Result<(InboundEvent, CorrelationId), EventsError> {
    let raw: Value = serde_json::from_slice(body)?;

    let (event_value, body_correlation_id, envelope_correlation_id) =
        if topic == "order.created" && looks_like_envelope(&raw) {
            let envelope: EnvelopeWrapper = serde_json::from_value(raw)?;
            let body_corr = envelope
                .data
                .get("correlationId")
                .and_then(Value::as_str)
                .map(str::to_string);
            (envelope.data, body_corr, envelope.correlation_id)
        } else {
            let body_corr = raw
                .get("correlationId")
                .and_then(Value::as_str)
                .map(str::to_string);
            (raw, body_corr, None)
        };

    let event = decode_topic_body(topic, event_value)?;

    let correlation_id = body_correlation_id
        .or(envelope_correlation_id)
        .or_else(|| headers.get("X-Correlation-ID").map(str::to_string))
        .map(CorrelationId::new)
        .unwrap_or_else(CorrelationId::generate);

    Ok((event, correlation_id))
}

fn decode_topic_body(topic: &str, value: Value) -> Result<InboundEvent, EventsError> {
    Ok(match topic {
        "order.created" => InboundEvent::OrderCreated(serde_json::from_value(value)?),
        "payment.processed" => InboundEvent::PaymentProcessed(serde_json::from_value(value)?),
        "payment.failed" => InboundEvent::PaymentFailed(serde_json::from_value(value)?),
        "inventory.reserved" => InboundEvent::InventoryReserved(serde_json::from_value(value)?),
        "inventory.failed" => InboundEvent::InventoryFailed(serde_json::from_value(value)?),
        "shipping.prepared" => InboundEvent::ShippingPrepared(serde_json::from_value(value)?),
        "shipping.failed" => InboundEvent::ShippingFailed(serde_json::from_value(value)?),
        "order.cancelled" => InboundEvent::OrderCancelled(serde_json::from_value(value)?),
        "order.shipped" => InboundEvent::OrderShipped(serde_json::from_value(value)?),
        "order.delivered" => InboundEvent::OrderDelivered(serde_json::from_value(value)?),
        "order.deleted" => InboundEvent::OrderDeleted(serde_json::from_value(value)?),
        other => return Err(EventsError::UnknownTopic(other.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_direct_order_created_body() {
        let body = json!({
            "orderId": "11111111-1111-1111-1111-111111111111",
            "customerId": "cust-1",
            "orderNumber": "ORD-1",
            "totalAmount": "99.99",
            "currency": "USD",
            "createdAt": "2026-01-01T00:00:00Z",
            "items": [],
            "shippingAddress": {},
            "billingAddress": {},
        });
        let (event, _) =
            decode_inbound("order.created", body.to_string().as_bytes(), &Headers::new()).unwrap();
        assert_eq!(event.topic(), "order.created");
    }

    #[test]
    fn decodes_enveloped_order_created_body() {
        let inner = json!({
            "orderId": "11111111-1111-1111-1111-111111111111",
            "customerId": "cust-1",
            "orderNumber": "ORD-1",
            "totalAmount": "99.99",
            "currency": "USD",
            "createdAt": "2026-01-01T00:00:00Z",
            "items": [],
            "shippingAddress": {},
            "billingAddress": {},
        });
        let envelope = json!({
            "id": "evt-1",
            "topic": "order.created",
            "data": inner,
            "timestamp": "2026-01-01T00:00:00Z",
            "correlationId": "corr-abc",
        });
        let (event, correlation_id) = decode_inbound(
            "order.created",
            envelope.to_string().as_bytes(),
            &Headers::new(),
        )
        .unwrap();
        assert_eq!(event.topic(), "order.created");
        assert_eq!(correlation_id.as_str(), "corr-abc");
    }

    #[test]
    fn correlation_id_prefers_body_over_header() {
        let body = json!({
            "orderId": "11111111-1111-1111-1111-111111111111",
            "reason": "user",
            "correlationId": "body-corr",
            "cancelledAt": "2026-01-01T00:00:00Z",
        });
        let mut headers = Headers::new();
        headers.insert("X-Correlation-ID", "header-corr");
        let (_, correlation_id) =
            decode_inbound("order.cancelled", body.to_string().as_bytes(), &headers).unwrap();
        assert_eq!(correlation_id.as_str(), "body-corr");
    }

    #[test]
    fn correlation_id_falls_back_to_header_then_generated() {
        let body = json!({
            "orderId": "11111111-1111-1111-1111-111111111111",
            "paymentId": "PAY-1",
            "amount": "10.00",
            "processedAt": "2026-01-01T00:00:00Z",
        });
        let mut headers = Headers::new();
        headers.insert("x-correlation-id", "from-header");
        let (_, correlation_id) =
            decode_inbound("payment.processed", body.to_string().as_bytes(), &headers).unwrap();
        assert_eq!(correlation_id.as_str(), "from-header");

        let (_, generated) =
            decode_inbound("payment.processed", body.to_string().as_bytes(), &Headers::new())
                .unwrap();
        assert!(!generated.as_str().is_empty());
    }

    #[test]
    fn unknown_topic_is_rejected() {
        let err = decode_inbound("mystery.topic", b"{}", &Headers::new()).unwrap_err();
        assert!(matches!(err, EventsError::UnknownTopic(_)));
    }
}
