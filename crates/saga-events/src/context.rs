//! Explicit dispatch context, passed as an argument rather than stashed in
//! a thread-local, per §4.1.1.

use chrono::{DateTime, Utc};
use common::CorrelationId;

/// Everything a handler needs to know about the delivery that triggered it.
/// Built once by the ingress layer and threaded explicitly through
/// coordinator → event-log append → publisher, so concurrent workers never
/// cross-contaminate logging context.
#[derive(Debug, Clone)]
pub struct IngressContext {
    pub correlation_id: CorrelationId,
    pub received_at: DateTime<Utc>,
    pub topic: String,
}

impl IngressContext {
    pub fn new(correlation_id: CorrelationId, received_at: DateTime<Utc>, topic: impl Into<String>) -> Self {
        Self {
            correlation_id,
            received_at,
            topic: topic.into(),
        }
    }
}
