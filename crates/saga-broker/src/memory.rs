use std::sync::Arc;

use async_trait::async_trait;
use saga_events::Headers;
use tokio::sync::RwLock;

use crate::adapter::BrokerAdapter;
use crate::Result;

/// One captured publish, for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPublish {
    pub exchange: String,
    pub routing_key: String,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

/// In-process broker adapter used by tests and local development (§4.4.1).
/// Never touches a socket.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    published: Arc<RwLock<Vec<CapturedPublish>>>,
    fail_on_publish: Arc<RwLock<bool>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_publish(&self, fail: bool) {
        *self.fail_on_publish.write().await = fail;
    }

    pub async fn published(&self) -> Vec<CapturedPublish> {
        self.published.read().await.clone()
    }

    pub async fn published_count(&self) -> usize {
        self.published.read().await.len()
    }
}

#[async_trait]
impl BrokerAdapter for InMemoryBroker {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
        headers: &Headers,
    ) -> Result<()> {
        if *self.fail_on_publish.read().await {
            return Err(crate::error::BrokerError::Connection(
                "in-memory broker configured to fail publishes".to_string(),
            ));
        }
        self.published.write().await.push(CapturedPublish {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            body: body.to_vec(),
            headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        });
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }

    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_is_captured() {
        let broker = InMemoryBroker::new();
        let mut headers = Headers::new();
        headers.insert("X-Correlation-Id", "corr-1");

        broker
            .publish("saga.events", "payment.processing", b"{}", &headers)
            .await
            .unwrap();

        assert_eq!(broker.published_count().await, 1);
        let captured = &broker.published().await[0];
        assert_eq!(captured.routing_key, "payment.processing");
    }

    #[tokio::test]
    async fn set_fail_on_publish_surfaces_an_error() {
        let broker = InMemoryBroker::new();
        broker.set_fail_on_publish(true).await;

        let result = broker
            .publish("saga.events", "payment.processing", b"{}", &Headers::new())
            .await;
        assert!(result.is_err());
    }
}
