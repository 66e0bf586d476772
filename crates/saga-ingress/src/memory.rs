//! In-memory ingress adapter: lets coordinator/worker tests push a raw
//! delivery and assert on whether it was acked or nacked, without a broker.

use std::sync::Arc;

use async_trait::async_trait;
use saga_events::Headers;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::adapter::{IngressAdapter, PendingDelivery};
use crate::error::{IngressError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Acked(String),
    Nacked(String, bool),
}

pub struct InMemoryIngressAdapter {
    sender: mpsc::Sender<Box<dyn PendingDelivery>>,
    receiver: Mutex<mpsc::Receiver<Box<dyn PendingDelivery>>>,
    log: Arc<RwLock<Vec<DeliveryOutcome>>>,
}

impl InMemoryIngressAdapter {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel(1024);
        Self {
            sender,
            receiver: Mutex::new(receiver),
            log: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Enqueues a raw delivery as if it had just arrived off the broker.
    pub async fn push(&self, topic: impl Into<String>, body: Vec<u8>, headers: Headers) {
        let pending: Box<dyn PendingDelivery> = Box::new(InMemoryPendingDelivery {
            topic: topic.into(),
            body,
            headers,
            log: self.log.clone(),
        });
        let _ = self.sender.send(pending).await;
    }

    pub async fn outcomes(&self) -> Vec<DeliveryOutcome> {
        self.log.read().await.clone()
    }
}

impl Default for InMemoryIngressAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IngressAdapter for InMemoryIngressAdapter {
    async fn subscribe(&self, _topics: &[String]) -> Result<()> {
        Ok(())
    }

    async fn recv(&self) -> Result<Box<dyn PendingDelivery>> {
        let mut guard = self.receiver.lock().await;
        guard
            .recv()
            .await
            .ok_or_else(|| IngressError::Connection("in-memory ingress channel closed".to_string()))
    }
}

struct InMemoryPendingDelivery {
    topic: String,
    body: Vec<u8>,
    headers: Headers,
    log: Arc<RwLock<Vec<DeliveryOutcome>>>,
}

#[async_trait]
impl PendingDelivery for InMemoryPendingDelivery {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    async fn ack(self: Box<Self>) -> Result<()> {
        self.log.write().await.push(DeliveryOutcome::Acked(self.topic.clone()));
        Ok(())
    }

    async fn nack(self: Box<Self>, requeue: bool) -> Result<()> {
        self.log.write().await.push(DeliveryOutcome::Nacked(self.topic.clone(), requeue));
        Ok(())
    }
}
