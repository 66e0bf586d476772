//! AMQP ingress adapter: one durable queue bound to the topic exchange once
//! per logical inbound topic, fed into an internal channel so `recv()` reads
//! like a single stream regardless of how many bindings feed it.

use async_trait::async_trait;
use deadpool_lapin::{Manager, Pool};
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{ConnectionProperties, ExchangeKind};
use saga_events::Headers;
use tokio::sync::{mpsc, Mutex};

use crate::adapter::{IngressAdapter, PendingDelivery};
use crate::error::{IngressError, Result};

#[derive(Debug, Clone)]
pub struct AmqpIngressConfig {
    pub url: String,
    pub exchange: String,
    pub queue: String,
    pub pool_size: usize,
}

impl AmqpIngressConfig {
    pub fn new(url: impl Into<String>, exchange: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            exchange: exchange.into(),
            queue: queue.into(),
            pool_size: 10,
        }
    }
}

/// A queue consumer shared by every ingress worker: `subscribe` binds the
/// topics once, `recv` is called repeatedly (one caller per worker) against
/// the same internal channel.
pub struct AmqpIngressAdapter {
    pool: Pool,
    exchange: String,
    queue: String,
    receiver: Mutex<Option<mpsc::Receiver<Box<dyn PendingDelivery>>>>,
}

impl AmqpIngressAdapter {
    pub fn new(config: AmqpIngressConfig) -> Result<Self> {
        let manager = Manager::new(config.url, ConnectionProperties::default());
        let pool = Pool::builder(manager)
            .max_size(config.pool_size)
            .build()
            .map_err(|e| IngressError::Connection(e.to_string()))?;
        Ok(Self {
            pool,
            exchange: config.exchange,
            queue: config.queue,
            receiver: Mutex::new(None),
        })
    }
}

#[async_trait]
impl IngressAdapter for AmqpIngressAdapter {
    async fn subscribe(&self, topics: &[String]) -> Result<()> {
        let conn = self.pool.get().await.map_err(|e| IngressError::Connection(e.to_string()))?;
        let channel = conn.create_channel().await.map_err(|e| IngressError::Connection(e.to_string()))?;

        channel
            .exchange_declare(
                &self.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .map_err(|e| IngressError::Connection(e.to_string()))?;

        channel
            .queue_declare(
                &self.queue,
                QueueDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .map_err(|e| IngressError::Connection(e.to_string()))?;

        for topic in topics {
            channel
                .queue_bind(&self.queue, &self.exchange, topic, QueueBindOptions::default(), FieldTable::default())
                .await
                .map_err(|e| IngressError::Connection(e.to_string()))?;
        }

        let consumer = channel
            .basic_consume(&self.queue, "saga-ingress", BasicConsumeOptions::default(), FieldTable::default())
            .await
            .map_err(|e| IngressError::Connection(e.to_string()))?;

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            let mut consumer = consumer;
            while let Some(delivery) = consumer.next().await {
                match delivery {
                    Ok(delivery) => {
                        let topic = delivery.routing_key.to_string();
                        let headers = field_table_to_headers(delivery.properties.headers().as_ref());
                        let pending: Box<dyn PendingDelivery> =
                            Box::new(AmqpPendingDelivery { delivery, topic, headers });
                        if tx.send(pending).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "amqp consumer delivery error, stopping consumer task");
                        break;
                    }
                }
            }
            tracing::warn!("amqp consumer stream ended");
        });

        *self.receiver.lock().await = Some(rx);
        Ok(())
    }

    async fn recv(&self) -> Result<Box<dyn PendingDelivery>> {
        let mut guard = self.receiver.lock().await;
        let rx = guard
            .as_mut()
            .ok_or_else(|| IngressError::Connection("subscribe() was not called before recv()".to_string()))?;
        rx.recv()
            .await
            .ok_or_else(|| IngressError::Connection("ingress channel closed".to_string()))
    }
}

struct AmqpPendingDelivery {
    delivery: lapin::message::Delivery,
    topic: String,
    headers: Headers,
}

#[async_trait]
impl PendingDelivery for AmqpPendingDelivery {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn body(&self) -> &[u8] {
        &self.delivery.data
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    async fn ack(self: Box<Self>) -> Result<()> {
        self.delivery
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| IngressError::Connection(e.to_string()))
    }

    async fn nack(self: Box<Self>, requeue: bool) -> Result<()> {
        self.delivery
            .nack(BasicNackOptions { requeue, ..Default::default() })
            .await
            .map_err(|e| IngressError::Connection(e.to_string()))
    }
}

fn field_table_to_headers(table: Option<&FieldTable>) -> Headers {
    let mut headers = Headers::new();
    if let Some(table) = table {
        for (key, value) in table.inner() {
            if let Some(text) = amqp_value_to_string(value) {
                headers.insert(key.to_string(), text);
            }
        }
    }
    headers
}

fn amqp_value_to_string(value: &AMQPValue) -> Option<String> {
    match value {
        AMQPValue::LongString(s) => Some(s.to_string()),
        AMQPValue::ShortString(s) => Some(s.to_string()),
        _ => None,
    }
}
