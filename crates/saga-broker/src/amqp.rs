//! AMQP (RabbitMQ) broker adapter, grounded on the corpus's own choice of
//! `lapin` for topic-exchange messaging.
//!
//! Events are published to a single topic exchange with a routing key equal
//! to the logical topic name (e.g. `payment.processing`); there is no
//! per-consumer queue declaration here since the publisher side never binds
//! a queue.

use async_trait::async_trait;
use deadpool_lapin::{Manager, Pool};
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::{AMQPValue, FieldTable, LongString};
use lapin::{BasicProperties, ExchangeKind};
use saga_events::Headers;
use tracing::{debug, info};

use crate::adapter::BrokerAdapter;
use crate::error::BrokerError;
use crate::Result;

/// Configuration for the AMQP broker adapter.
#[derive(Debug, Clone)]
pub struct AmqpConfig {
    pub url: String,
    pub exchange: String,
    pub pool_size: usize,
}

impl AmqpConfig {
    pub fn new(url: impl Into<String>, exchange: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            exchange: exchange.into(),
            pool_size: 10,
        }
    }
}

pub struct AmqpBroker {
    pool: Pool,
    config: AmqpConfig,
}

impl AmqpBroker {
    /// Creates the connection pool. Does not declare the exchange yet —
    /// call `initialize` before the first publish.
    pub async fn new(config: AmqpConfig) -> Result<Self> {
        let manager = Manager::new(config.url.clone(), Default::default());
        let pool = Pool::builder(manager)
            .max_size(config.pool_size)
            .build()
            .map_err(|e| BrokerError::Connection(format!("failed to build AMQP pool: {e}")))?;

        Ok(Self { pool, config })
    }

    async fn headers_to_field_table(headers: &Headers) -> FieldTable {
        let mut table = FieldTable::default();
        for (name, value) in headers.iter() {
            table.insert(name.into(), AMQPValue::LongString(LongString::from(value)));
        }
        table
    }
}

#[async_trait]
impl BrokerAdapter for AmqpBroker {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
        headers: &Headers,
    ) -> Result<()> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| BrokerError::Connection(format!("failed to get AMQP connection: {e}")))?;
        let channel = conn
            .create_channel()
            .await
            .map_err(|e| BrokerError::Publish {
                topic: routing_key.to_string(),
                source: Box::new(e),
            })?;

        let properties =
            BasicProperties::default().with_headers(Self::headers_to_field_table(headers).await);

        channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                body,
                properties,
            )
            .await
            .map_err(|e| BrokerError::Publish {
                topic: routing_key.to_string(),
                source: Box::new(e),
            })?
            .await
            .map_err(|e| BrokerError::Publish {
                topic: routing_key.to_string(),
                source: Box::new(e),
            })?;

        debug!(exchange, routing_key, "published to AMQP");
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        self.pool.get().await.is_ok()
    }

    fn provider_name(&self) -> &'static str {
        "amqp"
    }

    async fn initialize(&self) -> Result<()> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| BrokerError::Connection(format!("failed to get AMQP connection: {e}")))?;
        let channel = conn
            .create_channel()
            .await
            .map_err(|e| BrokerError::Connection(format!("failed to create AMQP channel: {e}")))?;

        channel
            .exchange_declare(
                &self.config.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Connection(format!("failed to declare exchange: {e}")))?;

        info!(exchange = %self.config.exchange, url = %self.config.url, "AMQP broker initialized");
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.pool.close();
        Ok(())
    }
}
