//! `messaging.provider` variant selection (§4.4.1, §6.4).

use std::sync::Arc;

use serde::Deserialize;

use crate::adapter::BrokerAdapter;
use crate::amqp::{AmqpBroker, AmqpConfig};
use crate::error::BrokerError;
use crate::memory::InMemoryBroker;
use crate::Result;

/// The `messaging.provider` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagingProvider {
    Amqp,
    InMemory,
    /// Recognized as a valid config value (it is a real deployment target
    /// for this kind of system) but has no compiled adapter in this build.
    Kafka,
}

/// Nested connection settings for the `amqp` provider.
#[derive(Debug, Clone, Deserialize)]
pub struct AmqpSettings {
    pub url: String,
    pub exchange: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_pool_size() -> usize {
    10
}

/// Builds the configured [`BrokerAdapter`], failing loudly for a
/// recognized-but-unimplemented provider rather than silently falling back.
pub async fn build_broker_adapter(
    provider: MessagingProvider,
    amqp: &AmqpSettings,
) -> Result<Arc<dyn BrokerAdapter>> {
    match provider {
        MessagingProvider::Amqp => {
            let config = AmqpConfig {
                url: amqp.url.clone(),
                exchange: amqp.exchange.clone(),
                pool_size: amqp.pool_size,
            };
            let broker = AmqpBroker::new(config).await?;
            broker.initialize().await?;
            Ok(Arc::new(broker))
        }
        MessagingProvider::InMemory => {
            let broker = InMemoryBroker::new();
            broker.initialize().await?;
            Ok(Arc::new(broker))
        }
        MessagingProvider::Kafka => Err(BrokerError::UnsupportedProvider(
            "kafka support requires a compiled adapter not present in this build".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn kafka_provider_fails_loudly() {
        let amqp = AmqpSettings {
            url: "amqp://localhost:5672".to_string(),
            exchange: "saga.events".to_string(),
            pool_size: 10,
        };
        let err = build_broker_adapter(MessagingProvider::Kafka, &amqp)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::UnsupportedProvider(_)));
    }

    #[tokio::test]
    async fn in_memory_provider_builds() {
        let amqp = AmqpSettings {
            url: "amqp://localhost:5672".to_string(),
            exchange: "saga.events".to_string(),
            pool_size: 10,
        };
        let broker = build_broker_adapter(MessagingProvider::InMemory, &amqp)
            .await
            .unwrap();
        assert_eq!(broker.provider_name(), "in_memory");
    }
}
