//! Inbound event subscription and dispatch (C1): the `IngressAdapter` seam,
//! its AMQP and in-memory implementations, and the worker loop that feeds
//! the saga coordinator.

pub mod adapter;
pub mod amqp;
pub mod config;
pub mod error;
pub mod memory;
pub mod worker;

pub use adapter::{IngressAdapter, PendingDelivery};
pub use amqp::{AmqpIngressAdapter, AmqpIngressConfig};
pub use config::{IngressConfig, INBOUND_TOPICS};
pub use error::{IngressError, Result};
pub use memory::{DeliveryOutcome, InMemoryIngressAdapter};
pub use worker::IngressWorker;
