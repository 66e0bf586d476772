//! Outbound message broker adapter and publisher (§4.4).
//!
//! [`BrokerAdapter`] is the polymorphism seam; [`AmqpBroker`] and
//! [`InMemoryBroker`] are its two compiled variants, selected at startup via
//! [`config::build_broker_adapter`]. [`Publisher`] exposes the typed
//! per-topic publish methods the coordinator calls.

pub mod adapter;
pub mod amqp;
pub mod config;
pub mod error;
pub mod memory;
pub mod publisher;

pub use adapter::BrokerAdapter;
pub use amqp::{AmqpBroker, AmqpConfig};
pub use config::{build_broker_adapter, AmqpSettings, MessagingProvider};
pub use error::{BrokerError, Result};
pub use memory::{CapturedPublish, InMemoryBroker};
pub use publisher::Publisher;
