//! Event shapes, envelope decoding, and the saga row for the
//! order-processing saga coordinator.
//!
//! This crate is pure data plus decode logic — no I/O. The store, broker,
//! and coordinator crates all depend on it.

pub mod context;
pub mod envelope;
pub mod error;
pub mod headers;
pub mod inbound;
pub mod outbound;
pub mod row;
pub mod state;

pub use context::IngressContext;
pub use envelope::decode_inbound;
pub use error::EventsError;
pub use headers::Headers;
pub use inbound::InboundEvent;
pub use outbound::OutboundEvent;
pub use row::{NewSaga, SagaRow};
pub use state::{ProcessingStatus, SagaStatus, Step};
