pub mod config;
pub mod error;
pub mod reconciler;

pub use config::ReconcilerConfig;
pub use error::{ReconcilerError, Result};
pub use reconciler::Reconciler;
