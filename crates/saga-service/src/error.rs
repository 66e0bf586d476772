use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("unrecognized environment variable(s): {0}")]
    UnknownConfigKeys(String),

    #[error("database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("broker error: {0}")]
    Broker(#[from] saga_broker::BrokerError),

    #[error("ingress error: {0}")]
    Ingress(#[from] saga_ingress::IngressError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
