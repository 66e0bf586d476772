//! Order-processing saga coordinator process entry point.

mod config;
mod error;

use std::sync::Arc;
use std::time::Duration;

use saga_broker::{build_broker_adapter, Publisher};
use saga_coordinator::{RetryConfig, SagaCoordinator};
use saga_ingress::{AmqpIngressAdapter, AmqpIngressConfig, IngressAdapter, IngressWorker, INBOUND_TOPICS};
use saga_reconciler::Reconciler;
use saga_store::PostgresSagaStore;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::SagaConfig;
use crate::error::Result;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration — fails fast on an unrecognized env var.
    let config = SagaConfig::from_env()?;

    // 2. Initialize tracing.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(?config, "loaded configuration");

    // 3. Connect to Postgres and run migrations.
    let pool = PgPoolOptions::new()
        .max_connections(config.database.pool_size)
        .acquire_timeout(Duration::from_millis(config.database.connect_timeout_ms))
        .connect(&config.database.url)
        .await?;
    let store = Arc::new(PostgresSagaStore::new(pool));
    store.run_migrations().await?;
    tracing::info!("database migrations applied");

    // 4. Build the configured broker adapter (publish side) and the
    //    coordinator that sits on top of it.
    let broker = build_broker_adapter(config.messaging.provider, &config.messaging.amqp_settings()).await?;
    let publisher = Publisher::new(broker, "saga.events");
    let retry = RetryConfig {
        max_retries: config.retry.max_attempts,
    };
    let coordinator = Arc::new(SagaCoordinator::new(store.clone(), publisher, retry));

    // 5. Build the ingress adapter (consume side) and spawn its workers.
    let ingress_config = AmqpIngressConfig::new(
        config.messaging.amqp_url.clone(),
        config.messaging.amqp_exchange.clone(),
        config.messaging.amqp_queue.clone(),
    );
    let ingress_adapter = Arc::new(AmqpIngressAdapter::new(ingress_config)?);
    let topics: Vec<String> = INBOUND_TOPICS.iter().map(|t| t.to_string()).collect();
    ingress_adapter.subscribe(&topics).await?;
    tracing::info!(topics = ?INBOUND_TOPICS, "subscribed to inbound topics");

    let mut worker_handles = Vec::with_capacity(config.ingress_worker_count);
    for worker_id in 0..config.ingress_worker_count {
        let worker = IngressWorker::new(ingress_adapter.clone(), coordinator.clone());
        worker_handles.push(tokio::spawn(async move {
            tracing::info!(worker_id, "ingress worker started");
            if let Err(e) = worker.run().await {
                tracing::error!(worker_id, error = %e, "ingress worker exited");
            }
        }));
    }

    // 6. Start the reconciler's background sweeps.
    let reconciler = Arc::new(Reconciler::new(
        store.clone(),
        coordinator.clone(),
        config.scheduler.to_reconciler_config(),
    ));
    let stuck_sweep_handle = reconciler.clone().spawn_stuck_sweep();
    let retry_sweep_handle = reconciler.spawn_retry_sweep();

    tracing::info!("saga service running");

    // 7. Wait for a shutdown signal, then abort the background tasks. In
    //    the absence of an HTTP surface there is nothing to drain via
    //    `axum`'s graceful shutdown; the ingress workers are aborted
    //    directly, same effect within the configured drain timeout.
    shutdown_signal().await;

    stuck_sweep_handle.abort();
    retry_sweep_handle.abort();
    for handle in worker_handles {
        handle.abort();
    }
    tokio::time::sleep(Duration::from_millis(config.shutdown_drain_timeout_ms.min(1_000))).await;

    tracing::info!("saga service shut down gracefully");
    Ok(())
}
