//! The reconciler (C5): two independent timers, each a single-threaded
//! sweep loop so a sweep can never overlap itself (§4.5).

use std::sync::Arc;

use chrono::Utc;
use saga_coordinator::SagaCoordinator;
use saga_events::SagaStatus;
use saga_store::SagaStore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::config::ReconcilerConfig;
use crate::error::Result;

/// Statuses the stuck-sweep considers mid-flight (§4.5).
const PROCESSING_STATUSES: [SagaStatus; 3] = [
    SagaStatus::PaymentProcessing,
    SagaStatus::InventoryProcessing,
    SagaStatus::ShippingProcessing,
];

pub struct Reconciler {
    store: Arc<dyn SagaStore>,
    coordinator: Arc<SagaCoordinator>,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(store: Arc<dyn SagaStore>, coordinator: Arc<SagaCoordinator>, config: ReconcilerConfig) -> Self {
        Self { store, coordinator, config }
    }

    /// Finds sagas stuck past the threshold and hands each to the
    /// coordinator's stuck-saga handler, which retries or compensates per
    /// the same budget the event-driven path uses.
    pub async fn run_stuck_sweep_once(&self) -> Result<usize> {
        let threshold = chrono::Duration::from_std(self.config.stuck_threshold)
            .unwrap_or_else(|_| chrono::Duration::seconds(1800));
        let older_than = Utc::now() - threshold;

        let stuck = self.store.find_stuck(&PROCESSING_STATUSES, older_than).await?;
        let mut recovered = 0;
        for row in stuck {
            let order_id = row.order_id;
            match self.coordinator.handle_stuck_saga(row).await {
                Ok(_) => recovered += 1,
                Err(e) => warn!(%order_id, error = %e, "stuck-sweep failed to recover saga"),
            }
        }

        metrics::counter!("reconciler_sweep_total", "kind" => "stuck").increment(1);
        Ok(recovered)
    }

    /// Reserved for future cooled-down retries of `FAILED` sagas (§4.5). A
    /// no-op today: `FAILED` is terminal and nothing currently re-attempts
    /// it, but the timer and the metric exist so that can be added without
    /// touching the scheduling wiring.
    pub async fn run_retry_sweep_once(&self) -> Result<usize> {
        metrics::counter!("reconciler_sweep_total", "kind" => "retry").increment(1);
        Ok(0)
    }

    /// Spawns the stuck-sweep timer as a background task.
    pub fn spawn_stuck_sweep(self: Arc<Self>) -> JoinHandle<()> {
        let interval_duration = self.config.stuck_sweep_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval_duration);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                match self.run_stuck_sweep_once().await {
                    Ok(count) if count > 0 => info!(recovered = count, "stuck-sweep recovered sagas"),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "stuck-sweep failed"),
                }
            }
        })
    }

    /// Spawns the retry-sweep timer as a background task.
    pub fn spawn_retry_sweep(self: Arc<Self>) -> JoinHandle<()> {
        let interval_duration = self.config.retry_sweep_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval_duration);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if let Err(e) = self.run_retry_sweep_once().await {
                    warn!(error = %e, "retry-sweep failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CorrelationId, OrderId};
    use saga_broker::{InMemoryBroker, Publisher};
    use saga_coordinator::RetryConfig;
    use saga_events::{NewSaga, SagaStatus};
    use saga_store::InMemorySagaStore;
    use serde_json::json;
    use std::time::Duration as StdDuration;

    fn harness() -> (Arc<InMemorySagaStore>, Arc<SagaCoordinator>, Arc<InMemoryBroker>) {
        let store = Arc::new(InMemorySagaStore::new());
        let broker = Arc::new(InMemoryBroker::new());
        let publisher = Publisher::new(broker.clone(), "saga.events");
        let coordinator = Arc::new(SagaCoordinator::new(store.clone(), publisher, RetryConfig::default()));
        (store, coordinator, broker)
    }

    #[tokio::test]
    async fn stuck_sweep_retries_a_saga_under_budget() {
        let (store, coordinator, broker) = harness();
        let row = store
            .create(NewSaga {
                order_id: OrderId::new(),
                customer_id: "cust-1".to_string(),
                order_number: "ORD-1".to_string(),
                total_amount: common::Money::from_cents(9999),
                currency: common::Currency::new("USD").unwrap(),
                order_items: json!([]),
                shipping_address: json!({}),
                billing_address: json!({}),
                correlation_id: CorrelationId::new("corr-1"),
                created_at: Utc::now() - chrono::Duration::hours(1),
            })
            .await
            .unwrap();
        assert_eq!(row.status, SagaStatus::PaymentProcessing);

        let config = ReconcilerConfig {
            stuck_sweep_interval: StdDuration::from_secs(900),
            stuck_threshold: StdDuration::from_secs(1800),
            retry_sweep_interval: StdDuration::from_secs(300),
        };
        let reconciler = Reconciler::new(store.clone(), coordinator, config);

        let recovered = reconciler.run_stuck_sweep_once().await.unwrap();
        assert_eq!(recovered, 1);

        let row = store.find_by_order_id(row.order_id).await.unwrap().unwrap();
        assert_eq!(row.status, SagaStatus::PaymentProcessing);
        assert_eq!(row.retry_count, 1);
        assert_eq!(broker.published_count().await, 2); // original publish + retry republish
    }

    #[tokio::test]
    async fn stuck_sweep_ignores_rows_within_threshold() {
        let (store, coordinator, _broker) = harness();
        store
            .create(NewSaga {
                order_id: OrderId::new(),
                customer_id: "cust-1".to_string(),
                order_number: "ORD-1".to_string(),
                total_amount: common::Money::from_cents(9999),
                currency: common::Currency::new("USD").unwrap(),
                order_items: json!([]),
                shipping_address: json!({}),
                billing_address: json!({}),
                correlation_id: CorrelationId::new("corr-1"),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let reconciler = Reconciler::new(store, coordinator, ReconcilerConfig::default());
        let recovered = reconciler.run_stuck_sweep_once().await.unwrap();
        assert_eq!(recovered, 0);
    }

    #[tokio::test]
    async fn retry_sweep_is_a_no_op_hook() {
        let (store, coordinator, _broker) = harness();
        let reconciler = Reconciler::new(store, coordinator, ReconcilerConfig::default());
        assert_eq!(reconciler.run_retry_sweep_once().await.unwrap(), 0);
    }
}
