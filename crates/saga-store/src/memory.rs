use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use saga_events::{NewSaga, SagaRow, SagaStatus};
use tokio::sync::RwLock;

use crate::log::EventLogEntry;
use crate::store::SagaStore;
use crate::{Result, StoreError};

/// In-memory saga state store for unit and coordinator tests.
///
/// Honors the same `AlreadyExists`/`Conflict`/stuck-query semantics as
/// `PostgresSagaStore` so coordinator tests are implementation-agnostic
/// (§4.2.2).
#[derive(Clone, Default)]
pub struct InMemorySagaStore {
    rows: Arc<RwLock<HashMap<OrderId, SagaRow>>>,
    event_log: Arc<RwLock<Vec<EventLogEntry>>>,
}

impl InMemorySagaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the audit log, for assertions in coordinator tests.
    pub async fn event_log(&self) -> Vec<EventLogEntry> {
        self.event_log.read().await.clone()
    }
}

#[async_trait]
impl SagaStore for InMemorySagaStore {
    async fn create(&self, new: NewSaga) -> Result<SagaRow> {
        let row = SagaRow::create(new);
        let mut rows = self.rows.write().await;
        if rows.contains_key(&row.order_id) {
            return Err(StoreError::AlreadyExists(row.order_id));
        }
        rows.insert(row.order_id, row.clone());
        Ok(row)
    }

    async fn find_by_order_id(&self, order_id: OrderId) -> Result<Option<SagaRow>> {
        Ok(self.rows.read().await.get(&order_id).cloned())
    }

    async fn save(&self, row: SagaRow) -> Result<SagaRow> {
        let mut rows = self.rows.write().await;
        let current = rows
            .get(&row.order_id)
            .ok_or(StoreError::NotFound(row.order_id))?;

        if current.version != row.version {
            return Err(StoreError::Conflict {
                order_id: row.order_id,
                expected: row.version,
                actual: current.version,
            });
        }

        let mut updated = row;
        updated.version += 1;
        updated.updated_at = Utc::now();
        rows.insert(updated.order_id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, row: &SagaRow) -> Result<()> {
        let mut rows = self.rows.write().await;
        rows.remove(&row.order_id)
            .ok_or(StoreError::NotFound(row.order_id))?;
        Ok(())
    }

    async fn find_stuck(
        &self,
        statuses: &[SagaStatus],
        older_than: DateTime<Utc>,
    ) -> Result<Vec<SagaRow>> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|r| statuses.contains(&r.status) && r.updated_at < older_than)
            .cloned()
            .collect())
    }

    async fn count_by_status(&self, status: SagaStatus) -> Result<i64> {
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|r| r.status == status).count() as i64)
    }

    async fn count_by_status_in(&self, statuses: &[SagaStatus]) -> Result<i64> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|r| statuses.contains(&r.status))
            .count() as i64)
    }

    async fn count_stuck(&self, statuses: &[SagaStatus], older_than: DateTime<Utc>) -> Result<i64> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|r| statuses.contains(&r.status) && r.updated_at < older_than)
            .count() as i64)
    }

    async fn append_event_log(&self, entry: EventLogEntry) -> Result<()> {
        self.event_log.write().await.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CorrelationId, Currency, Money};
    use saga_events::ProcessingStatus;
    use serde_json::json;

    fn new_saga(order_id: OrderId) -> NewSaga {
        NewSaga {
            order_id,
            customer_id: "cust-1".to_string(),
            order_number: "ORD-1".to_string(),
            total_amount: Money::from_cents(9999),
            currency: Currency::new("USD").unwrap(),
            order_items: json!([]),
            shipping_address: json!({}),
            billing_address: json!({}),
            correlation_id: CorrelationId::generate(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let store = InMemorySagaStore::new();
        let order_id = OrderId::new();
        let created = store.create(new_saga(order_id)).await.unwrap();

        let found = store.find_by_order_id(order_id).await.unwrap().unwrap();
        assert_eq!(found.saga_id, created.saga_id);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = InMemorySagaStore::new();
        let order_id = OrderId::new();
        store.create(new_saga(order_id)).await.unwrap();

        let err = store.create(new_saga(order_id)).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn save_with_stale_version_conflicts() {
        let store = InMemorySagaStore::new();
        let order_id = OrderId::new();
        let row = store.create(new_saga(order_id)).await.unwrap();

        let saved = store.save(row.clone()).await.unwrap();
        assert_eq!(saved.version, 1);

        let err = store.save(row).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn save_missing_row_is_not_found() {
        let store = InMemorySagaStore::new();
        let row = SagaRow::create(new_saga(OrderId::new()));
        let err = store.save(row).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn find_stuck_honors_status_and_age() {
        let store = InMemorySagaStore::new();
        let order_id = OrderId::new();
        let mut row = store.create(new_saga(order_id)).await.unwrap();
        row.updated_at = Utc::now() - chrono::Duration::hours(1);
        store.save(row).await.unwrap();

        let stuck = store
            .find_stuck(&[SagaStatus::PaymentProcessing], Utc::now() - chrono::Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(stuck.len(), 1);
    }

    #[tokio::test]
    async fn event_log_accumulates_entries() {
        let store = InMemorySagaStore::new();
        let order_id = OrderId::new();
        store
            .append_event_log(EventLogEntry::new(
                None,
                order_id,
                "payment.processed",
                json!({}),
                CorrelationId::generate(),
                ProcessingStatus::Applied,
                Utc::now(),
            ))
            .await
            .unwrap();

        assert_eq!(store.event_log().await.len(), 1);
    }
}
