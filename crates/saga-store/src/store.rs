use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use saga_events::{NewSaga, SagaRow, SagaStatus};

use crate::log::EventLogEntry;
use crate::Result;

/// Core trait for saga state store implementations (§4.2).
///
/// A saga row is the only persistent entity in the system; an implementation
/// must make `create` and `save` atomic with respect to concurrent callers
/// on the same order id. All implementations must be thread-safe.
#[async_trait]
pub trait SagaStore: Send + Sync {
    /// Creates a new saga row for an order, fusing `CREATED` with the first
    /// `PAYMENT_PROCESSING` transition (§4.3). Fails with
    /// `StoreError::AlreadyExists` if a row already exists for this order.
    async fn create(&self, new: NewSaga) -> Result<SagaRow>;

    /// Looks up the saga row for an order, if any.
    async fn find_by_order_id(&self, order_id: OrderId) -> Result<Option<SagaRow>>;

    /// Persists a mutated row with an optimistic version check: the row's
    /// `version` field is the version it was loaded at. On success the
    /// returned row has `version` incremented and `updated_at` refreshed.
    /// Fails with `StoreError::Conflict` if the stored version has since
    /// moved (I2, I7).
    async fn save(&self, row: SagaRow) -> Result<SagaRow>;

    /// Deletes a saga row outright, used only by the `order.deleted`
    /// handler (§4.3 transition table).
    async fn delete(&self, row: &SagaRow) -> Result<()>;

    /// Finds rows in one of `statuses` whose `updated_at` is older than
    /// `older_than` — candidates for the stuck-sweep (§4.5).
    async fn find_stuck(
        &self,
        statuses: &[SagaStatus],
        older_than: DateTime<Utc>,
    ) -> Result<Vec<SagaRow>>;

    /// Counts rows currently in `status`.
    async fn count_by_status(&self, status: SagaStatus) -> Result<i64>;

    /// Counts rows currently in any of `statuses`.
    async fn count_by_status_in(&self, statuses: &[SagaStatus]) -> Result<i64>;

    /// Counts rows matching the stuck-sweep predicate, without fetching them.
    async fn count_stuck(&self, statuses: &[SagaStatus], older_than: DateTime<Utc>) -> Result<i64>;

    /// Appends one row to the audit log (§3.1). Never fails the caller's
    /// transition on its own account in the in-memory store; the Postgres
    /// store writes it in the same transaction as the row mutation it
    /// accompanies.
    async fn append_event_log(&self, entry: EventLogEntry) -> Result<()>;
}
