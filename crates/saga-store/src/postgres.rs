use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CorrelationId, Currency, Money, OrderId, SagaId};
use saga_events::{NewSaga, SagaRow, SagaStatus, Step};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::log::EventLogEntry;
use crate::store::SagaStore;
use crate::{Result, StoreError};

/// PostgreSQL-backed saga state store.
#[derive(Clone)]
pub struct PostgresSagaStore {
    pool: PgPool,
}

impl PostgresSagaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    fn row_to_saga(row: PgRow) -> Result<SagaRow> {
        let status: String = row.try_get("status")?;
        let current_step: String = row.try_get("current_step")?;
        Ok(SagaRow {
            saga_id: SagaId::from_uuid(row.try_get::<Uuid, _>("saga_id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            customer_id: row.try_get("customer_id")?,
            order_number: row.try_get("order_number")?,
            total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
            currency: Currency::new(row.try_get::<String, _>("currency")?)
                .map_err(|e| StoreError::Serialization(serde_json::Error::io(std::io::Error::other(e.to_string()))))?,
            status: parse_status(&status)?,
            current_step: parse_step(&current_step)?,
            payment_id: row.try_get("payment_id")?,
            inventory_reservation_id: row.try_get("inventory_reservation_id")?,
            shipping_id: row.try_get("shipping_id")?,
            order_items: row.try_get("order_items")?,
            shipping_address: row.try_get("shipping_address")?,
            billing_address: row.try_get("billing_address")?,
            retry_count: row.try_get("retry_count")?,
            error_message: row.try_get("error_message")?,
            correlation_id: CorrelationId::new(row.try_get::<String, _>("correlation_id")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            completed_at: row.try_get("completed_at")?,
            version: row.try_get("version")?,
        })
    }
}

fn parse_status(s: &str) -> Result<SagaStatus> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(StoreError::Serialization)
}

fn parse_step(s: &str) -> Result<Step> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(StoreError::Serialization)
}

fn status_text(status: SagaStatus) -> &'static str {
    status.as_str()
}

fn step_text(step: Step) -> String {
    serde_json::to_value(step)
        .expect("Step always serializes")
        .as_str()
        .expect("Step serializes to a string")
        .to_string()
}

const SAGA_COLUMNS: &str = "saga_id, order_id, customer_id, order_number, total_amount_cents, currency, \
     status, current_step, payment_id, inventory_reservation_id, shipping_id, \
     order_items, shipping_address, billing_address, retry_count, error_message, \
     correlation_id, created_at, updated_at, completed_at, version";

#[async_trait]
impl SagaStore for PostgresSagaStore {
    async fn create(&self, new: NewSaga) -> Result<SagaRow> {
        let row = SagaRow::create(new);

        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO order_processing_saga
                ({SAGA_COLUMNS})
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            RETURNING {SAGA_COLUMNS}
            "#
        ))
        .bind(row.saga_id.as_uuid())
        .bind(row.order_id.as_uuid())
        .bind(&row.customer_id)
        .bind(&row.order_number)
        .bind(row.total_amount.cents())
        .bind(row.currency.as_str())
        .bind(status_text(row.status))
        .bind(step_text(row.current_step))
        .bind(&row.payment_id)
        .bind(&row.inventory_reservation_id)
        .bind(&row.shipping_id)
        .bind(&row.order_items)
        .bind(&row.shipping_address)
        .bind(&row.billing_address)
        .bind(row.retry_count)
        .bind(&row.error_message)
        .bind(row.correlation_id.as_str())
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(row.completed_at)
        .bind(row.version)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("order_processing_saga_order_id_key")
            {
                return StoreError::AlreadyExists(row.order_id);
            }
            StoreError::Database(e)
        })?;

        Self::row_to_saga(inserted)
    }

    async fn find_by_order_id(&self, order_id: OrderId) -> Result<Option<SagaRow>> {
        let row = sqlx::query(&format!(
            "SELECT {SAGA_COLUMNS} FROM order_processing_saga WHERE order_id = $1"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_saga).transpose()
    }

    async fn save(&self, row: SagaRow) -> Result<SagaRow> {
        let expected_version = row.version;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(&format!(
            r#"
            UPDATE order_processing_saga SET
                customer_id = $1,
                order_number = $2,
                total_amount_cents = $3,
                currency = $4,
                status = $5,
                current_step = $6,
                payment_id = $7,
                inventory_reservation_id = $8,
                shipping_id = $9,
                order_items = $10,
                shipping_address = $11,
                billing_address = $12,
                retry_count = $13,
                error_message = $14,
                correlation_id = $15,
                completed_at = $16
            WHERE order_id = $17 AND version = $18
            RETURNING {SAGA_COLUMNS}
            "#
        ))
        .bind(&row.customer_id)
        .bind(&row.order_number)
        .bind(row.total_amount.cents())
        .bind(row.currency.as_str())
        .bind(status_text(row.status))
        .bind(step_text(row.current_step))
        .bind(&row.payment_id)
        .bind(&row.inventory_reservation_id)
        .bind(&row.shipping_id)
        .bind(&row.order_items)
        .bind(&row.shipping_address)
        .bind(&row.billing_address)
        .bind(row.retry_count)
        .bind(&row.error_message)
        .bind(row.correlation_id.as_str())
        .bind(row.completed_at)
        .bind(row.order_id.as_uuid())
        .bind(expected_version)
        .fetch_optional(&mut *tx)
        .await?;

        let saga = match updated {
            Some(pg_row) => Self::row_to_saga(pg_row)?,
            None => {
                let actual: Option<i64> = sqlx::query_scalar(
                    "SELECT version FROM order_processing_saga WHERE order_id = $1",
                )
                .bind(row.order_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;

                return Err(match actual {
                    Some(actual) => StoreError::Conflict {
                        order_id: row.order_id,
                        expected: expected_version,
                        actual,
                    },
                    None => StoreError::NotFound(row.order_id),
                });
            }
        };

        tx.commit().await?;
        Ok(saga)
    }

    async fn delete(&self, row: &SagaRow) -> Result<()> {
        let result = sqlx::query("DELETE FROM order_processing_saga WHERE order_id = $1")
            .bind(row.order_id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(row.order_id));
        }
        Ok(())
    }

    async fn find_stuck(
        &self,
        statuses: &[SagaStatus],
        older_than: DateTime<Utc>,
    ) -> Result<Vec<SagaRow>> {
        let statuses: Vec<&'static str> = statuses.iter().copied().map(status_text).collect();
        let rows = sqlx::query(&format!(
            "SELECT {SAGA_COLUMNS} FROM order_processing_saga \
             WHERE status = ANY($1) AND updated_at < $2"
        ))
        .bind(&statuses)
        .bind(older_than)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_saga).collect()
    }

    async fn count_by_status(&self, status: SagaStatus) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM order_processing_saga WHERE status = $1")
                .bind(status_text(status))
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn count_by_status_in(&self, statuses: &[SagaStatus]) -> Result<i64> {
        let statuses: Vec<&'static str> = statuses.iter().copied().map(status_text).collect();
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM order_processing_saga WHERE status = ANY($1)",
        )
        .bind(&statuses)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_stuck(&self, statuses: &[SagaStatus], older_than: DateTime<Utc>) -> Result<i64> {
        let statuses: Vec<&'static str> = statuses.iter().copied().map(status_text).collect();
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM order_processing_saga WHERE status = ANY($1) AND updated_at < $2",
        )
        .bind(&statuses)
        .bind(older_than)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn append_event_log(&self, entry: EventLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO saga_event_log
                (saga_id, order_id, event_type, payload, correlation_id, processing_status, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.saga_id.map(|id| id.as_uuid()))
        .bind(entry.order_id.as_uuid())
        .bind(&entry.event_type)
        .bind(&entry.payload)
        .bind(entry.correlation_id.as_str())
        .bind(serde_json::to_value(entry.processing_status)?.as_str().unwrap())
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
