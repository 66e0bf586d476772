//! PostgreSQL integration tests for the saga state store.
//!
//! These tests run serially against a single shared PostgreSQL container.
//!
//! Run with:
//!
//! ```bash
//! cargo test -p saga-store --test postgres_integration
//! ```

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use common::{CorrelationId, Currency, Money, OrderId};
use saga_events::{NewSaga, SagaStatus};
use saga_store::{PostgresSagaStore, SagaStore, StoreError};
use serial_test::serial;
use serde_json::json;
use sqlx::PgPool;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct TestContainer {
    #[allow(dead_code)]
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static TEST_CONTAINER: OnceCell<Arc<TestContainer>> = OnceCell::const_new();
static CONTAINER_ID: OnceLock<String> = OnceLock::new();

#[ctor::dtor]
fn cleanup_container() {
    if let Some(container_id) = CONTAINER_ID.get() {
        let _ = std::process::Command::new("docker")
            .args(["rm", "-f", container_id])
            .output();
    }
}

async fn get_container() -> Arc<TestContainer> {
    TEST_CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default()
                .with_tag("18-alpine")
                .start()
                .await
                .expect("failed to start postgres container");

            let container_id = container.id().to_string();
            let _ = CONTAINER_ID.set(container_id);

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432.tcp()).await.unwrap();
            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            Arc::new(TestContainer {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_store() -> PostgresSagaStore {
    let container = get_container().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(&container.connection_string)
        .await
        .unwrap();

    let store = PostgresSagaStore::new(pool);
    store.run_migrations().await.unwrap();

    sqlx::query("TRUNCATE TABLE order_processing_saga, saga_event_log")
        .execute(store.pool())
        .await
        .unwrap();

    store
}

fn new_saga(order_id: OrderId) -> NewSaga {
    NewSaga {
        order_id,
        customer_id: "cust-1".to_string(),
        order_number: "ORD-1".to_string(),
        total_amount: Money::from_cents(9999),
        currency: Currency::new("USD").unwrap(),
        order_items: json!([{"productId": "A", "quantity": 1}]),
        shipping_address: json!({"line1": "1 Main St"}),
        billing_address: json!({"line1": "1 Main St"}),
        correlation_id: CorrelationId::generate(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
#[serial]
async fn create_and_find_by_order_id() {
    let store = get_test_store().await;
    let order_id = OrderId::new();

    let created = store.create(new_saga(order_id)).await.unwrap();
    assert_eq!(created.status, SagaStatus::PaymentProcessing);
    assert_eq!(created.version, 0);

    let found = store.find_by_order_id(order_id).await.unwrap().unwrap();
    assert_eq!(found.saga_id, created.saga_id);
}

#[tokio::test]
#[serial]
async fn duplicate_create_is_already_exists() {
    let store = get_test_store().await;
    let order_id = OrderId::new();
    store.create(new_saga(order_id)).await.unwrap();

    let err = store.create(new_saga(order_id)).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)));
}

#[tokio::test]
#[serial]
async fn save_bumps_version_and_rejects_stale_writer() {
    let store = get_test_store().await;
    let order_id = OrderId::new();
    let row = store.create(new_saga(order_id)).await.unwrap();

    let mut first_writer = row.clone();
    first_writer.payment_id = Some("PAY-1".to_string());
    let saved = store.save(first_writer).await.unwrap();
    assert_eq!(saved.version, 1);
    assert_eq!(saved.payment_id.as_deref(), Some("PAY-1"));

    let mut stale_writer = row;
    stale_writer.payment_id = Some("PAY-2".to_string());
    let err = store.save(stale_writer).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));
}

#[tokio::test]
#[serial]
async fn find_stuck_filters_by_status_and_age() {
    let store = get_test_store().await;
    let order_id = OrderId::new();
    let row = store.create(new_saga(order_id)).await.unwrap();

    let stuck = store
        .find_stuck(
            &[SagaStatus::PaymentProcessing],
            Utc::now() + chrono::Duration::seconds(1),
        )
        .await
        .unwrap();
    assert_eq!(stuck.len(), 1);
    assert_eq!(stuck[0].order_id, row.order_id);

    let not_stuck = store
        .find_stuck(
            &[SagaStatus::PaymentProcessing],
            Utc::now() - chrono::Duration::hours(1),
        )
        .await
        .unwrap();
    assert!(not_stuck.is_empty());
}

#[tokio::test]
#[serial]
async fn delete_removes_the_row() {
    let store = get_test_store().await;
    let order_id = OrderId::new();
    let row = store.create(new_saga(order_id)).await.unwrap();

    store.delete(&row).await.unwrap();
    assert!(store.find_by_order_id(order_id).await.unwrap().is_none());
}
