use std::sync::Arc;

use chrono::Utc;
use common::{CorrelationId, OrderId};
use criterion::{criterion_group, criterion_main, Criterion};
use saga_broker::{InMemoryBroker, Publisher};
use saga_coordinator::{RetryConfig, SagaCoordinator};
use saga_events::inbound::{InventoryReservedData, OrderCreatedData, PaymentProcessedData, ShippingPreparedData};
use saga_events::{IngressContext, InboundEvent};
use saga_store::InMemorySagaStore;
use serde_json::json;

fn ctx(topic: &str) -> IngressContext {
    IngressContext::new(CorrelationId::new("corr-1"), Utc::now(), topic)
}

fn order_created(order_id: OrderId) -> InboundEvent {
    InboundEvent::OrderCreated(OrderCreatedData {
        order_id,
        correlation_id: Some("corr-1".to_string()),
        customer_id: "cust-1".to_string(),
        order_number: "ORD-1".to_string(),
        total_amount: "99.99".to_string(),
        currency: "USD".to_string(),
        created_at: Utc::now(),
        items: json!([{"productId": "A", "quantity": 1}]),
        shipping_address: json!({"line1": "1 Main St"}),
        billing_address: json!({"line1": "1 Main St"}),
    })
}

fn bench_order_created(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("saga_coordinator/order_created", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = Arc::new(InMemorySagaStore::new());
                let broker = Arc::new(InMemoryBroker::new());
                let publisher = Publisher::new(broker, "saga.events");
                let coordinator = SagaCoordinator::new(store, publisher, RetryConfig::default());
                coordinator
                    .handle(order_created(OrderId::new()), ctx("order.created"))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_full_saga(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("saga_coordinator/full_saga_happy_path", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = Arc::new(InMemorySagaStore::new());
                let broker = Arc::new(InMemoryBroker::new());
                let publisher = Publisher::new(broker, "saga.events");
                let coordinator = SagaCoordinator::new(store, publisher, RetryConfig::default());
                let order_id = OrderId::new();

                coordinator.handle(order_created(order_id), ctx("order.created")).await.unwrap();
                coordinator
                    .handle(
                        InboundEvent::PaymentProcessed(PaymentProcessedData {
                            order_id,
                            payment_id: "pay-1".to_string(),
                            amount: "99.99".to_string(),
                            processed_at: Utc::now(),
                        }),
                        ctx("payment.processed"),
                    )
                    .await
                    .unwrap();
                coordinator
                    .handle(
                        InboundEvent::InventoryReserved(InventoryReservedData {
                            order_id,
                            reservation_id: "res-1".to_string(),
                            reserved_at: Utc::now(),
                        }),
                        ctx("inventory.reserved"),
                    )
                    .await
                    .unwrap();
                coordinator
                    .handle(
                        InboundEvent::ShippingPrepared(ShippingPreparedData {
                            order_id,
                            shipping_id: "ship-1".to_string(),
                            tracking_number: "TRACK-1".to_string(),
                            prepared_at: Utc::now(),
                        }),
                        ctx("shipping.prepared"),
                    )
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_order_created, bench_full_saga);
criterion_main!(benches);
