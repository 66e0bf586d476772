//! The saga coordinator (C3): the state machine that turns one inbound
//! event into at most one row mutation and one or more outbound publishes,
//! per the transition table in §4.3.

use std::sync::Arc;

use chrono::Utc;
use common::OrderId;
use saga_broker::Publisher;
use saga_events::inbound::{
    InventoryFailedData, InventoryReservedData, OrderCancelledData, OrderCreatedData,
    OrderDeletedData, OrderStatusData, PaymentFailedData, PaymentProcessedData,
    ShippingFailedData, ShippingPreparedData,
};
use saga_events::outbound::{
    InventoryReleaseCommand, InventoryReservationCommand, OrderCompletedNotification,
    OrderFailedNotification, OrderStatusChangedNotification, PaymentProcessingCommand,
    PaymentRefundCommand, ShippingCancellationCommand, ShippingPreparationCommand,
};
use saga_events::{IngressContext, InboundEvent, NewSaga, ProcessingStatus, SagaRow, SagaStatus, Step};
use saga_store::{EventLogEntry, SagaStore};
use tracing::{info, instrument, warn};

use crate::config::RetryConfig;
use crate::error::Result;

/// Turns inbound events into saga transitions. Stateless itself — all state
/// lives in the row the store hands back — so it's cheap to share across
/// ingress workers behind an `Arc`.
pub struct SagaCoordinator {
    store: Arc<dyn SagaStore>,
    publisher: Publisher,
    retry: RetryConfig,
}

impl SagaCoordinator {
    pub fn new(store: Arc<dyn SagaStore>, publisher: Publisher, retry: RetryConfig) -> Self {
        Self { store, publisher, retry }
    }

    /// Dispatches one decoded event and returns the outcome recorded in the
    /// audit log. Only errors whose [`crate::error::Disposition`] is
    /// `Redeliver` are returned as `Err` — everything else (unknown saga,
    /// idempotent drop, malformed payload) resolves to `Ok` so the caller
    /// acknowledges the message.
    #[instrument(skip(self, event, ctx), fields(topic = %ctx.topic, order_id = %event.order_id()))]
    pub async fn handle(&self, event: InboundEvent, ctx: IngressContext) -> Result<ProcessingStatus> {
        let order_id = event.order_id();

        let (saga_id, status) = match &event {
            InboundEvent::OrderCreated(data) => self.handle_order_created(data, &ctx).await?,
            InboundEvent::PaymentProcessed(data) => self.handle_payment_processed(data).await?,
            InboundEvent::PaymentFailed(data) => self.handle_payment_failed(data).await?,
            InboundEvent::InventoryReserved(data) => self.handle_inventory_reserved(data).await?,
            InboundEvent::InventoryFailed(data) => self.handle_inventory_failed(data).await?,
            InboundEvent::ShippingPrepared(data) => self.handle_shipping_prepared(data).await?,
            InboundEvent::ShippingFailed(data) => self.handle_shipping_failed(data).await?,
            InboundEvent::OrderCancelled(data) => self.handle_order_cancelled(data).await?,
            InboundEvent::OrderShipped(data) => self.handle_force_complete(data).await?,
            InboundEvent::OrderDelivered(data) => self.handle_force_complete(data).await?,
            InboundEvent::OrderDeleted(data) => self.handle_order_deleted(data).await?,
        };

        let entry = EventLogEntry::new(
            saga_id,
            order_id,
            event.topic(),
            serde_json::to_value(&event).unwrap_or(serde_json::Value::Null),
            ctx.correlation_id.clone(),
            status,
            Utc::now(),
        );
        if let Err(e) = self.store.append_event_log(entry).await {
            warn!(error = %e, "failed to append saga event log entry");
        }

        Ok(status)
    }

    async fn handle_order_created(
        &self,
        data: &OrderCreatedData,
        ctx: &IngressContext,
    ) -> Result<(Option<common::SagaId>, ProcessingStatus)> {
        let total_amount = common::Money::from_decimal_str(&data.total_amount)?;
        let currency = common::Currency::new(data.currency.clone())?;

        let new_saga = NewSaga {
            order_id: data.order_id,
            customer_id: data.customer_id.clone(),
            order_number: data.order_number.clone(),
            total_amount,
            currency,
            order_items: data.items.clone(),
            shipping_address: data.shipping_address.clone(),
            billing_address: data.billing_address.clone(),
            correlation_id: ctx.correlation_id.clone(),
            created_at: data.created_at,
        };

        match self.store.create(new_saga).await {
            Ok(row) => {
                self.publish_payment_processing(&row).await?;
                metrics::counter!("saga_created_total").increment(1);
                info!(order_id = %row.order_id, saga_id = %row.saga_id, "saga created");
                Ok((Some(row.saga_id), ProcessingStatus::Applied))
            }
            Err(saga_store::StoreError::AlreadyExists(order_id)) => {
                warn!(%order_id, "duplicate order.created ignored");
                Ok((None, ProcessingStatus::Dropped))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn handle_payment_processed(
        &self,
        data: &PaymentProcessedData,
    ) -> Result<(Option<common::SagaId>, ProcessingStatus)> {
        let Some(mut row) = self.store.find_by_order_id(data.order_id).await? else {
            warn!(order_id = %data.order_id, "payment.processed for unknown saga");
            return Ok((None, ProcessingStatus::Dropped));
        };
        let saga_id = Some(row.saga_id);

        if row.status != SagaStatus::PaymentProcessing {
            return Ok((saga_id, ProcessingStatus::Ignored));
        }

        row.payment_id = Some(data.payment_id.clone());
        row.status = SagaStatus::InventoryProcessing;
        row.current_step = Step::Inventory;
        let row = self.store.save(row).await?;

        self.publisher
            .publish_inventory_reservation(
                &row.correlation_id,
                InventoryReservationCommand {
                    order_id: row.order_id,
                    items: row.order_items.clone(),
                },
            )
            .await?;
        self.publish_status_changed(&row).await?;

        Ok((saga_id, ProcessingStatus::Applied))
    }

    async fn handle_payment_failed(
        &self,
        data: &PaymentFailedData,
    ) -> Result<(Option<common::SagaId>, ProcessingStatus)> {
        let Some(row) = self.store.find_by_order_id(data.order_id).await? else {
            warn!(order_id = %data.order_id, "payment.failed for unknown saga");
            return Ok((None, ProcessingStatus::Dropped));
        };
        let saga_id = Some(row.saga_id);

        if row.status != SagaStatus::PaymentProcessing {
            return Ok((saga_id, ProcessingStatus::Ignored));
        }

        let status = self.retry_or_compensate(row, data.reason.clone()).await?;
        Ok((saga_id, status))
    }

    async fn handle_inventory_reserved(
        &self,
        data: &InventoryReservedData,
    ) -> Result<(Option<common::SagaId>, ProcessingStatus)> {
        let Some(mut row) = self.store.find_by_order_id(data.order_id).await? else {
            warn!(order_id = %data.order_id, "inventory.reserved for unknown saga");
            return Ok((None, ProcessingStatus::Dropped));
        };
        let saga_id = Some(row.saga_id);

        if row.status != SagaStatus::InventoryProcessing {
            return Ok((saga_id, ProcessingStatus::Ignored));
        }

        row.inventory_reservation_id = Some(data.reservation_id.clone());
        row.status = SagaStatus::ShippingProcessing;
        row.current_step = Step::Shipping;
        let row = self.store.save(row).await?;

        self.publisher
            .publish_shipping_preparation(
                &row.correlation_id,
                ShippingPreparationCommand {
                    order_id: row.order_id,
                    shipping_address: row.shipping_address.clone(),
                    billing_address: row.billing_address.clone(),
                },
            )
            .await?;
        self.publish_status_changed(&row).await?;

        Ok((saga_id, ProcessingStatus::Applied))
    }

    async fn handle_inventory_failed(
        &self,
        data: &InventoryFailedData,
    ) -> Result<(Option<common::SagaId>, ProcessingStatus)> {
        let Some(row) = self.store.find_by_order_id(data.order_id).await? else {
            warn!(order_id = %data.order_id, "inventory.failed for unknown saga");
            return Ok((None, ProcessingStatus::Dropped));
        };
        let saga_id = Some(row.saga_id);

        if row.status != SagaStatus::InventoryProcessing {
            return Ok((saga_id, ProcessingStatus::Ignored));
        }

        let status = self.retry_or_compensate(row, data.reason.clone()).await?;
        Ok((saga_id, status))
    }

    async fn handle_shipping_prepared(
        &self,
        data: &ShippingPreparedData,
    ) -> Result<(Option<common::SagaId>, ProcessingStatus)> {
        let Some(mut row) = self.store.find_by_order_id(data.order_id).await? else {
            warn!(order_id = %data.order_id, "shipping.prepared for unknown saga");
            return Ok((None, ProcessingStatus::Dropped));
        };
        let saga_id = Some(row.saga_id);

        if row.status != SagaStatus::ShippingProcessing {
            return Ok((saga_id, ProcessingStatus::Ignored));
        }

        row.shipping_id = Some(data.shipping_id.clone());
        row.status = SagaStatus::Completed;
        row.current_step = Step::Completed;
        row.completed_at = Some(Utc::now());
        let row = self.store.save(row).await?;

        self.publisher
            .publish_order_completed(
                &row.correlation_id,
                OrderCompletedNotification {
                    order_id: row.order_id,
                    shipping_id: row.shipping_id.clone().unwrap_or_default(),
                },
            )
            .await?;

        metrics::counter!("saga_completed_total").increment(1);
        info!(order_id = %row.order_id, saga_id = %row.saga_id, "saga completed");

        Ok((saga_id, ProcessingStatus::Applied))
    }

    async fn handle_shipping_failed(
        &self,
        data: &ShippingFailedData,
    ) -> Result<(Option<common::SagaId>, ProcessingStatus)> {
        let Some(row) = self.store.find_by_order_id(data.order_id).await? else {
            warn!(order_id = %data.order_id, "shipping.failed for unknown saga");
            return Ok((None, ProcessingStatus::Dropped));
        };
        let saga_id = Some(row.saga_id);

        if row.status != SagaStatus::ShippingProcessing {
            return Ok((saga_id, ProcessingStatus::Ignored));
        }

        let status = self.retry_or_compensate(row, data.reason.clone()).await?;
        Ok((saga_id, status))
    }

    async fn handle_order_cancelled(
        &self,
        data: &OrderCancelledData,
    ) -> Result<(Option<common::SagaId>, ProcessingStatus)> {
        let Some(mut row) = self.store.find_by_order_id(data.order_id).await? else {
            info!(order_id = %data.order_id, "order.cancelled for unknown saga");
            return Ok((None, ProcessingStatus::Dropped));
        };
        let saga_id = Some(row.saga_id);

        if row.status.is_terminal() || row.status == SagaStatus::Compensating {
            return Ok((saga_id, ProcessingStatus::Ignored));
        }

        row.error_message = Some(data.reason.clone());
        self.begin_compensation(row).await?;
        Ok((saga_id, ProcessingStatus::Applied))
    }

    async fn handle_force_complete(
        &self,
        data: &OrderStatusData,
    ) -> Result<(Option<common::SagaId>, ProcessingStatus)> {
        let Some(mut row) = self.store.find_by_order_id(data.order_id).await? else {
            info!(order_id = %data.order_id, "order status event for unknown saga");
            return Ok((None, ProcessingStatus::Dropped));
        };
        let saga_id = Some(row.saga_id);

        if row.status.is_terminal() {
            return Ok((saga_id, ProcessingStatus::Ignored));
        }

        row.status = SagaStatus::Completed;
        row.current_step = Step::Completed;
        row.completed_at = Some(Utc::now());
        let row = self.store.save(row).await?;

        self.publisher
            .publish_order_completed(
                &row.correlation_id,
                OrderCompletedNotification {
                    order_id: row.order_id,
                    shipping_id: row.shipping_id.clone().unwrap_or_default(),
                },
            )
            .await?;

        metrics::counter!("saga_completed_total").increment(1);
        Ok((saga_id, ProcessingStatus::Applied))
    }

    async fn handle_order_deleted(
        &self,
        data: &OrderDeletedData,
    ) -> Result<(Option<common::SagaId>, ProcessingStatus)> {
        let Some(row) = self.store.find_by_order_id(data.order_id).await? else {
            info!(order_id = %data.order_id, "order.deleted for unknown saga");
            return Ok((None, ProcessingStatus::Dropped));
        };
        let saga_id = Some(row.saga_id);

        if !row.status.is_terminal() {
            let mut compensating = row;
            compensating.error_message = Some(data.reason.clone());
            self.begin_compensation(compensating).await?;
        }

        if let Some(current) = self.store.find_by_order_id(data.order_id).await? {
            self.store.delete(&current).await?;
        }

        Ok((saga_id, ProcessingStatus::Applied))
    }

    /// Entry point for the reconciler's stuck-sweep (§4.5): a saga that has
    /// sat in a processing state past the stuck threshold is handled exactly
    /// like a step failure — retried if budget remains, compensated if not.
    pub async fn handle_stuck_saga(&self, row: SagaRow) -> Result<ProcessingStatus> {
        self.retry_or_compensate(row, "Saga stuck in processing state".to_string()).await
    }

    /// Retry policy (§4.3): republish the in-flight command with an
    /// incremented retry count if under the limit, otherwise start
    /// compensation.
    async fn retry_or_compensate(&self, mut row: SagaRow, reason: String) -> Result<ProcessingStatus> {
        if row.retry_allowed(self.retry.max_retries) {
            row.retry_count += 1;
            row.error_message = Some(reason);
            let row = self.store.save(row).await?;
            self.republish_current_step(&row).await?;
            metrics::counter!("saga_retry_total").increment(1);
            Ok(ProcessingStatus::Applied)
        } else {
            row.error_message = Some(reason);
            self.begin_compensation(row).await?;
            Ok(ProcessingStatus::Applied)
        }
    }

    async fn republish_current_step(&self, row: &SagaRow) -> Result<()> {
        match row.current_step {
            Step::Payment => self.publish_payment_processing(row).await?,
            Step::Inventory => {
                self.publisher
                    .publish_inventory_reservation(
                        &row.correlation_id,
                        InventoryReservationCommand {
                            order_id: row.order_id,
                            items: row.order_items.clone(),
                        },
                    )
                    .await?
            }
            Step::Shipping => {
                self.publisher
                    .publish_shipping_preparation(
                        &row.correlation_id,
                        ShippingPreparationCommand {
                            order_id: row.order_id,
                            shipping_address: row.shipping_address.clone(),
                            billing_address: row.billing_address.clone(),
                        },
                    )
                    .await?
            }
            Step::Completed => {}
        }
        Ok(())
    }

    /// Compensation (§4.3, §5 I5): undo acquired resources in reverse
    /// acquisition order, emit `order.failed`, and land on `COMPENSATED` —
    /// or `FAILED` if any publish in the sequence errors out. Best-effort:
    /// compensation does not wait for the downstream services to confirm.
    async fn begin_compensation(&self, mut row: SagaRow) -> Result<()> {
        row.status = SagaStatus::Compensating;
        let row = self.store.save(row).await?;
        info!(order_id = %row.order_id, saga_id = %row.saga_id, "saga entering compensation");

        let resources: Vec<(&'static str, String)> = row
            .acquired_resources()
            .into_iter()
            .map(|(kind, id)| (kind, id.to_string()))
            .rev()
            .collect();

        let mut failed_publish = false;
        for (kind, id) in &resources {
            let result = match *kind {
                "shipping" => {
                    self.publisher
                        .publish_shipping_cancellation(
                            &row.correlation_id,
                            ShippingCancellationCommand {
                                order_id: row.order_id,
                                shipping_id: id.clone(),
                            },
                        )
                        .await
                }
                "inventory" => {
                    self.publisher
                        .publish_inventory_release(
                            &row.correlation_id,
                            InventoryReleaseCommand {
                                order_id: row.order_id,
                                reservation_id: id.clone(),
                            },
                        )
                        .await
                }
                "payment" => {
                    self.publisher
                        .publish_payment_refund(
                            &row.correlation_id,
                            PaymentRefundCommand {
                                order_id: row.order_id,
                                payment_id: id.clone(),
                            },
                        )
                        .await
                }
                _ => Ok(()),
            };
            if result.is_err() {
                failed_publish = true;
                break;
            }
        }

        if !failed_publish {
            let notification = OrderFailedNotification {
                order_id: row.order_id,
                reason: row.error_message.clone().unwrap_or_default(),
                failure_step: row.failure_step().to_string(),
            };
            if self.publisher.publish_order_failed(&row.correlation_id, notification).await.is_err() {
                failed_publish = true;
            }
        }

        let mut row = row;
        row.status = if failed_publish { SagaStatus::Failed } else { SagaStatus::Compensated };
        let row = self.store.save(row).await?;

        if failed_publish {
            metrics::counter!("saga_failed_total").increment(1);
            tracing::error!(order_id = %row.order_id, saga_id = %row.saga_id, "compensation publish failed, saga marked FAILED");
        } else {
            metrics::counter!("saga_compensated_total").increment(1);
            warn!(order_id = %row.order_id, saga_id = %row.saga_id, "saga compensated");
        }

        Ok(())
    }

    async fn publish_payment_processing(&self, row: &SagaRow) -> Result<()> {
        self.publisher
            .publish_payment_processing(
                &row.correlation_id,
                PaymentProcessingCommand {
                    order_id: row.order_id,
                    customer_id: row.customer_id.clone(),
                    amount: row.total_amount.to_string(),
                    currency: row.currency.as_str().to_string(),
                },
            )
            .await?;
        Ok(())
    }

    /// Emits `order.status.changed` on the two mid-flight step advances
    /// (payment → inventory, inventory → shipping). The terminal transitions
    /// are covered by the more specific `order.completed` / `order.failed`
    /// notifications instead.
    async fn publish_status_changed(&self, row: &SagaRow) -> Result<()> {
        self.publisher
            .publish_order_status_changed(
                &row.correlation_id,
                OrderStatusChangedNotification {
                    order_id: row.order_id,
                    status: row.status.as_str().to_string(),
                },
            )
            .await?;
        Ok(())
    }
}
