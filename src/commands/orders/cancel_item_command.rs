use crate::{
    auth::AuthUser,
    commands::{ensure_order_owner, publish_status_change, Command},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{CancelReason, Order, OrderStatus},
    repositories::Store,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Cancels one item that has not been delivered yet.
#[derive(Debug, Clone)]
pub struct CancelItemCommand {
    pub order_id: Uuid,
    pub item_id: Uuid,
    pub reason: CancelReason,
    pub actor: AuthUser,
}

struct Cancellation {
    order: Order,
    product_id: Uuid,
    quantity: u32,
    refunded: Decimal,
    old_order_status: OrderStatus,
}

#[async_trait::async_trait]
impl Command for CancelItemCommand {
    type Result = Order;

    #[instrument(skip(self, store, event_sender), fields(order_id = %self.order_id, item_id = %self.item_id))]
    async fn execute(
        &self,
        store: Arc<Store>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let now = Utc::now();
        let cancellation = store.orders.update(self.order_id, |order| {
            ensure_order_owner(order, &self.actor)?;
            let old_order_status = order.status;

            let item = order.item_mut(self.item_id)?;
            item.cancel(self.reason, now)?;
            let (product_id, quantity) = (item.product_id, item.quantity);

            let refunded = if order.is_paid() {
                let owed = order.refund_amount_for(order.item(self.item_id)?);
                order.record_refund(owed)
            } else {
                Decimal::ZERO
            };

            order.refresh_status(now);
            Ok(Cancellation {
                order: order.clone(),
                product_id,
                quantity,
                refunded,
                old_order_status,
            })
        })?;

        store
            .products
            .restock(cancellation.product_id, cancellation.quantity);

        self.log_and_trigger_event(&event_sender, &cancellation).await;
        Ok(cancellation.order)
    }
}

impl CancelItemCommand {
    async fn log_and_trigger_event(&self, event_sender: &EventSender, cancellation: &Cancellation) {
        info!(
            order_id = %self.order_id,
            item_id = %self.item_id,
            reason = %self.reason,
            refunded = %cancellation.refunded,
            "Order item cancelled"
        );

        event_sender
            .send_or_log(Event::OrderItemCancelled {
                order_id: self.order_id,
                item_id: self.item_id,
                reason: self.reason,
            })
            .await;
        event_sender
            .send_or_log(Event::StockRestored {
                product_id: cancellation.product_id,
                quantity: cancellation.quantity,
            })
            .await;
        if cancellation.refunded > Decimal::ZERO {
            event_sender
                .send_or_log(Event::PaymentRefunded {
                    order_id: self.order_id,
                    amount: cancellation.refunded,
                })
                .await;
        }
        publish_status_change(
            event_sender,
            self.order_id,
            cancellation.old_order_status,
            cancellation.order.status,
        )
        .await;
    }
}
