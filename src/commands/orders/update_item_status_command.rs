use crate::{
    auth::AuthUser,
    commands::{ensure_item_vendor, publish_status_change, Command},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{ItemStatus, Order, OrderStatus, PaymentMethod},
    repositories::Store,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Moves one order item a single step along `processing -> shipped -> delivered`.
#[derive(Debug, Clone)]
pub struct UpdateItemStatusCommand {
    pub order_id: Uuid,
    pub item_id: Uuid,
    pub status: ItemStatus,
    pub actor: AuthUser,
}

struct StatusUpdate {
    order: Order,
    old_item_status: ItemStatus,
    old_order_status: OrderStatus,
}

#[async_trait::async_trait]
impl Command for UpdateItemStatusCommand {
    type Result = Order;

    #[instrument(skip(self, store, event_sender), fields(order_id = %self.order_id, item_id = %self.item_id))]
    async fn execute(
        &self,
        store: Arc<Store>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let now = Utc::now();
        let update = store.orders.update(self.order_id, |order| {
            ensure_item_vendor(order.item(self.item_id)?, &self.actor)?;

            let old_order_status = order.status;
            let old_item_status = order.item_mut(self.item_id)?.advance_to(self.status, now)?;

            if self.status == ItemStatus::Shipped
                && order.payment_method == PaymentMethod::Online
                && !order.is_paid()
            {
                return Err(ServiceError::InvalidOperation(format!(
                    "order {} has not been paid and cannot ship",
                    order.order_number
                )));
            }

            order.refresh_status(now);
            Ok(StatusUpdate {
                order: order.clone(),
                old_item_status,
                old_order_status,
            })
        })?;

        self.log_and_trigger_event(&event_sender, &update).await;
        Ok(update.order)
    }
}

impl UpdateItemStatusCommand {
    async fn log_and_trigger_event(&self, event_sender: &EventSender, update: &StatusUpdate) {
        info!(
            order_id = %self.order_id,
            item_id = %self.item_id,
            from = %update.old_item_status,
            to = %self.status,
            "Order item status updated"
        );

        event_sender
            .send_or_log(Event::OrderItemStatusChanged {
                order_id: self.order_id,
                item_id: self.item_id,
                old_status: update.old_item_status,
                new_status: self.status,
            })
            .await;
        publish_status_change(
            event_sender,
            self.order_id,
            update.old_order_status,
            update.order.status,
        )
        .await;
    }
}
