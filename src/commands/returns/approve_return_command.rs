use crate::{
    auth::AuthUser,
    commands::{ensure_item_vendor, publish_status_change, Command},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{Order, OrderStatus},
    repositories::Store,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Accepts a pending return. The item becomes `returned`, its stock goes back on
/// sale and a paid order is refunded for the line.
#[derive(Debug, Clone, Validate)]
pub struct ApproveReturnCommand {
    pub order_id: Uuid,
    pub item_id: Uuid,
    #[validate(length(max = 500, message = "Comment must be at most 500 characters"))]
    pub comment: Option<String>,
    pub actor: AuthUser,
}

struct Approval {
    order: Order,
    product_id: Uuid,
    quantity: u32,
    refunded: Decimal,
    old_order_status: OrderStatus,
}

#[async_trait::async_trait]
impl Command for ApproveReturnCommand {
    type Result = Order;

    #[instrument(skip(self, store, event_sender), fields(order_id = %self.order_id, item_id = %self.item_id))]
    async fn execute(
        &self,
        store: Arc<Store>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let now = Utc::now();
        let approval = store.orders.update(self.order_id, |order| {
            ensure_item_vendor(order.item(self.item_id)?, &self.actor)?;
            let old_order_status = order.status;

            let item = order.item_mut(self.item_id)?;
            item.approve_return(self.comment.as_deref(), now)?;
            let (product_id, quantity) = (item.product_id, item.quantity);

            let refunded = if order.is_paid() {
                let owed = order.refund_amount_for(order.item(self.item_id)?);
                order.record_refund(owed)
            } else {
                Decimal::ZERO
            };

            order.refresh_status(now);
            Ok(Approval {
                order: order.clone(),
                product_id,
                quantity,
                refunded,
                old_order_status,
            })
        })?;

        store.products.restock(approval.product_id, approval.quantity);

        self.log_and_trigger_event(&event_sender, &approval).await;
        Ok(approval.order)
    }
}

impl ApproveReturnCommand {
    async fn log_and_trigger_event(&self, event_sender: &EventSender, approval: &Approval) {
        info!(
            order_id = %self.order_id,
            item_id = %self.item_id,
            refunded = %approval.refunded,
            "Return approved"
        );

        event_sender
            .send_or_log(Event::ReturnApproved {
                order_id: self.order_id,
                item_id: self.item_id,
            })
            .await;
        event_sender
            .send_or_log(Event::StockRestored {
                product_id: approval.product_id,
                quantity: approval.quantity,
            })
            .await;
        if approval.refunded > Decimal::ZERO {
            event_sender
                .send_or_log(Event::PaymentRefunded {
                    order_id: self.order_id,
                    amount: approval.refunded,
                })
                .await;
        }
        publish_status_change(
            event_sender,
            self.order_id,
            approval.old_order_status,
            approval.order.status,
        )
        .await;
    }
}
