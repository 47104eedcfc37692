use crate::{
    auth::AuthUser,
    commands::{ensure_item_vendor, Command},
    errors::ServiceError,
    events::{Event, EventSender},
    models::Order,
    repositories::Store,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Declines a pending return. A non-empty comment is mandatory.
#[derive(Debug, Clone, Validate)]
pub struct RejectReturnCommand {
    pub order_id: Uuid,
    pub item_id: Uuid,
    #[validate(length(
        min = 1,
        max = 500,
        message = "Comment must be between 1 and 500 characters"
    ))]
    pub comment: String,
    pub actor: AuthUser,
}

#[async_trait::async_trait]
impl Command for RejectReturnCommand {
    type Result = Order;

    #[instrument(skip(self, store, event_sender), fields(order_id = %self.order_id, item_id = %self.item_id))]
    async fn execute(
        &self,
        store: Arc<Store>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let now = Utc::now();
        let order = store.orders.update(self.order_id, |order| {
            ensure_item_vendor(order.item(self.item_id)?, &self.actor)?;
            order.item_mut(self.item_id)?.reject_return(&self.comment, now)?;
            order.updated_at = now;
            Ok(order.clone())
        })?;

        info!(order_id = %self.order_id, item_id = %self.item_id, "Return rejected");
        event_sender
            .send_or_log(Event::ReturnRejected {
                order_id: self.order_id,
                item_id: self.item_id,
            })
            .await;
        Ok(order)
    }
}
