use crate::{
    auth::AuthUser,
    commands::Command,
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

/// Opens a return on a delivered item, on behalf of the customer who bought it.
#[derive(Debug, Clone, Validate)]
pub struct RequestReturnCommand {
    pub order_id: Uuid,
    pub item_id: Uuid,
    #[validate(length(
        min = 1,
        max = 500,
        message = "Reason must be between 1 and 500 characters"
    ))]
    pub reason: String,
    pub actor: AuthUser,
}

#[async_trait::async_trait]
impl Command for RequestReturnCommand {
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
            if !(self.actor.is_customer() && order.customer_id == self.actor.user_id) {
                return Err(ServiceError::Forbidden(
                    "only the customer who placed the order can request a return".to_string(),
                ));
            }
            order.item_mut(self.item_id)?.open_return(&self.reason, now)?;
            order.updated_at = now;
            Ok(order.clone())
        })?;

        info!(order_id = %self.order_id, item_id = %self.item_id, "Return requested");
        event_sender
            .send_or_log(Event::ReturnRequested {
                order_id: self.order_id,
                item_id: self.item_id,
            })
            .await;
        Ok(order)
    }
}
