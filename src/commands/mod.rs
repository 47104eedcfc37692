use crate::{
    auth::AuthUser,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{Order, OrderItem, OrderStatus},
    repositories::Store,
};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub mod orders;
pub mod returns;

/// Command trait for implementing the Command Pattern
///
/// A command validates its own input, applies the change to the store
/// atomically and publishes the resulting domain events.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Arguments
    /// * `store` - Repositories holding the marketplace state
    /// * `event_sender` - Channel to publish domain events
    async fn execute(
        &self,
        store: Arc<Store>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}

/// Customer who placed the order, or an admin.
pub(crate) fn ensure_order_owner(order: &Order, actor: &AuthUser) -> Result<(), ServiceError> {
    if actor.is_admin() || (actor.is_customer() && order.customer_id == actor.user_id) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "order {} does not belong to the caller",
            order.id
        )))
    }
}

/// Vendor who sells the item, or an admin.
pub(crate) fn ensure_item_vendor(item: &OrderItem, actor: &AuthUser) -> Result<(), ServiceError> {
    if actor.is_admin() || (actor.is_vendor() && item.vendor_id == actor.user_id) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "item {} is not sold by the caller",
            item.id
        )))
    }
}

pub(crate) async fn publish_status_change(
    event_sender: &EventSender,
    order_id: Uuid,
    old_status: OrderStatus,
    new_status: OrderStatus,
) {
    if old_status != new_status {
        event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            })
            .await;
    }
}
