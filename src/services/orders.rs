use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use super::paginate;
use crate::{
    auth::AuthUser,
    commands::{
        orders::{CancelItemCommand, UpdateItemStatusCommand},
        Command,
    },
    errors::ServiceError,
    events::EventSender,
    models::{CancelReason, ItemStatus, Order, OrderStatus, PaymentMethod, ReturnStatus},
    repositories::Store,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateItemStatusRequest {
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CancelItemRequest {
    pub reason: CancelReason,
}

/// What the caller may do with one order item right now
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ItemActions {
    pub order_id: Uuid,
    pub item_id: Uuid,
    pub current: ItemStatus,
    /// Statuses the item may move to next; at most one
    pub next: Vec<ItemStatus>,
    pub can_cancel: bool,
    pub can_request_return: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_status: Option<ReturnStatus>,
}

/// Service for reading orders and driving item-level changes
#[derive(Clone)]
pub struct OrderService {
    store: Arc<Store>,
    event_sender: Arc<EventSender>,
}

/// Restricts an order to what `actor` may see, or `None` if nothing.
pub(crate) fn scope_order(order: Order, actor: &AuthUser) -> Option<Order> {
    if actor.is_admin() {
        Some(order)
    } else if actor.is_vendor() {
        order
            .involves_vendor(actor.user_id)
            .then(|| order.vendor_view(actor.user_id))
    } else {
        (order.customer_id == actor.user_id).then_some(order)
    }
}

impl OrderService {
    pub fn new(store: Arc<Store>, event_sender: Arc<EventSender>) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    /// Orders outside the caller's scope are reported as missing.
    #[instrument(skip(self))]
    pub async fn get_order(&self, id: Uuid, actor: AuthUser) -> Result<Order, ServiceError> {
        self.store
            .orders
            .find_by_id(id)
            .and_then(|o| scope_order(o, &actor))
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))
    }

    /// Newest first, scoped to the caller.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        actor: AuthUser,
        status: Option<OrderStatus>,
        page: u64,
        limit: u64,
    ) -> (Vec<Order>, u64) {
        let orders = if actor.is_admin() {
            self.store.orders.find_all_newest_first()
        } else if actor.is_vendor() {
            self.store.orders.find_by_vendor(actor.user_id)
        } else {
            self.store.orders.find_by_customer(actor.user_id)
        };

        let scoped: Vec<Order> = orders
            .into_iter()
            .filter_map(|o| scope_order(o, &actor))
            .filter(|o| status.map_or(true, |s| o.status == s))
            .collect();
        paginate(scoped, page, limit)
    }

    /// Allowed next statuses and actions for one item.
    pub async fn item_actions(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        actor: AuthUser,
    ) -> Result<ItemActions, ServiceError> {
        let order = self.get_order(order_id, actor).await?;
        let item = order.item(item_id)?;
        let is_owner = actor.is_customer() && order.customer_id == actor.user_id;
        let can_operate = actor.is_admin() || (actor.is_vendor() && item.vendor_id == actor.user_id);
        // Unpaid online orders cannot ship yet.
        let awaiting_payment = item.item_status == ItemStatus::Processing
            && order.payment_method == PaymentMethod::Online
            && !order.is_paid();

        Ok(ItemActions {
            order_id,
            item_id,
            current: item.item_status,
            next: if can_operate && !awaiting_payment {
                item.allowed_next_statuses()
            } else {
                Vec::new()
            },
            can_cancel: (is_owner || actor.is_admin()) && item.can_cancel(),
            can_request_return: is_owner && item.can_request_return(),
            return_status: item.return_status,
        })
    }

    #[instrument(skip(self))]
    pub async fn update_item_status(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        status: ItemStatus,
        actor: AuthUser,
    ) -> Result<Order, ServiceError> {
        let order = UpdateItemStatusCommand {
            order_id,
            item_id,
            status,
            actor,
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await?;
        Ok(scoped_result(order, &actor))
    }

    #[instrument(skip(self))]
    pub async fn cancel_item(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        reason: CancelReason,
        actor: AuthUser,
    ) -> Result<Order, ServiceError> {
        let order = CancelItemCommand {
            order_id,
            item_id,
            reason,
            actor,
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await?;
        Ok(scoped_result(order, &actor))
    }
}

/// Command results are already authorized; vendors still only see their lines.
pub(crate) fn scoped_result(order: Order, actor: &AuthUser) -> Order {
    if actor.is_vendor() {
        order.vendor_view(actor.user_id)
    } else {
        order
    }
}
