use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{orders::scoped_result, paginate};
use crate::{
    auth::AuthUser,
    commands::{
        returns::{ApproveReturnCommand, RejectReturnCommand, RequestReturnCommand},
        Command,
    },
    errors::ServiceError,
    events::EventSender,
    models::{ItemStatus, Order, ReturnStatus},
    repositories::Store,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RequestReturnBody {
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ApproveReturnBody {
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RejectReturnBody {
    #[serde(default)]
    pub comment: String,
}

/// One return request as seen by the vendor or admin handling it
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReturnRecord {
    pub order_id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub item_status: ItemStatus,
    pub return_status: ReturnStatus,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub requested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// What the customer gets back if the return is approved
    pub refund_amount: Decimal,
}

fn records_for(order: &Order) -> impl Iterator<Item = ReturnRecord> + '_ {
    order.items.iter().filter_map(move |item| {
        Some(ReturnRecord {
            order_id: order.id,
            order_number: order.order_number.clone(),
            customer_id: order.customer_id,
            item_id: item.id,
            product_id: item.product_id,
            vendor_id: item.vendor_id,
            name: item.name.clone(),
            quantity: item.quantity,
            item_status: item.item_status,
            return_status: item.return_status?,
            reason: item.return_reason.clone().unwrap_or_default(),
            comment: item.return_comment.clone(),
            requested_at: item.return_requested_at?,
            resolved_at: item.return_resolved_at,
            refund_amount: order.refund_amount_for(item),
        })
    })
}

/// Return requests on order items
#[derive(Clone)]
pub struct ReturnService {
    store: Arc<Store>,
    event_sender: Arc<EventSender>,
}

impl ReturnService {
    pub fn new(store: Arc<Store>, event_sender: Arc<EventSender>) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    #[instrument(skip(self, reason))]
    pub async fn request_return(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        reason: String,
        actor: AuthUser,
    ) -> Result<Order, ServiceError> {
        RequestReturnCommand {
            order_id,
            item_id,
            reason,
            actor,
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await
    }

    #[instrument(skip(self, comment))]
    pub async fn approve_return(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        comment: Option<String>,
        actor: AuthUser,
    ) -> Result<Order, ServiceError> {
        let order = ApproveReturnCommand {
            order_id,
            item_id,
            comment,
            actor,
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await?;
        Ok(scoped_result(order, &actor))
    }

    #[instrument(skip(self, comment))]
    pub async fn reject_return(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        comment: String,
        actor: AuthUser,
    ) -> Result<Order, ServiceError> {
        let order = RejectReturnCommand {
            order_id,
            item_id,
            comment,
            actor,
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await?;
        Ok(scoped_result(order, &actor))
    }

    /// Returns on the vendor's items (all items for admins), newest request first.
    #[instrument(skip(self))]
    pub async fn list_returns(
        &self,
        actor: AuthUser,
        status: Option<ReturnStatus>,
        page: u64,
        limit: u64,
    ) -> (Vec<ReturnRecord>, u64) {
        let mut records: Vec<ReturnRecord> = self
            .store
            .orders
            .find_with_returns()
            .iter()
            .flat_map(records_for)
            .filter(|r| actor.is_admin() || r.vendor_id == actor.user_id)
            .filter(|r| status.map_or(true, |s| r.return_status == s))
            .collect();
        records.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        paginate(records, page, limit)
    }
}
