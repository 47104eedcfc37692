use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Fulfilment status of a single order line.
///
/// Forward chain is `processing -> shipped -> delivered`, one step at a time.
/// `cancelled` and `returned` are terminal.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemStatus {
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl ItemStatus {
    /// The single status an operator may move this item to, if any.
    pub fn next(self) -> Option<ItemStatus> {
        match self {
            ItemStatus::Processing => Some(ItemStatus::Shipped),
            ItemStatus::Shipped => Some(ItemStatus::Delivered),
            ItemStatus::Delivered | ItemStatus::Cancelled | ItemStatus::Returned => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Cancelled | ItemStatus::Returned)
    }

    pub fn is_cancellable(self) -> bool {
        !matches!(
            self,
            ItemStatus::Cancelled | ItemStatus::Returned | ItemStatus::Delivered
        )
    }
}

/// Return sub-state; absent until the customer opens a return.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
}

/// Fixed set of reasons a customer may give when cancelling an item
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CancelReason {
    OrderedByMistake,
    FoundBetterPrice,
    DeliveryTooSlow,
    ChangedMind,
    ShippingAddressIssue,
    Other,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    /// Unit price paid, after offers
    pub price: Decimal,
    pub item_status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_status: Option<ReturnStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_requested_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<CancelReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
}

impl OrderItem {
    pub fn new(
        product_id: Uuid,
        vendor_id: Uuid,
        name: impl Into<String>,
        sku: impl Into<String>,
        quantity: u32,
        price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            vendor_id,
            name: name.into(),
            sku: sku.into(),
            quantity,
            price,
            item_status: ItemStatus::Processing,
            return_status: None,
            return_reason: None,
            return_comment: None,
            return_requested_at: None,
            return_resolved_at: None,
            cancel_reason: None,
            cancelled_at: None,
            shipped_at: None,
            delivered_at: None,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    pub fn allowed_next_statuses(&self) -> Vec<ItemStatus> {
        self.item_status.next().into_iter().collect()
    }

    pub fn can_cancel(&self) -> bool {
        self.item_status.is_cancellable()
    }

    pub fn can_request_return(&self) -> bool {
        self.item_status == ItemStatus::Delivered && self.return_status.is_none()
    }

    /// Moves the item one step forward. Returns the previous status.
    pub fn advance_to(
        &mut self,
        requested: ItemStatus,
        now: DateTime<Utc>,
    ) -> Result<ItemStatus, ServiceError> {
        let current = self.item_status;
        match current.next() {
            Some(next) if next == requested => {}
            Some(next) => {
                return Err(ServiceError::InvalidStatus(format!(
                    "item {} can move from {} to {} only, not {}",
                    self.id, current, next, requested
                )))
            }
            None => {
                return Err(ServiceError::InvalidStatus(format!(
                    "item {} is {} and cannot change status",
                    self.id, current
                )))
            }
        }

        self.item_status = requested;
        match requested {
            ItemStatus::Shipped => self.shipped_at = Some(now),
            ItemStatus::Delivered => self.delivered_at = Some(now),
            _ => {}
        }
        Ok(current)
    }

    pub fn cancel(&mut self, reason: CancelReason, now: DateTime<Utc>) -> Result<(), ServiceError> {
        if !self.can_cancel() {
            return Err(ServiceError::InvalidOperation(format!(
                "item {} is {} and can no longer be cancelled",
                self.id, self.item_status
            )));
        }
        self.item_status = ItemStatus::Cancelled;
        self.cancel_reason = Some(reason);
        self.cancelled_at = Some(now);
        Ok(())
    }

    pub fn open_return(&mut self, reason: &str, now: DateTime<Utc>) -> Result<(), ServiceError> {
        if let Some(existing) = self.return_status {
            return Err(ServiceError::Conflict(format!(
                "item {} already has a {} return",
                self.id, existing
            )));
        }
        if self.item_status != ItemStatus::Delivered {
            return Err(ServiceError::InvalidOperation(format!(
                "item {} is {}; only delivered items can be returned",
                self.id, self.item_status
            )));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::ValidationError(
                "return reason is required".to_string(),
            ));
        }
        self.return_status = Some(ReturnStatus::Pending);
        self.return_reason = Some(reason.to_string());
        self.return_requested_at = Some(now);
        Ok(())
    }

    fn ensure_return_pending(&self) -> Result<(), ServiceError> {
        match self.return_status {
            Some(ReturnStatus::Pending) => Ok(()),
            Some(other) => Err(ServiceError::Conflict(format!(
                "return for item {} is already {}",
                self.id, other
            ))),
            None => Err(ServiceError::NotFound(format!(
                "item {} has no return request",
                self.id
            ))),
        }
    }

    /// Approves a pending return; the item becomes `returned`.
    pub fn approve_return(
        &mut self,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        self.ensure_return_pending()?;
        self.return_status = Some(ReturnStatus::Approved);
        self.return_comment = comment
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        self.return_resolved_at = Some(now);
        self.item_status = ItemStatus::Returned;
        Ok(())
    }

    pub fn reject_return(&mut self, comment: &str, now: DateTime<Utc>) -> Result<(), ServiceError> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(ServiceError::ValidationError(
                "a comment is required to reject a return".to_string(),
            ));
        }
        self.ensure_return_pending()?;
        self.return_status = Some(ReturnStatus::Rejected);
        self.return_comment = Some(comment.to_string());
        self.return_resolved_at = Some(now);
        Ok(())
    }
}
