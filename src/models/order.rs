use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::order_item::{ItemStatus, OrderItem};
use super::round_money;
use crate::errors::ServiceError;

/// Order-level status, derived from the statuses of its items
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery
    Cod,
    /// Prepaid through the payment gateway
    Online,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    PartiallyRefunded,
    Refunded,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 120, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(min = 10, max = 15, message = "Phone must be 10-15 characters"))]
    pub phone: String,
    #[validate(length(min = 1, max = 200, message = "Address line is required"))]
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 100, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 3, max = 12, message = "Postal code must be 3-12 characters"))]
    pub postal_code: String,
    #[validate(length(min = 2, max = 60, message = "Country is required"))]
    pub country: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub coupon_discount: Decimal,
    pub total: Decimal,
    pub refunded_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
    pub ordered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// `ORD-YYYYMMDD-XXXXXXXX`
pub fn generate_order_number(now: DateTime<Utc>, id: Uuid) -> String {
    let suffix: String = id.simple().to_string()[..8].to_ascii_uppercase();
    format!("ORD-{}-{}", now.format("%Y%m%d"), suffix)
}

impl Order {
    pub fn item(&self, item_id: Uuid) -> Result<&OrderItem, ServiceError> {
        self.items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("item {} not found in order {}", item_id, self.id))
            })
    }

    pub fn item_mut(&mut self, item_id: Uuid) -> Result<&mut OrderItem, ServiceError> {
        let order_id = self.id;
        self.items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("item {} not found in order {}", item_id, order_id))
            })
    }

    pub fn involves_vendor(&self, vendor_id: Uuid) -> bool {
        self.items.iter().any(|i| i.vendor_id == vendor_id)
    }

    /// Copy of the order restricted to one vendor's lines.
    pub fn vendor_view(&self, vendor_id: Uuid) -> Order {
        let mut view = self.clone();
        view.items.retain(|i| i.vendor_id == vendor_id);
        view
    }

    pub fn is_paid(&self) -> bool {
        matches!(
            self.payment_status,
            PaymentStatus::Paid | PaymentStatus::PartiallyRefunded
        )
    }

    /// Derives the order status from its items.
    pub fn derive_status(&self) -> OrderStatus {
        let active: Vec<ItemStatus> = self
            .items
            .iter()
            .map(|i| i.item_status)
            .filter(|s| *s != ItemStatus::Cancelled)
            .collect();

        if active.is_empty() {
            OrderStatus::Cancelled
        } else if active.iter().all(|s| *s == ItemStatus::Returned) {
            OrderStatus::Returned
        } else if active
            .iter()
            .all(|s| matches!(s, ItemStatus::Delivered | ItemStatus::Returned))
        {
            OrderStatus::Delivered
        } else if active.iter().all(|s| {
            matches!(
                s,
                ItemStatus::Shipped | ItemStatus::Delivered | ItemStatus::Returned
            )
        }) {
            OrderStatus::Shipped
        } else {
            OrderStatus::Processing
        }
    }

    /// Recomputes `status` and stamps order-level milestones.
    ///
    /// A cash-on-delivery order counts as paid once everything is delivered.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) {
        let status = self.derive_status();
        if matches!(
            status,
            OrderStatus::Shipped | OrderStatus::Delivered | OrderStatus::Returned
        ) && self.shipped_at.is_none()
        {
            self.shipped_at = Some(now);
        }
        if matches!(status, OrderStatus::Delivered | OrderStatus::Returned)
            && self.delivered_at.is_none()
        {
            self.delivered_at = Some(now);
            if self.payment_method == PaymentMethod::Cod
                && self.payment_status == PaymentStatus::Pending
            {
                self.settle_payment();
            }
        }
        self.status = status;
        self.updated_at = now;
    }

    /// Marks the order paid and returns the amount owed back for lines
    /// cancelled before payment, which is recorded as refunded.
    pub fn settle_payment(&mut self) -> Decimal {
        self.payment_status = PaymentStatus::Paid;
        let uncollected: Decimal = self
            .items
            .iter()
            .filter(|i| i.item_status == ItemStatus::Cancelled)
            .map(|i| self.refund_amount_for(i))
            .sum();
        if uncollected.is_zero() {
            Decimal::ZERO
        } else {
            self.record_refund(uncollected)
        }
    }

    /// Amount owed back for one line: its total less its share of the coupon.
    pub fn refund_amount_for(&self, item: &OrderItem) -> Decimal {
        if self.subtotal.is_zero() {
            return Decimal::ZERO;
        }
        let line = item.line_total();
        let share = self.coupon_discount * line / self.subtotal;
        round_money(line - share).max(Decimal::ZERO)
    }

    /// Records a refund and returns the amount actually applied.
    pub fn record_refund(&mut self, amount: Decimal) -> Decimal {
        let remaining = (self.total - self.refunded_amount).max(Decimal::ZERO);
        let applied = amount.min(remaining);
        self.refunded_amount += applied;
        self.payment_status = if self.refunded_amount >= self.total {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order_item::CancelReason;
    use rust_decimal_macros::dec;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Asha Rao".into(),
            phone: "9876543210".into(),
            line1: "12 MG Road".into(),
            line2: None,
            city: "Bengaluru".into(),
            state: "KA".into(),
            postal_code: "560001".into(),
            country: "India".into(),
        }
    }

    fn order(items: Vec<OrderItem>, method: PaymentMethod) -> Order {
        let now = Utc::now();
        let subtotal: Decimal = items.iter().map(OrderItem::line_total).sum();
        let id = Uuid::new_v4();
        Order {
            id,
            order_number: generate_order_number(now, id),
            customer_id: Uuid::new_v4(),
            items,
            shipping_address: address(),
            payment_method: method,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Processing,
            subtotal,
            coupon_code: Some("SAVE10".into()),
            coupon_discount: dec!(100),
            total: subtotal - dec!(100),
            refunded_amount: Decimal::ZERO,
            gateway_order_id: None,
            payment_reference: None,
            ordered_at: now,
            shipped_at: None,
            delivered_at: None,
            updated_at: now,
        }
    }

    fn line(price: Decimal) -> OrderItem {
        OrderItem::new(Uuid::new_v4(), Uuid::new_v4(), "Item", "SKU", 1, price)
    }

    #[test]
    fn order_number_has_date_and_suffix() {
        let now = Utc::now();
        let number = generate_order_number(now, Uuid::new_v4());
        assert!(number.starts_with(&format!("ORD-{}-", now.format("%Y%m%d"))));
        assert_eq!(number.len(), "ORD-YYYYMMDD-".len() + 8);
    }

    #[test]
    fn status_follows_slowest_active_item() {
        let mut order = order(vec![line(dec!(600)), line(dec!(400))], PaymentMethod::Cod);
        let now = Utc::now();
        assert_eq!(order.derive_status(), OrderStatus::Processing);

        order.items[0].advance_to(ItemStatus::Shipped, now).unwrap();
        order.refresh_status(now);
        assert_eq!(order.status, OrderStatus::Processing);
        assert!(order.shipped_at.is_none());

        order.items[1]
            .cancel(CancelReason::ChangedMind, now)
            .unwrap();
        order.refresh_status(now);
        assert_eq!(order.status, OrderStatus::Shipped);
        assert!(order.shipped_at.is_some());
    }

    #[test]
    fn cod_order_is_paid_on_delivery() {
        let mut order = order(vec![line(dec!(600))], PaymentMethod::Cod);
        let now = Utc::now();
        order.items[0].advance_to(ItemStatus::Shipped, now).unwrap();
        order.items[0].advance_to(ItemStatus::Delivered, now).unwrap();
        order.refresh_status(now);
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn cod_settlement_counts_cancelled_lines_as_refunded() {
        let mut order = order(vec![line(dec!(600)), line(dec!(400))], PaymentMethod::Cod);
        let now = Utc::now();
        order.items[1].cancel(CancelReason::ChangedMind, now).unwrap();
        order.items[0].advance_to(ItemStatus::Shipped, now).unwrap();
        order.items[0].advance_to(ItemStatus::Delivered, now).unwrap();
        order.refresh_status(now);
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.payment_status, PaymentStatus::PartiallyRefunded);
        assert_eq!(order.refunded_amount, dec!(360.00));

        order.items[0].open_return("Too small", now).unwrap();
        order.items[0].approve_return(None, now).unwrap();
        let owed = order.refund_amount_for(&order.items[0]);
        order.record_refund(owed);
        assert_eq!(order.payment_status, PaymentStatus::Refunded);
        assert_eq!(order.refunded_amount, order.total);
    }

    #[test]
    fn all_cancelled_means_cancelled() {
        let mut order = order(vec![line(dec!(600))], PaymentMethod::Online);
        order.items[0]
            .cancel(CancelReason::Other, Utc::now())
            .unwrap();
        assert_eq!(order.derive_status(), OrderStatus::Cancelled);
    }

    #[test]
    fn refund_takes_proportional_coupon_share() {
        let order = order(vec![line(dec!(600)), line(dec!(400))], PaymentMethod::Online);
        // 100 discount over 1000 subtotal: the 600 line carries 60 of it.
        assert_eq!(order.refund_amount_for(&order.items[0]), dec!(540.00));
        assert_eq!(order.refund_amount_for(&order.items[1]), dec!(360.00));
    }

    #[test]
    fn refunds_never_exceed_total() {
        let mut order = order(vec![line(dec!(600)), line(dec!(400))], PaymentMethod::Online);
        order.payment_status = PaymentStatus::Paid;
        assert_eq!(order.record_refund(dec!(540)), dec!(540));
        assert_eq!(order.payment_status, PaymentStatus::PartiallyRefunded);
        assert_eq!(order.record_refund(dec!(500)), dec!(360));
        assert_eq!(order.payment_status, PaymentStatus::Refunded);
        assert_eq!(order.refunded_amount, order.total);
    }

    #[test]
    fn vendor_view_keeps_only_their_lines() {
        let order = order(vec![line(dec!(600)), line(dec!(400))], PaymentMethod::Cod);
        let vendor = order.items[1].vendor_id;
        let view = order.vendor_view(vendor);
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].vendor_id, vendor);
        assert!(order.involves_vendor(vendor));
        assert!(!order.involves_vendor(Uuid::new_v4()));
    }
}
