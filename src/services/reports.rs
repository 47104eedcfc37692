use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    models::{ItemStatus, Order, OrderItem},
    repositories::Store,
};

const TOP_PRODUCT_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SalesReportQuery {
    /// Inclusive lower bound on `ordered_at`
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `ordered_at`
    pub to: Option<DateTime<Utc>>,
}

/// Top selling product data
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub quantity_sold: u64,
    pub revenue: Decimal,
}

/// Sales over a period. Vendor reports only cover the vendor's own items
/// and leave platform-funded coupon discounts out.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SalesReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
    pub currency: String,
    pub order_count: u64,
    /// Quantity neither cancelled nor returned
    pub items_sold: u64,
    /// Value of all non-cancelled lines
    pub gross_sales: Decimal,
    pub coupon_discounts: Decimal,
    pub refunded: Decimal,
    pub net_sales: Decimal,
    /// Item count per item status
    pub status_breakdown: BTreeMap<ItemStatus, u64>,
    pub top_products: Vec<TopProduct>,
}

/// Service for generating sales reports
#[derive(Clone)]
pub struct ReportService {
    store: Arc<Store>,
    currency: String,
}

impl ReportService {
    pub fn new(store: Arc<Store>, currency: impl Into<String>) -> Self {
        Self {
            store,
            currency: currency.into(),
        }
    }

    #[instrument(skip(self))]
    pub async fn sales_report(
        &self,
        actor: AuthUser,
        query: SalesReportQuery,
    ) -> Result<SalesReport, ServiceError> {
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from >= to {
                return Err(ServiceError::ValidationError(
                    "`from` must be earlier than `to`".to_string(),
                ));
            }
        }
        let vendor_id = if actor.is_admin() {
            None
        } else if actor.is_vendor() {
            Some(actor.user_id)
        } else {
            return Err(ServiceError::Forbidden(
                "sales reports are available to vendors and admins".to_string(),
            ));
        };

        let orders = self.store.orders.filter(|o| {
            query.from.map_or(true, |from| o.ordered_at >= from)
                && query.to.map_or(true, |to| o.ordered_at < to)
                && vendor_id.map_or(true, |v| o.involves_vendor(v))
        });

        let report = build_report(&orders, vendor_id, &query, &self.currency);
        info!(
            orders = report.order_count,
            net_sales = %report.net_sales,
            vendor_id = ?vendor_id,
            "Sales report generated"
        );
        Ok(report)
    }
}

fn build_report(
    orders: &[Order],
    vendor_id: Option<Uuid>,
    query: &SalesReportQuery,
    currency: &str,
) -> SalesReport {
    let mut report = SalesReport {
        vendor_id,
        from: query.from,
        to: query.to,
        currency: currency.to_string(),
        order_count: orders.len() as u64,
        items_sold: 0,
        gross_sales: Decimal::ZERO,
        coupon_discounts: Decimal::ZERO,
        refunded: Decimal::ZERO,
        net_sales: Decimal::ZERO,
        status_breakdown: BTreeMap::new(),
        top_products: Vec::new(),
    };
    let mut products: HashMap<Uuid, TopProduct> = HashMap::new();

    for order in orders {
        let in_scope = |item: &&OrderItem| vendor_id.map_or(true, |v| item.vendor_id == v);
        for item in order.items.iter().filter(in_scope) {
            *report.status_breakdown.entry(item.item_status).or_insert(0) += 1;
            if item.item_status == ItemStatus::Cancelled {
                continue;
            }

            let line = item.line_total();
            let paid = order.refund_amount_for(item);
            report.gross_sales += line;
            if vendor_id.is_none() {
                report.coupon_discounts += line - paid;
            }

            if item.item_status == ItemStatus::Returned {
                report.refunded += if vendor_id.is_none() { paid } else { line };
                continue;
            }

            report.items_sold += u64::from(item.quantity);
            let entry = products.entry(item.product_id).or_insert_with(|| TopProduct {
                product_id: item.product_id,
                name: item.name.clone(),
                quantity_sold: 0,
                revenue: Decimal::ZERO,
            });
            entry.quantity_sold += u64::from(item.quantity);
            entry.revenue += line;
        }
    }

    report.net_sales = report.gross_sales - report.coupon_discounts - report.refunded;

    let mut top: Vec<TopProduct> = products.into_values().collect();
    top.sort_by(|a, b| {
        b.quantity_sold
            .cmp(&a.quantity_sold)
            .then(b.revenue.cmp(&a.revenue))
            .then(a.name.cmp(&b.name))
    });
    top.truncate(TOP_PRODUCT_LIMIT);
    report.top_products = top;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::models::{
        order::generate_order_number, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
    };
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn order(items: Vec<OrderItem>, coupon_discount: Decimal) -> Order {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let subtotal: Decimal = items.iter().map(OrderItem::line_total).sum();
        Order {
            id,
            order_number: generate_order_number(now, id),
            customer_id: Uuid::new_v4(),
            items,
            shipping_address: ShippingAddress {
                full_name: "Ravi Kumar".into(),
                phone: "9123456780".into(),
                line1: "4 Park Street".into(),
                line2: None,
                city: "Kolkata".into(),
                state: "WB".into(),
                postal_code: "700016".into(),
                country: "India".into(),
            },
            payment_method: PaymentMethod::Online,
            payment_status: PaymentStatus::Paid,
            status: OrderStatus::Processing,
            subtotal,
            coupon_code: None,
            coupon_discount,
            total: subtotal - coupon_discount,
            refunded_amount: Decimal::ZERO,
            gateway_order_id: None,
            payment_reference: None,
            ordered_at: now,
            shipped_at: None,
            delivered_at: None,
            updated_at: now,
        }
    }

    #[test]
    fn vendor_report_only_counts_own_items() {
        let vendor = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mine = OrderItem::new(Uuid::new_v4(), vendor, "Lamp", "LMP", 2, dec!(500));
        let theirs = OrderItem::new(Uuid::new_v4(), other, "Rug", "RUG", 1, dec!(1000));
        let orders = vec![order(vec![mine, theirs], dec!(200))];

        let report = build_report(&orders, Some(vendor), &SalesReportQuery::default(), "INR");
        assert_eq!(report.gross_sales, dec!(1000));
        assert_eq!(report.coupon_discounts, Decimal::ZERO);
        assert_eq!(report.items_sold, 2);
        assert_eq!(report.top_products.len(), 1);

        let admin = build_report(&orders, None, &SalesReportQuery::default(), "INR");
        assert_eq!(admin.gross_sales, dec!(2000));
        assert_eq!(admin.coupon_discounts, dec!(200.00));
        assert_eq!(admin.net_sales, dec!(1800.00));
    }

    #[test]
    fn cancelled_and_returned_items_are_excluded_from_sales() {
        let vendor = Uuid::new_v4();
        let mut cancelled = OrderItem::new(Uuid::new_v4(), vendor, "Mug", "MUG", 1, dec!(100));
        cancelled.item_status = ItemStatus::Cancelled;
        let mut returned = OrderItem::new(Uuid::new_v4(), vendor, "Cup", "CUP", 1, dec!(300));
        returned.item_status = ItemStatus::Returned;
        let kept = OrderItem::new(Uuid::new_v4(), vendor, "Bowl", "BWL", 3, dec!(100));
        let orders = vec![order(vec![cancelled, returned, kept], Decimal::ZERO)];

        let report = build_report(&orders, Some(vendor), &SalesReportQuery::default(), "INR");
        assert_eq!(report.items_sold, 3);
        assert_eq!(report.gross_sales, dec!(600));
        assert_eq!(report.refunded, dec!(300));
        assert_eq!(report.net_sales, dec!(300));
        assert_eq!(report.status_breakdown.get(&ItemStatus::Cancelled), Some(&1));
    }

    #[tokio::test]
    async fn customers_cannot_read_reports() {
        let service = ReportService::new(Store::new(), "INR");
        let customer = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Customer,
        };
        assert_matches!(
            service
                .sales_report(customer, SalesReportQuery::default())
                .await,
            Err(ServiceError::Forbidden(_))
        );
    }
}
