use crate::{
    commands::Command,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        coupon::normalize_code,
        order::generate_order_number,
        round_money, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
    },
    repositories::Store,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// One cart line priced at checkout time
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    /// Unit price after the best live offer
    pub unit_price: Decimal,
}

/// Turns priced cart lines into an order, taking stock and redeeming the coupon.
#[derive(Debug, Clone, Validate)]
pub struct PlaceOrderCommand {
    pub customer_id: Uuid,
    pub lines: Vec<PricedLine>,
    pub coupon_code: Option<String>,
    #[validate]
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub cod_limit: Decimal,
}

#[async_trait::async_trait]
impl Command for PlaceOrderCommand {
    type Result = Order;

    #[instrument(skip(self, store, event_sender), fields(customer_id = %self.customer_id))]
    async fn execute(
        &self,
        store: Arc<Store>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;
        if self.lines.is_empty() {
            return Err(ServiceError::InvalidOperation("cart is empty".to_string()));
        }

        let now = Utc::now();
        let subtotal: Decimal = self
            .lines
            .iter()
            .map(|l| round_money(l.unit_price * Decimal::from(l.quantity)))
            .sum();

        let coupon = match &self.coupon_code {
            Some(code) => {
                let coupon = store.coupons.find_by_code(code).ok_or_else(|| {
                    ServiceError::NotFound(format!("coupon {} not found", normalize_code(code)))
                })?;
                coupon.check_applicable(subtotal, self.customer_id, now)?;
                Some(coupon)
            }
            None => None,
        };
        let coupon_discount = coupon
            .as_ref()
            .map(|c| c.discount_for(subtotal))
            .unwrap_or(Decimal::ZERO);
        let total = subtotal - coupon_discount;

        if self.payment_method == PaymentMethod::Cod && total > self.cod_limit {
            return Err(ServiceError::InvalidOperation(format!(
                "cash on delivery is not available for orders above {}",
                self.cod_limit
            )));
        }

        let stock: Vec<(Uuid, u32)> = self
            .lines
            .iter()
            .map(|l| (l.product_id, l.quantity))
            .collect();
        store.products.reserve_stock(&stock)?;

        if let Some(coupon) = &coupon {
            let redeemed = store.coupons.update(coupon.id, |c| {
                c.check_applicable(subtotal, self.customer_id, now)?;
                c.used_by.insert(self.customer_id);
                Ok(())
            });
            if let Err(e) = redeemed {
                warn!(coupon = %coupon.code, error = %e, "Coupon redemption failed, releasing stock");
                for &(product_id, quantity) in &stock {
                    store.products.restock(product_id, quantity);
                }
                return Err(e);
            }
        }

        let order = store.orders.insert(self.build_order(
            subtotal,
            coupon.as_ref().map(|c| c.code.clone()),
            coupon_discount,
            total,
        ));

        if let Err(e) = store.carts.update(self.customer_id, now, |cart| {
            cart.clear(now);
            Ok(())
        }) {
            warn!(error = %e, "Could not clear cart after checkout");
        }

        self.log_and_trigger_event(&event_sender, &order, coupon.map(|c| c.id))
            .await;
        Ok(order)
    }
}

impl PlaceOrderCommand {
    fn build_order(
        &self,
        subtotal: Decimal,
        coupon_code: Option<String>,
        coupon_discount: Decimal,
        total: Decimal,
    ) -> Order {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let items = self
            .lines
            .iter()
            .map(|l| {
                OrderItem::new(
                    l.product_id,
                    l.vendor_id,
                    l.name.clone(),
                    l.sku.clone(),
                    l.quantity,
                    l.unit_price,
                )
            })
            .collect();
        let gateway_order_id = match self.payment_method {
            PaymentMethod::Online => Some(format!("gw_order_{}", Uuid::new_v4().simple())),
            PaymentMethod::Cod => None,
        };

        Order {
            id,
            order_number: generate_order_number(now, id),
            customer_id: self.customer_id,
            items,
            shipping_address: self.shipping_address.clone(),
            payment_method: self.payment_method,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Processing,
            subtotal,
            coupon_code,
            coupon_discount,
            total,
            refunded_amount: Decimal::ZERO,
            gateway_order_id,
            payment_reference: None,
            ordered_at: now,
            shipped_at: None,
            delivered_at: None,
            updated_at: now,
        }
    }

    async fn log_and_trigger_event(
        &self,
        event_sender: &EventSender,
        order: &Order,
        coupon_id: Option<Uuid>,
    ) {
        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total,
            payment_method = %order.payment_method,
            "Order placed"
        );

        event_sender
            .send_or_log(Event::OrderPlaced {
                order_id: order.id,
                customer_id: self.customer_id,
                total: order.total,
            })
            .await;
        if let Some(coupon_id) = coupon_id {
            event_sender
                .send_or_log(Event::CouponRedeemed {
                    coupon_id,
                    customer_id: self.customer_id,
                })
                .await;
        }
    }
}
