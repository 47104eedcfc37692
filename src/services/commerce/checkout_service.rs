use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::pricing_service::PricingService;
use crate::{
    commands::{
        orders::{PlaceOrderCommand, PricedLine},
        Command,
    },
    errors::ServiceError,
    events::EventSender,
    models::{Order, PaymentMethod, ShippingAddress},
    repositories::Store,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    #[validate]
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// Checkout service for converting carts to orders
#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<Store>,
    event_sender: Arc<EventSender>,
    pricing: Arc<PricingService>,
}

impl CheckoutService {
    pub fn new(store: Arc<Store>, event_sender: Arc<EventSender>, pricing: Arc<PricingService>) -> Self {
        Self {
            store,
            event_sender,
            pricing,
        }
    }

    /// Places an order from the customer's cart.
    ///
    /// Prices are recomputed from the catalog and live offers at this moment.
    /// Unavailable lines fail the checkout rather than being dropped silently.
    #[instrument(skip(self, request), fields(payment_method = %request.payment_method))]
    pub async fn checkout(
        &self,
        customer_id: Uuid,
        request: CheckoutRequest,
    ) -> Result<Order, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let cart = self.store.carts.get(customer_id, now);
        let summary = self.pricing.quote(&cart, now);
        if summary.lines.is_empty() {
            return Err(ServiceError::InvalidOperation("cart is empty".to_string()));
        }
        if let Some(line) = summary.lines.iter().find(|l| !l.available) {
            return Err(ServiceError::InsufficientStock(format!(
                "{} is no longer available in the requested quantity",
                line.name
            )));
        }

        let lines = summary
            .lines
            .into_iter()
            .map(|l| PricedLine {
                product_id: l.product_id,
                vendor_id: l.vendor_id,
                name: l.name,
                sku: l.sku,
                quantity: l.quantity,
                unit_price: l.unit_price,
            })
            .collect();

        PlaceOrderCommand {
            customer_id,
            lines,
            coupon_code: cart.coupon_code,
            shipping_address: request.shipping_address,
            payment_method: request.payment_method,
            cod_limit: self.pricing.cod_limit(),
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await
    }
}
