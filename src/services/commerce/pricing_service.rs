use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{
        offer::discounted_price, round_money, Cart, Offer, Product,
    },
    repositories::Store,
};

/// Offer that set a product's effective price
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AppliedOffer {
    pub id: Uuid,
    pub name: String,
    pub discount_percentage: Decimal,
}

impl From<&Offer> for AppliedOffer {
    fn from(offer: &Offer) -> Self {
        Self {
            id: offer.id,
            name: offer.name.clone(),
            discount_percentage: offer.discount_percentage,
        }
    }
}

/// Product as shown to shoppers, with its price after offers
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductView {
    pub product: Product,
    pub effective_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<AppliedOffer>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartLine {
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    pub list_price: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    /// False when the product was delisted or stock dropped below the quantity
    pub available: bool,
}

/// Priced view of a customer's cart
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartSummary {
    pub customer_id: Uuid,
    pub lines: Vec<CartLine>,
    pub subtotal: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub coupon_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_message: Option<String>,
    pub coupon_discount: Decimal,
    pub total: Decimal,
    pub cod_available: bool,
    pub cod_limit: Decimal,
}

/// Offer and coupon arithmetic over the current catalog
#[derive(Debug, Clone)]
pub struct PricingService {
    store: Arc<Store>,
    cod_limit: Decimal,
}

impl PricingService {
    pub fn new(store: Arc<Store>, cod_limit: Decimal) -> Self {
        Self { store, cod_limit }
    }

    pub fn cod_limit(&self) -> Decimal {
        self.cod_limit
    }

    /// Highest-percentage live offer targeting the product or its category.
    pub fn best_offer(&self, product: &Product, now: DateTime<Utc>) -> Option<Offer> {
        self.store
            .offers
            .filter(|o| o.is_live(now) && o.applies_to(product))
            .into_iter()
            .max_by(|a, b| {
                a.discount_percentage
                    .cmp(&b.discount_percentage)
                    .then(b.created_at.cmp(&a.created_at))
            })
    }

    pub fn view(&self, product: Product, now: DateTime<Utc>) -> ProductView {
        let offer = self.best_offer(&product, now);
        let effective_price = match &offer {
            Some(offer) => discounted_price(product.price, offer.discount_percentage),
            None => product.price,
        };
        ProductView {
            offer: offer.as_ref().map(AppliedOffer::from),
            effective_price,
            product,
        }
    }

    /// Prices every cart line and evaluates the cart's coupon.
    pub fn quote(&self, cart: &Cart, now: DateTime<Utc>) -> CartSummary {
        let lines: Vec<CartLine> = cart
            .items
            .iter()
            .filter_map(|item| {
                let product = self.store.products.find_by_id(item.product_id)?;
                let available = product.is_purchasable(item.quantity)
                    && self
                        .store
                        .categories
                        .find_by_id(product.category_id)
                        .map(|c| c.is_active)
                        .unwrap_or(false);
                let list_price = product.price;
                let view = self.view(product, now);
                Some(CartLine {
                    product_id: item.product_id,
                    vendor_id: view.product.vendor_id,
                    name: view.product.name,
                    sku: view.product.sku,
                    quantity: item.quantity,
                    list_price,
                    unit_price: view.effective_price,
                    line_total: round_money(view.effective_price * Decimal::from(item.quantity)),
                    available,
                })
            })
            .collect();

        let subtotal: Decimal = lines
            .iter()
            .filter(|l| l.available)
            .map(|l| l.line_total)
            .sum();

        let (coupon_applied, coupon_discount, coupon_message) = match &cart.coupon_code {
            Some(code) => match self.store.coupons.find_by_code(code) {
                Some(coupon) => match coupon.check_applicable(subtotal, cart.customer_id, now) {
                    Ok(()) => (true, coupon.discount_for(subtotal), None),
                    Err(e) => (false, Decimal::ZERO, Some(e.response_message())),
                },
                None => (
                    false,
                    Decimal::ZERO,
                    Some(format!("coupon {} no longer exists", code)),
                ),
            },
            None => (false, Decimal::ZERO, None),
        };

        let total = subtotal - coupon_discount;
        CartSummary {
            customer_id: cart.customer_id,
            lines,
            subtotal,
            coupon_code: cart.coupon_code.clone(),
            coupon_applied,
            coupon_message,
            coupon_discount,
            total,
            cod_available: total <= self.cod_limit,
            cod_limit: self.cod_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, OfferTarget};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn seed(store: &Store, price: Decimal) -> Product {
        let now = Utc::now();
        let category = store.categories.insert(Category {
            id: Uuid::new_v4(),
            name: "Kitchen".into(),
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        });
        store.products.insert(Product {
            id: Uuid::new_v4(),
            vendor_id: Uuid::new_v4(),
            category_id: category.id,
            name: "Kettle".into(),
            sku: "KT-1".into(),
            description: None,
            price,
            stock: 10,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    fn offer(target: OfferTarget, pct: Decimal, live: bool) -> Offer {
        let now = Utc::now();
        Offer {
            id: Uuid::new_v4(),
            name: format!("{pct}% off"),
            target,
            discount_percentage: pct,
            starts_at: now - Duration::days(1),
            expires_at: if live { now + Duration::days(1) } else { now - Duration::hours(1) },
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn best_live_offer_wins() {
        let store = Store::new();
        let product = seed(&store, dec!(1000));
        store.offers.insert(offer(OfferTarget::Category(product.category_id), dec!(10), true));
        store.offers.insert(offer(OfferTarget::Product(product.id), dec!(25), true));
        store.offers.insert(offer(OfferTarget::Product(product.id), dec!(50), false));

        let pricing = PricingService::new(store.clone(), dec!(5000));
        let view = pricing.view(product, Utc::now());
        assert_eq!(view.effective_price, dec!(750.00));
        assert_eq!(view.offer.map(|o| o.discount_percentage), Some(dec!(25)));
    }

    #[test]
    fn quote_flags_cod_over_limit() {
        let store = Store::new();
        let product = seed(&store, dec!(2600));
        let mut cart = Cart::new(Uuid::new_v4(), Utc::now());
        cart.set_quantity(product.id, 2, Utc::now());

        let summary = PricingService::new(store, dec!(5000)).quote(&cart, Utc::now());
        assert_eq!(summary.subtotal, dec!(5200));
        assert!(!summary.cod_available);
    }
}
