use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::pricing_service::{CartSummary, PricingService};
use crate::{
    errors::ServiceError,
    models::{coupon::normalize_code, Product},
    repositories::Store,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddToCartInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 100, message = "Quantity must be between 1 and 100"))]
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateCartItemInput {
    /// Zero removes the line
    #[validate(range(max = 100, message = "Quantity must be at most 100"))]
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ApplyCouponInput {
    #[validate(length(min = 1, max = 40, message = "Coupon code is required"))]
    pub code: String,
}

/// Customer carts.
///
/// Every mutation returns the freshly priced [`CartSummary`], so clients never
/// compute totals themselves.
#[derive(Clone)]
pub struct CartService {
    store: Arc<Store>,
    pricing: Arc<PricingService>,
}

impl CartService {
    pub fn new(store: Arc<Store>, pricing: Arc<PricingService>) -> Self {
        Self { store, pricing }
    }

    /// Returns the customer's priced cart. An empty cart is returned if the
    /// customer never added anything.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, customer_id: Uuid) -> Result<CartSummary, ServiceError> {
        let now = Utc::now();
        let cart = self.store.carts.get(customer_id, now);
        Ok(self.pricing.quote(&cart, now))
    }

    /// Adds a product to the cart.
    ///
    /// If the product is already in the cart the quantities are merged. The
    /// merged quantity may not exceed the product's stock.
    ///
    /// # Errors
    ///
    /// * `NotFound` - product does not exist
    /// * `InvalidOperation` - product is delisted
    /// * `InsufficientStock` - merged quantity exceeds stock
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        customer_id: Uuid,
        input: AddToCartInput,
    ) -> Result<CartSummary, ServiceError> {
        input.validate()?;
        let product = self.purchasable_product(input.product_id)?;

        let now = Utc::now();
        let cart = self.store.carts.update(customer_id, now, |cart| {
            let quantity = cart.quantity_of(product.id).saturating_add(input.quantity);
            ensure_stock(&product, quantity)?;
            cart.set_quantity(product.id, quantity, now);
            Ok(cart.clone())
        })?;

        info!(%customer_id, product_id = %product.id, quantity = input.quantity, "Added item to cart");
        Ok(self.pricing.quote(&cart, now))
    }

    /// Sets the quantity of a line. Zero removes the line.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        input: UpdateCartItemInput,
    ) -> Result<CartSummary, ServiceError> {
        input.validate()?;
        if input.quantity == 0 {
            return self.remove_item(customer_id, product_id).await;
        }
        let product = self.purchasable_product(product_id)?;

        let now = Utc::now();
        let cart = self.store.carts.update(customer_id, now, |cart| {
            if cart.quantity_of(product_id) == 0 {
                return Err(ServiceError::NotFound(format!(
                    "product {} is not in the cart",
                    product_id
                )));
            }
            ensure_stock(&product, input.quantity)?;
            cart.set_quantity(product_id, input.quantity, now);
            Ok(cart.clone())
        })?;
        Ok(self.pricing.quote(&cart, now))
    }

    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartSummary, ServiceError> {
        let now = Utc::now();
        let cart = self.store.carts.update(customer_id, now, |cart| {
            if cart.quantity_of(product_id) == 0 {
                return Err(ServiceError::NotFound(format!(
                    "product {} is not in the cart",
                    product_id
                )));
            }
            cart.set_quantity(product_id, 0, now);
            Ok(cart.clone())
        })?;
        Ok(self.pricing.quote(&cart, now))
    }

    /// Applies a coupon to the cart, replacing any coupon already applied.
    ///
    /// The coupon must currently validate against the cart subtotal. If it
    /// later stops validating (for example the subtotal drops below the
    /// minimum) the summary reports it as not applied.
    #[instrument(skip(self))]
    pub async fn apply_coupon(
        &self,
        customer_id: Uuid,
        input: ApplyCouponInput,
    ) -> Result<CartSummary, ServiceError> {
        input.validate()?;
        let code = normalize_code(&input.code);
        let coupon = self
            .store
            .coupons
            .find_by_code(&code)
            .ok_or_else(|| ServiceError::NotFound(format!("coupon {} not found", code)))?;

        let now = Utc::now();
        let current = self.pricing.quote(&self.store.carts.get(customer_id, now), now);
        if current.lines.is_empty() {
            return Err(ServiceError::InvalidOperation(
                "add items to the cart before applying a coupon".to_string(),
            ));
        }
        coupon.check_applicable(current.subtotal, customer_id, now)?;

        let cart = self.store.carts.update(customer_id, now, |cart| {
            let replaced = cart.apply_coupon(coupon.code.clone(), now);
            if let Some(previous) = replaced.filter(|p| *p != coupon.code) {
                info!(%customer_id, %previous, current = %coupon.code, "Replaced cart coupon");
            }
            Ok(cart.clone())
        })?;
        Ok(self.pricing.quote(&cart, now))
    }

    #[instrument(skip(self))]
    pub async fn remove_coupon(&self, customer_id: Uuid) -> Result<CartSummary, ServiceError> {
        let now = Utc::now();
        let cart = self.store.carts.update(customer_id, now, |cart| {
            cart.coupon_code = None;
            cart.updated_at = now;
            Ok(cart.clone())
        })?;
        Ok(self.pricing.quote(&cart, now))
    }

    fn purchasable_product(&self, product_id: Uuid) -> Result<Product, ServiceError> {
        let product = self.store.products.get(product_id)?;
        let category_active = self
            .store
            .categories
            .find_by_id(product.category_id)
            .map(|c| c.is_active)
            .unwrap_or(false);
        if !product.is_active || !category_active {
            return Err(ServiceError::InvalidOperation(format!(
                "product {} is not available",
                product.name
            )));
        }
        Ok(product)
    }
}

fn ensure_stock(product: &Product, quantity: u32) -> Result<(), ServiceError> {
    if quantity > product.stock {
        Err(ServiceError::InsufficientStock(format!(
            "only {} of {} left in stock",
            product.stock, product.name
        )))
    } else {
        Ok(())
    }
}
