use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: u32,
}

/// One cart per customer, holding at most one coupon
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub customer_id: Uuid,
    pub items: Vec<CartItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(customer_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            customer_id,
            items: Vec::new(),
            coupon_code: None,
            updated_at: now,
        }
    }

    pub fn quantity_of(&self, product_id: Uuid) -> u32 {
        self.items
            .iter()
            .find(|i| i.product_id == product_id)
            .map(|i| i.quantity)
            .unwrap_or(0)
    }

    /// Sets the quantity for a product; zero removes the line.
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: u32, now: DateTime<Utc>) {
        if quantity == 0 {
            self.items.retain(|i| i.product_id != product_id);
        } else if let Some(line) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            line.quantity = quantity;
        } else {
            self.items.push(CartItem {
                product_id,
                quantity,
            });
        }
        self.updated_at = now;
    }

    /// Replaces any coupon already on the cart.
    pub fn apply_coupon(&mut self, code: String, now: DateTime<Utc>) -> Option<String> {
        self.updated_at = now;
        self.coupon_code.replace(code)
    }

    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.items.clear();
        self.coupon_code = None;
        self.updated_at = now;
    }
}
