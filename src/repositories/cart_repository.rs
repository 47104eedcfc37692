use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::cart::Cart;

/// One cart per customer, keyed by customer id
#[derive(Debug, Default)]
pub struct CartRepository {
    carts: DashMap<Uuid, Cart>,
}

impl CartRepository {
    /// The customer's cart, or an empty one if none was stored yet.
    pub fn get(&self, customer_id: Uuid, now: DateTime<Utc>) -> Cart {
        self.carts
            .get(&customer_id)
            .map(|c| c.value().clone())
            .unwrap_or_else(|| Cart::new(customer_id, now))
    }

    /// Edits a copy of the cart and stores it if `f` succeeds.
    pub fn update<R, F>(&self, customer_id: Uuid, now: DateTime<Utc>, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce(&mut Cart) -> Result<R, ServiceError>,
    {
        let mut entry = self
            .carts
            .entry(customer_id)
            .or_insert_with(|| Cart::new(customer_id, now));
        let mut draft = entry.value().clone();
        let out = f(&mut draft)?;
        *entry.value_mut() = draft;
        Ok(out)
    }

    pub fn remove(&self, customer_id: Uuid) -> Option<Cart> {
        self.carts.remove(&customer_id).map(|(_, c)| c)
    }
}
