use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;
use uuid::Uuid;

use super::round_money;
use crate::errors::ServiceError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coupon {
    pub id: Uuid,
    /// Stored upper-case; lookups are case-insensitive
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub discount_percentage: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_discount: Option<Decimal>,
    pub minimum_purchase: Decimal,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    /// Customers who already redeemed this coupon
    #[serde(skip)]
    pub used_by: HashSet<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

impl Coupon {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Checks every redemption rule for `customer_id` against `subtotal`.
    pub fn check_applicable(
        &self,
        subtotal: Decimal,
        customer_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        if !self.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "coupon {} is not active",
                self.code
            )));
        }
        if self.is_expired(now) {
            return Err(ServiceError::InvalidOperation(format!(
                "coupon {} has expired",
                self.code
            )));
        }
        if subtotal < self.minimum_purchase {
            return Err(ServiceError::InvalidOperation(format!(
                "coupon {} requires a minimum purchase of {}",
                self.code, self.minimum_purchase
            )));
        }
        if self.used_by.contains(&customer_id) {
            return Err(ServiceError::Conflict(format!(
                "coupon {} has already been used",
                self.code
            )));
        }
        Ok(())
    }

    /// Discount for `subtotal`, capped by `max_discount` and by the subtotal itself.
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        let raw = round_money(subtotal * self.discount_percentage / Decimal::ONE_HUNDRED);
        let capped = match self.max_discount {
            Some(cap) => raw.min(cap),
            None => raw,
        };
        capped.min(subtotal).max(Decimal::ZERO)
    }
}
