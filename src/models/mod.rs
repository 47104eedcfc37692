pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod offer;
pub mod order;
pub mod order_item;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};
use validator::ValidationError;

pub use cart::{Cart, CartItem};
pub use catalog::{Category, Product};
pub use coupon::Coupon;
pub use offer::{Offer, OfferTarget};
pub use order::{Order, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress};
pub use order_item::{CancelReason, ItemStatus, OrderItem, ReturnStatus};

/// Reads a patch field where an explicit `null` clears the value:
/// absent is `None`, `null` is `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Rounds a money amount to two decimal places, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Prices must be strictly positive.
pub fn validate_price(amount: &Decimal) -> Result<(), ValidationError> {
    if amount > &Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("price_must_be_positive"))
    }
}

pub fn validate_non_negative(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        Err(ValidationError::new("amount_must_not_be_negative"))
    } else {
        Ok(())
    }
}

/// Discount percentages are whole numbers from 1 to 90.
pub fn validate_percentage(pct: &Decimal) -> Result<(), ValidationError> {
    if pct.fract().is_zero() && *pct >= Decimal::ONE && *pct <= Decimal::from(90) {
        Ok(())
    } else {
        Err(ValidationError::new("percentage_out_of_range"))
    }
}
