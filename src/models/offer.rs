use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::catalog::Product;
use super::round_money;

/// What an offer discounts: a whole category or one product
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OfferTarget {
    Category(Uuid),
    Product(Uuid),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Offer {
    pub id: Uuid,
    pub name: String,
    pub target: OfferTarget,
    /// Whole-number percentage, 1 to 90
    pub discount_percentage: Decimal,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.starts_at <= now && now < self.expires_at
    }

    pub fn applies_to(&self, product: &Product) -> bool {
        match self.target {
            OfferTarget::Category(id) => product.category_id == id,
            OfferTarget::Product(id) => product.id == id,
        }
    }
}

/// Price after taking `percentage` off, rounded to 2dp.
pub fn discounted_price(price: Decimal, percentage: Decimal) -> Decimal {
    let hundred = Decimal::ONE_HUNDRED;
    round_money(price * (hundred - percentage) / hundred).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn discounted_price_rounds_to_cents() {
        assert_eq!(discounted_price(dec!(999), dec!(15)), dec!(849.15));
        assert_eq!(discounted_price(dec!(10.01), dec!(33)), dec!(6.71));
    }

    #[test]
    fn offer_window_is_half_open() {
        let now = Utc::now();
        let offer = Offer {
            id: Uuid::new_v4(),
            name: "Diwali".into(),
            target: OfferTarget::Category(Uuid::new_v4()),
            discount_percentage: dec!(10),
            starts_at: now - Duration::days(1),
            expires_at: now,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert!(offer.is_live(now - Duration::hours(1)));
        assert!(!offer.is_live(now));
    }
}
