use std::ops::Deref;
use uuid::Uuid;

use super::{BaseRepository, Record, UniqueIndex};
use crate::models::{coupon::Coupon, offer::Offer};

impl Record for Coupon {
    const KIND: &'static str = "Coupon";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for Offer {
    const KIND: &'static str = "Offer";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug)]
pub struct CouponRepository {
    base: BaseRepository<Coupon>,
    pub codes: UniqueIndex,
}

impl Default for CouponRepository {
    fn default() -> Self {
        Self {
            base: BaseRepository::new(),
            codes: UniqueIndex::new("coupon code"),
        }
    }
}

impl Deref for CouponRepository {
    type Target = BaseRepository<Coupon>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl CouponRepository {
    pub fn find_by_code(&self, code: &str) -> Option<Coupon> {
        self.codes
            .lookup(code)
            .and_then(|id| self.base.find_by_id(id))
    }
}

#[derive(Debug, Default)]
pub struct OfferRepository {
    base: BaseRepository<Offer>,
}

impl Deref for OfferRepository {
    type Target = BaseRepository<Offer>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}
