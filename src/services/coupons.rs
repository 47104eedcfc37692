use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        coupon::normalize_code, nullable, validate_non_negative, validate_percentage,
        validate_price, Coupon,
    },
    repositories::Store,
};

fn validate_code(code: &str) -> Result<(), ValidationError> {
    if code
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("coupon_code_charset"))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCouponRequest {
    #[validate(length(min = 3, max = 40), custom = "validate_code")]
    pub code: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(custom = "validate_percentage")]
    pub discount_percentage: Decimal,
    #[validate(custom = "validate_price")]
    pub max_discount: Option<Decimal>,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub minimum_purchase: Decimal,
    pub expires_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCouponRequest {
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(custom = "validate_percentage")]
    pub discount_percentage: Option<Decimal>,
    /// `null` removes the cap
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    #[validate(custom = "validate_price")]
    pub max_discount: Option<Option<Decimal>>,
    #[validate(custom = "validate_non_negative")]
    pub minimum_purchase: Option<Decimal>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

/// Admin view of a coupon, including how often it was redeemed
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CouponResponse {
    #[serde(flatten)]
    pub coupon: Coupon,
    pub times_used: usize,
}

impl From<Coupon> for CouponResponse {
    fn from(coupon: Coupon) -> Self {
        Self {
            times_used: coupon.used_by.len(),
            coupon,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Clone)]
pub struct CouponService {
    store: Arc<Store>,
    event_sender: Arc<EventSender>,
}

impl CouponService {
    pub fn new(store: Arc<Store>, event_sender: Arc<EventSender>) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    #[instrument(skip(self), fields(code = %input.code))]
    pub async fn create_coupon(&self, input: CreateCouponRequest) -> Result<CouponResponse, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        if input.expires_at <= now {
            return Err(ServiceError::ValidationError(
                "expires_at must be in the future".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let code = normalize_code(&input.code);
        self.store.coupons.codes.claim(&code, id)?;

        let coupon = self.store.coupons.insert(Coupon {
            id,
            code,
            description: input.description,
            discount_percentage: input.discount_percentage,
            max_discount: input.max_discount,
            minimum_purchase: input.minimum_purchase,
            expires_at: input.expires_at,
            is_active: input.is_active,
            used_by: HashSet::new(),
            created_at: now,
            updated_at: now,
        });
        info!(coupon_id = %id, code = %coupon.code, "Coupon created");
        self.event_sender.send_or_log(Event::CouponCreated(id)).await;
        Ok(coupon.into())
    }

    #[instrument(skip(self))]
    pub async fn update_coupon(
        &self,
        id: Uuid,
        input: UpdateCouponRequest,
    ) -> Result<CouponResponse, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let coupon = self.store.coupons.update(id, |coupon| {
            if let Some(description) = &input.description {
                coupon.description = Some(description.clone());
            }
            if let Some(pct) = input.discount_percentage {
                coupon.discount_percentage = pct;
            }
            if let Some(cap) = input.max_discount {
                coupon.max_discount = cap;
            }
            if let Some(minimum) = input.minimum_purchase {
                coupon.minimum_purchase = minimum;
            }
            if let Some(expires_at) = input.expires_at {
                coupon.expires_at = expires_at;
            }
            if let Some(is_active) = input.is_active {
                coupon.is_active = is_active;
            }
            coupon.updated_at = now;
            Ok(coupon.clone())
        })?;
        self.event_sender.send_or_log(Event::CouponUpdated(id)).await;
        Ok(coupon.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_coupon(&self, id: Uuid) -> Result<(), ServiceError> {
        let coupon = self
            .store
            .coupons
            .remove(id)
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", id)))?;
        self.store.coupons.codes.release(&coupon.code, id);
        info!(coupon_id = %id, code = %coupon.code, "Coupon deleted");
        self.event_sender.send_or_log(Event::CouponDeleted(id)).await;
        Ok(())
    }

    pub async fn get_coupon(&self, id: Uuid) -> Result<CouponResponse, ServiceError> {
        Ok(self.store.coupons.get(id)?.into())
    }

    /// All coupons, newest first
    pub async fn list_coupons(&self) -> Vec<CouponResponse> {
        let mut coupons = self.store.coupons.find_all();
        coupons.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        coupons.into_iter().map(CouponResponse::from).collect()
    }

    /// Coupons the customer can still redeem: active, unexpired and unused by them.
    pub async fn available_for(&self, customer_id: Uuid) -> Vec<Coupon> {
        let now = Utc::now();
        let mut coupons = self.store.coupons.filter(|c| {
            c.is_active && !c.is_expired(now) && !c.used_by.contains(&customer_id)
        });
        coupons.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
        coupons
    }
}
