use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{validate_percentage, Offer, OfferTarget},
    repositories::Store,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateOfferRequest {
    #[validate(length(min = 2, max = 120, message = "Name must be between 2 and 120 characters"))]
    pub name: String,
    pub target: OfferTarget,
    #[validate(custom = "validate_percentage")]
    pub discount_percentage: Decimal,
    /// Defaults to now
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateOfferRequest {
    #[validate(length(min = 2, max = 120, message = "Name must be between 2 and 120 characters"))]
    pub name: Option<String>,
    #[validate(custom = "validate_percentage")]
    pub discount_percentage: Option<Decimal>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

fn default_true() -> bool {
    true
}

fn ensure_window(starts_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Result<(), ServiceError> {
    if expires_at <= starts_at {
        Err(ServiceError::ValidationError(
            "expires_at must be after starts_at".to_string(),
        ))
    } else {
        Ok(())
    }
}

#[derive(Clone)]
pub struct OfferService {
    store: Arc<Store>,
    event_sender: Arc<EventSender>,
}

impl OfferService {
    pub fn new(store: Arc<Store>, event_sender: Arc<EventSender>) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn create_offer(&self, input: CreateOfferRequest) -> Result<Offer, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let starts_at = input.starts_at.unwrap_or(now);
        ensure_window(starts_at, input.expires_at)?;
        match input.target {
            OfferTarget::Category(id) => {
                self.store.categories.get(id)?;
            }
            OfferTarget::Product(id) => {
                self.store.products.get(id)?;
            }
        }

        let offer = self.store.offers.insert(Offer {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            target: input.target,
            discount_percentage: input.discount_percentage,
            starts_at,
            expires_at: input.expires_at,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        });
        info!(offer_id = %offer.id, pct = %offer.discount_percentage, "Offer created");
        self.event_sender.send_or_log(Event::OfferCreated(offer.id)).await;
        Ok(offer)
    }

    #[instrument(skip(self))]
    pub async fn update_offer(&self, id: Uuid, input: UpdateOfferRequest) -> Result<Offer, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let offer = self.store.offers.update(id, |offer| {
            if let Some(name) = &input.name {
                offer.name = name.trim().to_string();
            }
            if let Some(pct) = input.discount_percentage {
                offer.discount_percentage = pct;
            }
            if let Some(starts_at) = input.starts_at {
                offer.starts_at = starts_at;
            }
            if let Some(expires_at) = input.expires_at {
                offer.expires_at = expires_at;
            }
            if let Some(is_active) = input.is_active {
                offer.is_active = is_active;
            }
            ensure_window(offer.starts_at, offer.expires_at)?;
            offer.updated_at = now;
            Ok(offer.clone())
        })?;
        self.event_sender.send_or_log(Event::OfferUpdated(id)).await;
        Ok(offer)
    }

    #[instrument(skip(self))]
    pub async fn delete_offer(&self, id: Uuid) -> Result<(), ServiceError> {
        self.store
            .offers
            .remove(id)
            .ok_or_else(|| ServiceError::NotFound(format!("Offer {} not found", id)))?;
        self.event_sender.send_or_log(Event::OfferDeleted(id)).await;
        Ok(())
    }

    /// Offers sorted by start time. Shoppers only see the ones running now.
    pub async fn list_offers(&self, live_only: bool) -> Vec<Offer> {
        let now = Utc::now();
        let mut offers = self.store.offers.filter(|o| !live_only || o.is_live(now));
        offers.sort_by(|a, b| b.starts_at.cmp(&a.starts_at));
        offers
    }
}
