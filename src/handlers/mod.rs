pub mod catalog;
pub mod commerce;
pub mod common;
pub mod coupons;
pub mod health;
pub mod offers;
pub mod orders;
pub mod payments;
pub mod reports;
pub mod returns;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    events::EventSender,
    repositories::Store,
    services::{
        catalog::CatalogService,
        commerce::{CartService, CheckoutService, PricingService},
        coupons::CouponService,
        offers::OfferService,
        orders::OrderService,
        payments::{PaymentService, SignatureVerifier},
        reports::ReportService,
        returns::ReturnService,
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub pricing: Arc<PricingService>,
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub returns: Arc<ReturnService>,
    pub coupons: Arc<CouponService>,
    pub offers: Arc<OfferService>,
    pub reports: Arc<ReportService>,
}

impl AppServices {
    pub fn new(store: Arc<Store>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        let pricing = Arc::new(PricingService::new(store.clone(), config.cod_limit));
        let verifier = SignatureVerifier::new(&config.payment_gateway_key_secret);

        Self {
            catalog: Arc::new(CatalogService::new(
                store.clone(),
                event_sender.clone(),
                pricing.clone(),
            )),
            cart: Arc::new(CartService::new(store.clone(), pricing.clone())),
            checkout: Arc::new(CheckoutService::new(
                store.clone(),
                event_sender.clone(),
                pricing.clone(),
            )),
            orders: Arc::new(OrderService::new(store.clone(), event_sender.clone())),
            payments: Arc::new(PaymentService::new(
                store.clone(),
                event_sender.clone(),
                verifier,
            )),
            returns: Arc::new(ReturnService::new(store.clone(), event_sender.clone())),
            coupons: Arc::new(CouponService::new(store.clone(), event_sender.clone())),
            offers: Arc::new(OfferService::new(store.clone(), event_sender)),
            reports: Arc::new(ReportService::new(store, config.currency.clone())),
            pricing,
        }
    }
}
