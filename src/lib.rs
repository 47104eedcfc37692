//! Multi-vendor marketplace API: catalog, carts, checkout, per-item order
//! fulfilment with cancellations and returns, coupons, offers and sales reports.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod commands;
pub mod config;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod models;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{
    http::{HeaderValue, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::AuthConfig,
    config::{AppConfig, AppConfigError},
    events::{Event, EventSender},
    handlers::AppServices,
    repositories::Store,
};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthConfig>,
    pub store: Arc<Store>,
    pub event_sender: Arc<EventSender>,
    pub services: AppServices,
    pub started_at: Instant,
}

impl AppState {
    /// Wires a fresh store and the service graph. The caller owns the event
    /// receiver and decides where it is drained.
    pub fn new(config: AppConfig) -> (Self, mpsc::Receiver<Event>) {
        let (sender, receiver) = events::channel(config.event_channel_capacity);
        let event_sender = Arc::new(sender);
        let store = Store::new();
        let auth = Arc::new(AuthConfig::new(
            config.jwt_secret.clone(),
            config.jwt_expiration,
        ));
        let services = AppServices::new(store.clone(), event_sender.clone(), &config);

        let state = Self {
            config: Arc::new(config),
            auth,
            store,
            event_sender,
            services,
            started_at: Instant::now(),
        };
        (state, receiver)
    }
}

/// Page selection shared by list endpoints
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    /// Clamped to the configured maximum page size
    pub limit: Option<u64>,
}

fn default_page() -> u64 {
    1
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: None,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let limit = limit.max(1);
        Self {
            items,
            total,
            page: page.max(1),
            limit,
            total_pages: total.div_ceil(limit),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Every `/api/v1` route
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::catalog::catalog_routes())
        .merge(handlers::commerce::cart_routes())
        .merge(handlers::commerce::checkout_routes())
        .merge(handlers::orders::order_routes())
        .merge(handlers::payments::payment_routes())
        .merge(handlers::returns::return_routes())
        .merge(handlers::coupons::coupon_routes())
        .merge(handlers::offers::offer_routes())
        .merge(handlers::reports::report_routes())
}

/// CORS from configuration: explicit origins win, otherwise permissive only
/// where the configuration allows it.
pub fn cors_layer(config: &AppConfig) -> Result<CorsLayer, AppConfigError> {
    let configured_origins: Option<Vec<HeaderValue>> = config
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any))
    } else if config.should_allow_permissive_cors() {
        ::tracing::info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if config.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        Ok(CorsLayer::permissive())
    } else {
        ::tracing::error!("Missing CORS configuration detected");
        Err(AppConfigError::MissingCors)
    }
}

/// Full application router: public endpoints, `/api/v1`, and the HTTP layers.
pub fn build_router(state: AppState) -> Result<Router, AppConfigError> {
    let cors = cors_layer(&state.config)?;
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Ok(Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .nest("/api/v1", api_v1_routes())
        .layer(crate::tracing::configure_http_tracing())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(cors)
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state))
}
