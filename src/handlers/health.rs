use axum::{extract::State, response::Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

/// Liveness report with a snapshot of the in-memory store
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub store: StoreCounts,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoreCounts {
    pub categories: usize,
    pub products: usize,
    pub orders: usize,
    pub pending_returns: usize,
    pub coupons: usize,
    pub offers: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    summary = "Health check",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "up",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        store: StoreCounts {
            categories: state.store.categories.len(),
            products: state.store.products.len(),
            orders: state.store.orders.len(),
            pending_returns: state.store.orders.count_pending_returns(),
            coupons: state.store.coupons.len(),
            offers: state.store.offers.len(),
        },
    })
}
