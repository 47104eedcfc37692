use axum::{
    extract::{Path, State},
    response::{Json, Response},
    routing::{get, put},
    Router,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response};
use crate::{
    auth::{AuthUser, Role},
    errors::ServiceError,
    models::Offer,
    services::offers::{CreateOfferRequest, UpdateOfferRequest},
    ApiResponse, ApiResult, AppState,
};

pub fn offer_routes() -> Router<AppState> {
    Router::new()
        .route("/offers", get(list_offers).post(create_offer))
        .route("/offers/{id}", put(update_offer).delete(delete_offer))
}

/// Everyone but admins only sees offers that are live right now.
pub async fn list_offers(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
) -> ApiResult<Vec<Offer>> {
    let live_only = !viewer.is_some_and(|u| u.is_admin());
    let offers = state.services.offers.list_offers(live_only).await;
    Ok(Json(ApiResponse::success(offers)))
}

#[utoipa::path(
    post,
    path = "/api/v1/offers",
    summary = "Create offer",
    description = "Percentage discount on a product or a whole category for a time window",
    request_body = CreateOfferRequest,
    responses(
        (status = 201, description = "Offer created", body = ApiResponse<Offer>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Target not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "promotions"
)]
pub async fn create_offer(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOfferRequest>,
) -> Result<Response, ServiceError> {
    user.require_any(&[Role::Admin])?;
    let offer = state.services.offers.create_offer(payload).await?;
    Ok(created_response(offer))
}

pub async fn update_offer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(payload): Json<UpdateOfferRequest>,
) -> ApiResult<Offer> {
    user.require_any(&[Role::Admin])?;
    let offer = state.services.offers.update_offer(id, payload).await?;
    Ok(Json(ApiResponse::success(offer)))
}

pub async fn delete_offer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    user.require_any(&[Role::Admin])?;
    state.services.offers.delete_offer(id).await?;
    Ok(no_content_response())
}
