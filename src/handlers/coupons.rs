use axum::{
    extract::{Path, State},
    response::{Json, Response},
    routing::get,
    Router,
};
use uuid::Uuid;

use super::common::{created_response, no_content_response};
use crate::{
    auth::{AuthUser, Role},
    errors::ServiceError,
    models::Coupon,
    services::coupons::{CouponResponse, CreateCouponRequest, UpdateCouponRequest},
    ApiResponse, ApiResult, AppState,
};

pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/coupons", get(list_coupons).post(create_coupon))
        .route("/coupons/available", get(available_coupons))
        .route(
            "/coupons/{id}",
            get(get_coupon).put(update_coupon).delete(delete_coupon),
        )
}

pub async fn list_coupons(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<CouponResponse>> {
    user.require_any(&[Role::Admin])?;
    let coupons = state.services.coupons.list_coupons().await;
    Ok(Json(ApiResponse::success(coupons)))
}

#[utoipa::path(
    post,
    path = "/api/v1/coupons",
    summary = "Create coupon",
    description = "Codes are stored upper-case and must be unique",
    request_body = CreateCouponRequest,
    responses(
        (status = 201, description = "Coupon created", body = ApiResponse<CouponResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code already exists", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "promotions"
)]
pub async fn create_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCouponRequest>,
) -> Result<Response, ServiceError> {
    user.require_any(&[Role::Admin])?;
    let coupon = state.services.coupons.create_coupon(payload).await?;
    Ok(created_response(coupon))
}

#[utoipa::path(
    get,
    path = "/api/v1/coupons/available",
    summary = "Coupons the caller can still use",
    responses(
        (status = 200, description = "Active, unexpired coupons not yet redeemed by the caller", body = ApiResponse<Vec<Coupon>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "promotions"
)]
pub async fn available_coupons(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<Coupon>> {
    user.require_any(&[Role::Customer])?;
    let coupons = state.services.coupons.available_for(user.user_id).await;
    Ok(Json(ApiResponse::success(coupons)))
}

pub async fn get_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<CouponResponse> {
    user.require_any(&[Role::Admin])?;
    let coupon = state.services.coupons.get_coupon(id).await?;
    Ok(Json(ApiResponse::success(coupon)))
}

pub async fn update_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(payload): Json<UpdateCouponRequest>,
) -> ApiResult<CouponResponse> {
    user.require_any(&[Role::Admin])?;
    let coupon = state.services.coupons.update_coupon(id, payload).await?;
    Ok(Json(ApiResponse::success(coupon)))
}

pub async fn delete_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    user.require_any(&[Role::Admin])?;
    state.services.coupons.delete_coupon(id).await?;
    Ok(no_content_response())
}
