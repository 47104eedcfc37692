use axum::{extract::State, response::Response, routing::post, Json, Router};

use crate::{
    auth::{AuthUser, Role},
    errors::ServiceError,
    handlers::common::created_response,
    models::Order,
    services::commerce::checkout_service::CheckoutRequest,
    ApiResponse, AppState,
};

pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/checkout", post(checkout))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    summary = "Place order from cart",
    description = "Re-prices the cart, reserves stock, redeems the coupon and creates the order. \
                   Cash on delivery is refused above the configured limit.",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<Order>),
        (status = 400, description = "Empty cart, invalid address or COD over limit", body = crate::errors::ErrorResponse),
        (status = 409, description = "Coupon already used", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "checkout"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Response, ServiceError> {
    user.require_any(&[Role::Customer])?;
    let order = state
        .services
        .checkout
        .checkout(user.user_id, payload)
        .await?;
    Ok(created_response(order))
}
