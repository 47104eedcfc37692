use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use uuid::Uuid;

use crate::{
    auth::{AuthUser, Role},
    services::commerce::{
        cart_service::{AddToCartInput, ApplyCouponInput, UpdateCartItemInput},
        CartSummary,
    },
    ApiResponse, ApiResult, AppState,
};

/// Carts are keyed by the authenticated customer; there is no cart id on the wire.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart))
        .route("/cart/items", post(add_to_cart))
        .route(
            "/cart/items/{product_id}",
            put(update_cart_item).delete(remove_cart_item),
        )
        .route("/cart/coupon", post(apply_coupon).delete(remove_coupon))
}

#[utoipa::path(
    get,
    path = "/api/v1/cart",
    summary = "View cart",
    description = "Priced cart summary including coupon discount and COD availability",
    responses(
        (status = 200, description = "Cart summary", body = ApiResponse<CartSummary>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "cart"
)]
pub async fn get_cart(State(state): State<AppState>, user: AuthUser) -> ApiResult<CartSummary> {
    user.require_any(&[Role::Customer])?;
    let cart = state.services.cart.get_cart(user.user_id).await?;
    Ok(Json(ApiResponse::success(cart)))
}

#[utoipa::path(
    post,
    path = "/api/v1/cart/items",
    summary = "Add item to cart",
    request_body = AddToCartInput,
    responses(
        (status = 200, description = "Updated cart", body = ApiResponse<CartSummary>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddToCartInput>,
) -> ApiResult<CartSummary> {
    user.require_any(&[Role::Customer])?;
    let cart = state.services.cart.add_item(user.user_id, payload).await?;
    Ok(Json(ApiResponse::success(cart)))
}

/// Quantity zero removes the line.
pub async fn update_cart_item(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    user: AuthUser,
    Json(payload): Json<UpdateCartItemInput>,
) -> ApiResult<CartSummary> {
    user.require_any(&[Role::Customer])?;
    let cart = state
        .services
        .cart
        .update_item_quantity(user.user_id, product_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(cart)))
}

pub async fn remove_cart_item(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<CartSummary> {
    user.require_any(&[Role::Customer])?;
    let cart = state
        .services
        .cart
        .remove_item(user.user_id, product_id)
        .await?;
    Ok(Json(ApiResponse::success(cart)))
}

#[utoipa::path(
    post,
    path = "/api/v1/cart/coupon",
    summary = "Apply coupon",
    description = "Validates the coupon against the current cart and replaces any coupon already applied",
    request_body = ApplyCouponInput,
    responses(
        (status = 200, description = "Updated cart", body = ApiResponse<CartSummary>),
        (status = 400, description = "Coupon not applicable", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown coupon", body = crate::errors::ErrorResponse),
        (status = 409, description = "Coupon already used", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "cart"
)]
pub async fn apply_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ApplyCouponInput>,
) -> ApiResult<CartSummary> {
    user.require_any(&[Role::Customer])?;
    let cart = state
        .services
        .cart
        .apply_coupon(user.user_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(cart)))
}

pub async fn remove_coupon(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<CartSummary> {
    user.require_any(&[Role::Customer])?;
    let cart = state.services.cart.remove_coupon(user.user_id).await?;
    Ok(Json(ApiResponse::success(cart)))
}
