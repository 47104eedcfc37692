use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{page_params, paginated};
use crate::{
    auth::{AuthUser, Role},
    errors::ServiceError,
    models::{Order, OrderStatus},
    services::orders::{CancelItemRequest, ItemActions, UpdateItemStatusRequest},
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListFilter {
    pub status: Option<OrderStatus>,
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route(
            "/orders/{id}/items/{item_id}/transitions",
            get(get_item_transitions),
        )
        .route(
            "/orders/{id}/items/{item_id}/status",
            put(update_item_status),
        )
        .route("/orders/{id}/items/{item_id}/cancel", post(cancel_item))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "Newest first. Customers see their own orders, vendors see orders \
                   containing their items (only those items), admins see everything.",
    params(OrderListFilter, ListQuery),
    responses(
        (status = 200, description = "Orders retrieved successfully", body = ApiResponse<PaginatedResponse<Order>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderListFilter>,
    Query(query): Query<ListQuery>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let (page, limit) = page_params(&state, &query);
    let (items, total) = state
        .services
        .orders
        .list_orders(user, filter.status, page, limit)
        .await;
    Ok(paginated(items, total, page, limit))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved successfully", body = ApiResponse<Order>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<Order> {
    let order = state.services.orders.get_order(id, user).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/items/{item_id}/transitions",
    summary = "Allowed item actions",
    description = "The next status the caller may set, and whether cancel or return is open",
    params(
        ("id" = Uuid, Path, description = "Order id"),
        ("item_id" = Uuid, Path, description = "Order item id"),
    ),
    responses(
        (status = 200, description = "Allowed actions", body = ApiResponse<ItemActions>),
        (status = 404, description = "Order or item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn get_item_transitions(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
) -> ApiResult<ItemActions> {
    let actions = state.services.orders.item_actions(id, item_id, user).await?;
    Ok(Json(ApiResponse::success(actions)))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/items/{item_id}/status",
    summary = "Advance item status",
    description = "Moves the item exactly one step along processing → shipped → delivered",
    params(
        ("id" = Uuid, Path, description = "Order id"),
        ("item_id" = Uuid, Path, description = "Order item id"),
    ),
    request_body = UpdateItemStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Order>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the item's vendor", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order or item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn update_item_status(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
    Json(payload): Json<UpdateItemStatusRequest>,
) -> ApiResult<Order> {
    user.require_any(&[Role::Vendor, Role::Admin])?;
    let order = state
        .services
        .orders
        .update_item_status(id, item_id, payload.status, user)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        order,
        "Item status updated",
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/items/{item_id}/cancel",
    summary = "Cancel item",
    description = "Allowed until the item is delivered. \
                   Stock is restored and paid items are refunded.",
    params(
        ("id" = Uuid, Path, description = "Order id"),
        ("item_id" = Uuid, Path, description = "Order item id"),
    ),
    request_body = CancelItemRequest,
    responses(
        (status = 200, description = "Item cancelled", body = ApiResponse<Order>),
        (status = 400, description = "Item can no longer be cancelled", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the order owner", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order or item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn cancel_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
    Json(payload): Json<CancelItemRequest>,
) -> ApiResult<Order> {
    user.require_any(&[Role::Customer, Role::Admin])?;
    let order = state
        .services
        .orders
        .cancel_item(id, item_id, payload.reason, user)
        .await?;
    Ok(Json(ApiResponse::success_with_message(order, "Item cancelled")))
}
