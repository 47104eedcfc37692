use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{page_params, paginated};
use crate::{
    auth::{AuthUser, Role},
    errors::ServiceError,
    models::{Order, ReturnStatus},
    services::returns::{ApproveReturnBody, RejectReturnBody, RequestReturnBody, ReturnRecord},
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReturnListFilter {
    pub status: Option<ReturnStatus>,
}

pub fn return_routes() -> Router<AppState> {
    Router::new()
        .route("/returns", get(list_returns))
        .route("/orders/{id}/items/{item_id}/return", post(request_return))
        .route(
            "/orders/{id}/items/{item_id}/return/approve",
            post(approve_return),
        )
        .route(
            "/orders/{id}/items/{item_id}/return/reject",
            post(reject_return),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/returns",
    summary = "List return requests",
    description = "Vendors see requests on their own items; admins see all",
    params(ReturnListFilter, ListQuery),
    responses(
        (status = 200, description = "Return requests", body = ApiResponse<PaginatedResponse<ReturnRecord>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "returns"
)]
pub async fn list_returns(
    State(state): State<AppState>,
    Query(filter): Query<ReturnListFilter>,
    Query(query): Query<ListQuery>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    user.require_any(&[Role::Vendor, Role::Admin])?;
    let (page, limit) = page_params(&state, &query);
    let (items, total) = state
        .services
        .returns
        .list_returns(user, filter.status, page, limit)
        .await;
    Ok(paginated(items, total, page, limit))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/items/{item_id}/return",
    summary = "Request return",
    description = "Only for delivered items without an earlier return request",
    params(
        ("id" = Uuid, Path, description = "Order id"),
        ("item_id" = Uuid, Path, description = "Order item id"),
    ),
    request_body = RequestReturnBody,
    responses(
        (status = 200, description = "Return requested", body = ApiResponse<Order>),
        (status = 400, description = "Item not eligible or reason missing", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the order owner", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "returns"
)]
pub async fn request_return(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
    Json(payload): Json<RequestReturnBody>,
) -> ApiResult<Order> {
    user.require_any(&[Role::Customer])?;
    let order = state
        .services
        .returns
        .request_return(id, item_id, payload.reason, user)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        order,
        "Return requested",
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/items/{item_id}/return/approve",
    summary = "Approve return",
    description = "Marks the item returned, restores stock and refunds paid items",
    params(
        ("id" = Uuid, Path, description = "Order id"),
        ("item_id" = Uuid, Path, description = "Order item id"),
    ),
    request_body = ApproveReturnBody,
    responses(
        (status = 200, description = "Return approved", body = ApiResponse<Order>),
        (status = 400, description = "No pending return", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the item's vendor", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "returns"
)]
pub async fn approve_return(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
    payload: Option<Json<ApproveReturnBody>>,
) -> ApiResult<Order> {
    user.require_any(&[Role::Vendor, Role::Admin])?;
    let comment = payload.and_then(|Json(body)| body.comment);
    let order = state
        .services
        .returns
        .approve_return(id, item_id, comment, user)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        order,
        "Return approved",
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/items/{item_id}/return/reject",
    summary = "Reject return",
    description = "A non-empty comment is required",
    params(
        ("id" = Uuid, Path, description = "Order id"),
        ("item_id" = Uuid, Path, description = "Order item id"),
    ),
    request_body = RejectReturnBody,
    responses(
        (status = 200, description = "Return rejected", body = ApiResponse<Order>),
        (status = 400, description = "Comment missing or no pending return", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the item's vendor", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "returns"
)]
pub async fn reject_return(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    user: AuthUser,
    Json(payload): Json<RejectReturnBody>,
) -> ApiResult<Order> {
    user.require_any(&[Role::Vendor, Role::Admin])?;
    let order = state
        .services
        .returns
        .reject_return(id, item_id, payload.comment, user)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        order,
        "Return rejected",
    )))
}
