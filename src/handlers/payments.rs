use axum::{
    extract::{Path, State},
    response::Json,
    routing::post,
    Router,
};
use uuid::Uuid;

use crate::{
    auth::{AuthUser, Role},
    models::Order,
    services::payments::VerifyPaymentRequest,
    ApiResponse, ApiResult, AppState,
};

pub fn payment_routes() -> Router<AppState> {
    Router::new().route("/orders/{id}/payment/verify", post(verify_payment))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/payment/verify",
    summary = "Verify online payment",
    description = "Checks the gateway signature over `{gateway_order_id}|{gateway_payment_id}`. \
                   A bad signature marks the payment failed; verification may be retried.",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment captured", body = ApiResponse<Order>),
        (status = 400, description = "Gateway order mismatch or not an online order", body = crate::errors::ErrorResponse),
        (status = 402, description = "Signature mismatch", body = crate::errors::ErrorResponse),
        (status = 409, description = "Payment already captured", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(payload): Json<VerifyPaymentRequest>,
) -> ApiResult<Order> {
    user.require_any(&[Role::Customer])?;
    let order = state
        .services
        .payments
        .verify_payment(id, payload, user)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        order,
        "Payment verified",
    )))
}
