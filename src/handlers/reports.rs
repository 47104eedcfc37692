use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};

use crate::{
    auth::AuthUser,
    services::reports::{SalesReport, SalesReportQuery},
    ApiResponse, ApiResult, AppState,
};

pub fn report_routes() -> Router<AppState> {
    Router::new().route("/reports/sales", get(sales_report))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/sales",
    summary = "Sales report",
    description = "Orders placed in [from, to). Vendors only see their own items.",
    params(SalesReportQuery),
    responses(
        (status = 200, description = "Sales report", body = ApiResponse<SalesReport>),
        (status = 400, description = "Empty or inverted period", body = crate::errors::ErrorResponse),
        (status = 403, description = "Customers cannot read reports", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "reports"
)]
pub async fn sales_report(
    State(state): State<AppState>,
    Query(query): Query<SalesReportQuery>,
    user: AuthUser,
) -> ApiResult<SalesReport> {
    let report = state.services.reports.sales_report(user, query).await?;
    Ok(Json(ApiResponse::success(report)))
}
