use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

/// `200 OK` with the standard envelope
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// `201 Created` with the standard envelope
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Resolves the page and the clamped page size for a list request.
pub fn page_params(state: &AppState, query: &ListQuery) -> (u64, u64) {
    (query.page.max(1), state.config.page_limit(query.limit))
}

pub fn paginated<T: Serialize>(items: Vec<T>, total: u64, page: u64, limit: u64) -> Response {
    success_response(PaginatedResponse::new(items, total, page, limit))
}
