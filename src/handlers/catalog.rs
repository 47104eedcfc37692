use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
    routing::get,
    Router,
};
use uuid::Uuid;

use super::common::{created_response, page_params, paginated};
use crate::{
    auth::{AuthUser, Role},
    errors::ServiceError,
    models::Category,
    services::{
        catalog::{
            CreateCategoryRequest, CreateProductRequest, ProductFilter, UpdateCategoryRequest,
            UpdateProductRequest,
        },
        commerce::ProductView,
    },
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/{id}", get(get_category).put(update_category))
        .route("/products", get(list_products).post(create_product))
        .route("/products/{id}", get(get_product).put(update_product))
}

/// Admins also see inactive categories.
pub async fn list_categories(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
) -> ApiResult<Vec<Category>> {
    let include_inactive = viewer.is_some_and(|u| u.is_admin());
    let categories = state
        .services
        .catalog
        .list_categories(include_inactive)
        .await;
    Ok(Json(ApiResponse::success(categories)))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    viewer: Option<AuthUser>,
) -> ApiResult<Category> {
    let include_inactive = viewer.is_some_and(|u| u.is_admin());
    let category = state
        .services
        .catalog
        .get_category(id, include_inactive)
        .await?;
    Ok(Json(ApiResponse::success(category)))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    summary = "Create category",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<Category>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "catalog"
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<Response, ServiceError> {
    user.require_any(&[Role::Admin])?;
    let category = state.services.catalog.create_category(payload).await?;
    Ok(created_response(category))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(payload): Json<UpdateCategoryRequest>,
) -> ApiResult<Category> {
    user.require_any(&[Role::Admin])?;
    let category = state.services.catalog.update_category(id, payload).await?;
    Ok(Json(ApiResponse::success(category)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    summary = "List products",
    description = "Active products with their effective price after the best live offer",
    params(ProductFilter, ListQuery),
    responses(
        (status = 200, description = "Products retrieved", body = ApiResponse<PaginatedResponse<ProductView>>),
    ),
    tag = "catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
    Query(query): Query<ListQuery>,
    viewer: Option<AuthUser>,
) -> Result<Response, ServiceError> {
    let (page, limit) = page_params(&state, &query);
    let (items, total) = state
        .services
        .catalog
        .list_products(filter, viewer, page, limit)
        .await;
    Ok(paginated(items, total, page, limit))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    viewer: Option<AuthUser>,
) -> ApiResult<ProductView> {
    let product = state.services.catalog.get_product(id, viewer).await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    summary = "Create product",
    description = "Lists a new product owned by the calling vendor",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductView>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Only vendors may list products", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already taken", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "catalog"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<Response, ServiceError> {
    user.require_any(&[Role::Vendor])?;
    let product = state
        .services
        .catalog
        .create_product(user.user_id, payload)
        .await?;
    Ok(created_response(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(payload): Json<UpdateProductRequest>,
) -> ApiResult<ProductView> {
    user.require_any(&[Role::Vendor, Role::Admin])?;
    let product = state
        .services
        .catalog
        .update_product(id, payload, user)
        .await?;
    Ok(Json(ApiResponse::success(product)))
}
