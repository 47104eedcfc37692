use axum::response::Json;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Marketplace API",
        version = "1.0.0",
        description = r#"
# Marketplace API

Multi-vendor marketplace: catalog, carts, checkout, per-item fulfilment,
cancellations, returns, coupons, offers and sales reports.

## Authentication

Endpoints under `/api/v1` that act on behalf of a user expect a JWT issued by
the identity service:

```
Authorization: Bearer <your-jwt-token>
```

The `role` claim is one of `customer`, `vendor` or `admin`.

## Item workflow

Every order item moves on its own, one step at a time:
`processing → shipped → delivered`. Items can be cancelled until they are
delivered. Delivered items can be returned once.

## Pagination

List endpoints accept `page` (default 1) and `limit` (clamped to the
configured maximum).
        "#,
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "catalog", description = "Categories and products"),
        (name = "cart", description = "Customer cart"),
        (name = "checkout", description = "Order placement"),
        (name = "orders", description = "Orders and item fulfilment"),
        (name = "payments", description = "Online payment verification"),
        (name = "returns", description = "Item returns"),
        (name = "promotions", description = "Coupons and offers"),
        (name = "reports", description = "Sales reporting"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::health::health_check,

        // Catalog
        crate::handlers::catalog::create_category,
        crate::handlers::catalog::list_products,
        crate::handlers::catalog::create_product,

        // Cart & checkout
        crate::handlers::commerce::carts::get_cart,
        crate::handlers::commerce::carts::add_to_cart,
        crate::handlers::commerce::carts::apply_coupon,
        crate::handlers::commerce::checkout::checkout,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::get_item_transitions,
        crate::handlers::orders::update_item_status,
        crate::handlers::orders::cancel_item,
        crate::handlers::payments::verify_payment,

        // Returns
        crate::handlers::returns::list_returns,
        crate::handlers::returns::request_return,
        crate::handlers::returns::approve_return,
        crate::handlers::returns::reject_return,

        // Promotions
        crate::handlers::coupons::create_coupon,
        crate::handlers::coupons::available_coupons,
        crate::handlers::offers::create_offer,

        // Reports
        crate::handlers::reports::sales_report,
    ),
    components(
        schemas(
            crate::models::OrderStatus,
            crate::models::ItemStatus,
            crate::models::ReturnStatus,
            crate::models::CancelReason,
            crate::models::PaymentMethod,
            crate::models::PaymentStatus,
            crate::auth::Role,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Serves the generated document as JSON.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}
