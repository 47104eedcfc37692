#![allow(dead_code)]

use std::str::FromStr;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use marketplace_api::{
    auth::Role, config::AppConfig, events, services::payments::SignatureVerifier, AppState,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const GATEWAY_SECRET: &str = "test_gateway_key_secret";

/// A caller with a freshly minted bearer token
#[derive(Clone, Debug)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    pub token: String,
}

/// Helper harness wiring the full router over a fresh in-memory store.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub admin: Actor,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::new(JWT_SECRET, GATEWAY_SECRET)).await
    }

    pub async fn with_config(cfg: AppConfig) -> Self {
        let (state, event_rx) = AppState::new(cfg);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let router = marketplace_api::build_router(state.clone()).expect("router builds");

        let mut app = Self {
            router,
            state,
            admin: Actor {
                id: Uuid::nil(),
                role: Role::Admin,
                token: String::new(),
            },
            _event_task: event_task,
        };
        app.admin = app.actor(Role::Admin);
        app
    }

    /// Mints a token for a new user with `role`.
    pub fn actor(&self, role: Role) -> Actor {
        let id = Uuid::new_v4();
        let token = self
            .state
            .auth
            .issue_token(id, role)
            .expect("token is signed");
        Actor { id, role, token }
    }

    pub fn customer(&self) -> Actor {
        self.actor(Role::Customer)
    }

    pub fn vendor(&self) -> Actor {
        self.actor(Role::Vendor)
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Request as `actor`, returning status and decoded JSON body.
    pub async fn call(
        &self,
        actor: &Actor,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, Some(&actor.token)).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn create_category(&self, name: &str) -> Uuid {
        let (status, body) = self
            .call(
                &self.admin,
                Method::POST,
                "/api/v1/categories",
                Some(json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create category: {body}");
        uuid_at(&body["data"]["id"])
    }

    /// Lists a product for `vendor` and returns its id.
    pub async fn create_product(
        &self,
        vendor: &Actor,
        category_id: Uuid,
        sku: &str,
        price: &str,
        stock: u32,
    ) -> Uuid {
        let (status, body) = self
            .call(
                vendor,
                Method::POST,
                "/api/v1/products",
                Some(json!({
                    "category_id": category_id,
                    "name": format!("Product {sku}"),
                    "sku": sku,
                    "price": price,
                    "stock": stock,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create product: {body}");
        uuid_at(&body["data"]["product"]["id"])
    }

    pub async fn create_coupon(&self, code: &str, pct: &str, minimum: &str) -> Value {
        let (status, body) = self
            .call(
                &self.admin,
                Method::POST,
                "/api/v1/coupons",
                Some(json!({
                    "code": code,
                    "discount_percentage": pct,
                    "minimum_purchase": minimum,
                    "expires_at": Utc::now() + Duration::days(30),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create coupon: {body}");
        body["data"].clone()
    }

    pub async fn add_to_cart(&self, customer: &Actor, product_id: Uuid, quantity: u32) -> Value {
        let (status, body) = self
            .call(
                customer,
                Method::POST,
                "/api/v1/cart/items",
                Some(json!({ "product_id": product_id, "quantity": quantity })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "add to cart: {body}");
        body["data"].clone()
    }

    pub async fn checkout(&self, customer: &Actor, payment_method: &str) -> (StatusCode, Value) {
        self.call(
            customer,
            Method::POST,
            "/api/v1/checkout",
            Some(json!({
                "shipping_address": shipping_address(),
                "payment_method": payment_method,
            })),
        )
        .await
    }

    /// Puts `lines` into the customer's cart and checks out; returns the order.
    pub async fn place_order(
        &self,
        customer: &Actor,
        lines: &[(Uuid, u32)],
        payment_method: &str,
    ) -> Value {
        for &(product_id, quantity) in lines {
            self.add_to_cart(customer, product_id, quantity).await;
        }
        let (status, body) = self.checkout(customer, payment_method).await;
        assert_eq!(status, StatusCode::CREATED, "checkout: {body}");
        body["data"].clone()
    }

    pub async fn set_item_status(
        &self,
        actor: &Actor,
        order_id: &str,
        item_id: &str,
        status: &str,
    ) -> (StatusCode, Value) {
        self.call(
            actor,
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/items/{item_id}/status"),
            Some(json!({ "status": status })),
        )
        .await
    }

    /// Walks an item from processing to delivered.
    pub async fn deliver(&self, vendor: &Actor, order_id: &str, item_id: &str) {
        for status in ["shipped", "delivered"] {
            let (code, body) = self.set_item_status(vendor, order_id, item_id, status).await;
            assert_eq!(code, StatusCode::OK, "move to {status}: {body}");
        }
    }

    pub async fn stock_of(&self, product_id: Uuid) -> u64 {
        let response = self
            .request(Method::GET, &format!("/api/v1/products/{product_id}"), None, None)
            .await;
        let body = response_json(response).await;
        body["data"]["product"]["stock"]
            .as_u64()
            .expect("stock is a number")
    }

    pub fn gateway_signature(&self, gateway_order_id: &str, gateway_payment_id: &str) -> String {
        SignatureVerifier::new(GATEWAY_SECRET)
            .sign(gateway_order_id, gateway_payment_id)
            .expect("signature")
    }
}

pub fn shipping_address() -> Value {
    json!({
        "full_name": "Asha Rao",
        "phone": "9876543210",
        "line1": "12 MG Road",
        "city": "Bengaluru",
        "state": "KA",
        "postal_code": "560001",
        "country": "India"
    })
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}

pub fn uuid_at(value: &Value) -> Uuid {
    Uuid::parse_str(value.as_str().expect("uuid string")).expect("valid uuid")
}

/// Decimals travel as strings.
pub fn money(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("decimal string")).expect("valid decimal")
}

pub fn first_item_id(order: &Value) -> String {
    order["items"][0]["id"]
        .as_str()
        .expect("order has an item")
        .to_string()
}

pub fn item_id_for(order: &Value, sku: &str) -> String {
    order["items"]
        .as_array()
        .expect("order items")
        .iter()
        .find(|item| item["sku"] == sku)
        .and_then(|item| item["id"].as_str())
        .expect("order has an item with that sku")
        .to_string()
}
