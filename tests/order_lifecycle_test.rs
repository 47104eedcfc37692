//! End-to-end tests for the per-item order lifecycle.
//!
//! Tests cover:
//! - processing → shipped → delivered, one step at a time
//! - order status derived from item statuses
//! - vendor ownership of status changes
//! - cancellation windows, restocking and refunds
//! - read scoping for customers and vendors

mod common;

use axum::http::{Method, StatusCode};
use common::{first_item_id, item_id_for, money, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn cod_order_moves_through_every_status_and_is_paid_on_delivery() {
    let app = TestApp::new().await;
    let vendor = app.vendor();
    let customer = app.customer();
    let category = app.create_category("Kitchen").await;
    let kettle = app
        .create_product(&vendor, category, "KT-1", "499.50", 10)
        .await;

    let order = app.place_order(&customer, &[(kettle, 2)], "cod").await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let item_id = first_item_id(&order);
    assert_eq!(order["status"], "processing");
    assert_eq!(order["items"][0]["item_status"], "processing");
    assert_eq!(order["payment_status"], "pending");
    assert_eq!(money(&order["total"]), dec!(999.00));
    assert_eq!(app.stock_of(kettle).await, 8);

    let (status, body) = app
        .set_item_status(&vendor, &order_id, &item_id, "shipped")
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "shipped");
    assert_eq!(body["data"]["items"][0]["item_status"], "shipped");

    let (status, body) = app
        .set_item_status(&vendor, &order_id, &item_id, "delivered")
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "delivered");
    assert_eq!(body["data"]["payment_status"], "paid");
    assert!(body["data"]["delivered_at"].is_string());
}

#[tokio::test]
async fn skipping_or_repeating_a_step_is_rejected_without_change() {
    let app = TestApp::new().await;
    let vendor = app.vendor();
    let customer = app.customer();
    let category = app.create_category("Garden").await;
    let hose = app.create_product(&vendor, category, "HS-1", "250", 5).await;

    let order = app.place_order(&customer, &[(hose, 1)], "cod").await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let item_id = first_item_id(&order);

    let (status, body) = app
        .set_item_status(&vendor, &order_id, &item_id, "delivered")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = app
        .set_item_status(&vendor, &order_id, &item_id, "processing")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (_, body) = app
        .call(&customer, Method::GET, &format!("/api/v1/orders/{order_id}"), None)
        .await;
    assert_eq!(body["data"]["items"][0]["item_status"], "processing");
}

#[tokio::test]
async fn only_the_selling_vendor_or_admin_moves_an_item() {
    let app = TestApp::new().await;
    let vendor = app.vendor();
    let other_vendor = app.vendor();
    let customer = app.customer();
    let category = app.create_category("Books").await;
    let book = app.create_product(&vendor, category, "BK-1", "300", 5).await;

    let order = app.place_order(&customer, &[(book, 1)], "cod").await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let item_id = first_item_id(&order);

    let (status, _) = app
        .set_item_status(&other_vendor, &order_id, &item_id, "shipped")
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .set_item_status(&customer, &order_id, &item_id, "shipped")
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.admin.clone();
    let (status, body) = app
        .set_item_status(&admin, &order_id, &item_id, "shipped")
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn cancelling_restocks_and_closes_the_item() {
    let app = TestApp::new().await;
    let vendor = app.vendor();
    let customer = app.customer();
    let category = app.create_category("Toys").await;
    let kite = app.create_product(&vendor, category, "KI-1", "120", 4).await;
    let yoyo = app.create_product(&vendor, category, "YO-1", "80", 4).await;

    let order = app
        .place_order(&customer, &[(kite, 2), (yoyo, 1)], "cod")
        .await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let kite_item = order["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["sku"] == "KI-1")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(app.stock_of(kite).await, 2);

    let (status, body) = app
        .call(
            &customer,
            Method::POST,
            &format!("/api/v1/orders/{order_id}/items/{kite_item}/cancel"),
            Some(json!({ "reason": "changed_mind" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let cancelled = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["id"] == kite_item.as_str())
        .unwrap()
        .clone();
    assert_eq!(cancelled["item_status"], "cancelled");
    assert_eq!(cancelled["cancel_reason"], "changed_mind");
    // The other line keeps the order open
    assert_eq!(body["data"]["status"], "processing");
    assert_eq!(app.stock_of(kite).await, 4);

    // Cancelling twice is refused
    let (status, _) = app
        .call(
            &customer,
            Method::POST,
            &format!("/api/v1/orders/{order_id}/items/{kite_item}/cancel"),
            Some(json!({ "reason": "changed_mind" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stock_of(kite).await, 4);
}

#[tokio::test]
async fn delivered_items_cannot_be_cancelled_and_actions_say_so() {
    let app = TestApp::new().await;
    let vendor = app.vendor();
    let customer = app.customer();
    let category = app.create_category("Audio").await;
    let speaker = app.create_product(&vendor, category, "SP-1", "1500", 3).await;

    let order = app.place_order(&customer, &[(speaker, 1)], "cod").await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let item_id = first_item_id(&order);

    let transitions = format!("/api/v1/orders/{order_id}/items/{item_id}/transitions");
    let (_, body) = app.call(&customer, Method::GET, &transitions, None).await;
    assert_eq!(body["data"]["can_cancel"], true);
    assert_eq!(body["data"]["next"], json!([]));

    let (_, body) = app.call(&vendor, Method::GET, &transitions, None).await;
    assert_eq!(body["data"]["next"], json!(["shipped"]));

    app.deliver(&vendor, &order_id, &item_id).await;

    let (_, body) = app.call(&customer, Method::GET, &transitions, None).await;
    assert_eq!(body["data"]["current"], "delivered");
    assert_eq!(body["data"]["can_cancel"], false);
    assert_eq!(body["data"]["can_request_return"], true);

    let (status, _) = app
        .call(
            &customer,
            Method::POST,
            &format!("/api/v1/orders/{order_id}/items/{item_id}/cancel"),
            Some(json!({ "reason": "delivery_too_slow" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unpaid_online_order_cannot_ship_until_payment_is_verified() {
    let app = TestApp::new().await;
    let vendor = app.vendor();
    let customer = app.customer();
    let category = app.create_category("Phones").await;
    let phone = app.create_product(&vendor, category, "PH-1", "8000", 2).await;

    let order = app.place_order(&customer, &[(phone, 1)], "online").await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let item_id = first_item_id(&order);
    let gateway_order_id = order["gateway_order_id"].as_str().unwrap().to_string();
    let transitions = format!("/api/v1/orders/{order_id}/items/{item_id}/transitions");

    let (_, body) = app.call(&vendor, Method::GET, &transitions, None).await;
    assert_eq!(body["data"]["current"], "processing");
    assert_eq!(body["data"]["next"], json!([]));
    let (_, body) = app.call(&app.admin, Method::GET, &transitions, None).await;
    assert_eq!(body["data"]["next"], json!([]));

    let (status, _) = app
        .set_item_status(&vendor, &order_id, &item_id, "shipped")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let signature = app.gateway_signature(&gateway_order_id, "pay_001");
    let (status, body) = app
        .call(
            &customer,
            Method::POST,
            &format!("/api/v1/orders/{order_id}/payment/verify"),
            Some(json!({
                "gateway_order_id": gateway_order_id,
                "gateway_payment_id": "pay_001",
                "signature": signature,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["payment_status"], "paid");

    let (_, body) = app.call(&vendor, Method::GET, &transitions, None).await;
    assert_eq!(body["data"]["next"], json!(["shipped"]));

    let (status, body) = app
        .set_item_status(&vendor, &order_id, &item_id, "shipped")
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn cod_lines_cancelled_before_delivery_are_never_collected() {
    let app = TestApp::new().await;
    let vendor = app.vendor();
    let customer = app.customer();
    let category = app.create_category("Lighting").await;
    let lamp = app.create_product(&vendor, category, "LM-1", "600", 2).await;
    let bulb = app.create_product(&vendor, category, "BL-1", "400", 2).await;

    let order = app
        .place_order(&customer, &[(lamp, 1), (bulb, 1)], "cod")
        .await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let lamp_item = item_id_for(&order, "LM-1");
    let bulb_item = item_id_for(&order, "BL-1");

    let (status, body) = app
        .call(
            &customer,
            Method::POST,
            &format!("/api/v1/orders/{order_id}/items/{bulb_item}/cancel"),
            Some(json!({ "reason": "changed_mind" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["payment_status"], "pending");

    app.deliver(&vendor, &order_id, &lamp_item).await;
    let (_, body) = app
        .call(&customer, Method::GET, &format!("/api/v1/orders/{order_id}"), None)
        .await;
    assert_eq!(body["data"]["status"], "delivered");
    assert_eq!(body["data"]["payment_status"], "partially_refunded");
    assert_eq!(money(&body["data"]["refunded_amount"]), dec!(400));

    let lamp_uri = format!("/api/v1/orders/{order_id}/items/{lamp_item}");
    let (status, body) = app
        .call(
            &customer,
            Method::POST,
            &format!("{lamp_uri}/return"),
            Some(json!({ "reason": "Flickers" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, body) = app
        .call(&vendor, Method::POST, &format!("{lamp_uri}/return/approve"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["payment_status"], "refunded");
    assert_eq!(money(&body["data"]["refunded_amount"]), dec!(1000));
}

#[tokio::test]
async fn paid_cancellation_refunds_the_line() {
    let app = TestApp::new().await;
    let vendor = app.vendor();
    let customer = app.customer();
    let category = app.create_category("Shoes").await;
    let shoe = app.create_product(&vendor, category, "SH-1", "2000", 2).await;

    let order = app.place_order(&customer, &[(shoe, 1)], "online").await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let item_id = first_item_id(&order);
    let gateway_order_id = order["gateway_order_id"].as_str().unwrap().to_string();
    let signature = app.gateway_signature(&gateway_order_id, "pay_xyz");
    let (status, _) = app
        .call(
            &customer,
            Method::POST,
            &format!("/api/v1/orders/{order_id}/payment/verify"),
            Some(json!({
                "gateway_order_id": gateway_order_id,
                "gateway_payment_id": "pay_xyz",
                "signature": signature,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(
            &customer,
            Method::POST,
            &format!("/api/v1/orders/{order_id}/items/{item_id}/cancel"),
            Some(json!({ "reason": "found_better_price" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["data"]["payment_status"], "refunded");
    assert_eq!(money(&body["data"]["refunded_amount"]), dec!(2000));
}

#[tokio::test]
async fn orders_are_scoped_to_the_caller() {
    let app = TestApp::new().await;
    let vendor_a = app.vendor();
    let vendor_b = app.vendor();
    let customer = app.customer();
    let stranger = app.customer();
    let category = app.create_category("Stationery").await;
    let pen = app.create_product(&vendor_a, category, "PN-1", "40", 10).await;
    let pad = app.create_product(&vendor_b, category, "PD-1", "60", 10).await;

    let order = app
        .place_order(&customer, &[(pen, 1), (pad, 1)], "cod")
        .await;
    let uri = format!("/api/v1/orders/{}", order["id"].as_str().unwrap());

    let (status, body) = app.call(&customer, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);

    let (status, body) = app.call(&vendor_a, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["sku"], "PN-1");

    let (status, _) = app.call(&stranger, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call(&stranger, Method::GET, "/api/v1/orders", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 0);

    let (_, body) = app
        .call(&vendor_b, Method::GET, "/api/v1/orders?status=processing", None)
        .await;
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn requests_without_a_valid_token_are_unauthorized() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/orders", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/v1/orders", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
