use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use delivery_dispatch::api::rest::router;
use delivery_dispatch::config::Config;
use delivery_dispatch::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

fn setup() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(Config::default()));
    (router(state.clone()), state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn register_on_shift(app: &axum::Router, store_id: Uuid, name: &str) -> String {
    let (status, driver) = send(
        app,
        json_request(
            "POST",
            &format!("/stores/{store_id}/drivers"),
            json!({ "name": name, "phone": "+55 11 90000-0000" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let driver_id = driver["id"].as_str().unwrap().to_string();

    let (status, toggle) = send(
        app,
        json_request(
            "POST",
            &format!("/stores/{store_id}/drivers/{driver_id}/shift"),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggle["online"], true);

    driver_id
}

async fn create_delivery(app: &axum::Router, store_id: Uuid, order_id: Uuid) -> Value {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            &format!("/stores/{store_id}/deliveries"),
            json!({
                "order_id": order_id,
                "order_code": "A-1042",
                "customer_name": "Maria",
                "address": "Rua Augusta 1500",
                "delivery_fee": "7.50"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

fn token_from(delivery: &Value) -> String {
    let url = delivery["links"]["confirm_url"].as_str().unwrap();
    url.split("token=").nth(1).unwrap().to_string()
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state) = setup();
    let (status, body) = send(&app, get_request("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["drivers"], 0);
    assert_eq!(body["drivers_on_shift"], 0);
    assert_eq!(body["deliveries"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("drivers_on_shift"));
}

#[tokio::test]
async fn settings_default_then_patch() {
    let (app, _state) = setup();
    let store_id = Uuid::new_v4();
    let uri = format!("/stores/{store_id}/delivery-settings");

    let (status, body) = send(&app, get_request(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["require_proof_photo"], false);
    assert_eq!(body["delivery_mode"], "internal_fleet");

    let (status, body) = send(
        &app,
        json_request("PATCH", &uri, json!({ "require_proof_photo": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["require_proof_photo"], true);

    let (_, body) = send(&app, get_request(&uri)).await;
    assert_eq!(body["require_proof_photo"], true);
}

#[tokio::test]
async fn create_driver_empty_name_returns_400() {
    let (app, _state) = setup();
    let store_id = Uuid::new_v4();
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/stores/{store_id}/drivers"),
            json!({ "name": "  ", "phone": "123" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn shift_toggle_opens_and_closes() {
    let (app, _state) = setup();
    let store_id = Uuid::new_v4();
    let driver_id = register_on_shift(&app, store_id, "João").await;

    let (_, available) = send(
        &app,
        get_request(&format!("/stores/{store_id}/available-drivers")),
    )
    .await;
    assert_eq!(available.as_array().unwrap().len(), 1);
    assert_eq!(available[0]["driver_id"], driver_id);

    let (status, toggle) = send(
        &app,
        json_request(
            "POST",
            &format!("/stores/{store_id}/drivers/{driver_id}/shift"),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggle["online"], false);
    assert_eq!(toggle["shift"]["status"], "completed");

    let (_, shifts) = send(
        &app,
        get_request(&format!("/stores/{store_id}/drivers/{driver_id}/shifts")),
    )
    .await;
    assert_eq!(shifts.as_array().unwrap().len(), 1);

    let (_, available) = send(
        &app,
        get_request(&format!("/stores/{store_id}/available-drivers")),
    )
    .await;
    assert!(available.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn auto_assign_without_couriers_returns_503() {
    let (app, _state) = setup();
    let store_id = Uuid::new_v4();
    let order_id = Uuid::new_v4();
    create_delivery(&app, store_id, order_id).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/stores/{store_id}/orders/{order_id}/auto-assign"),
            json!({}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "no_courier_available");
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn second_delivery_for_same_order_returns_409() {
    let (app, _state) = setup();
    let store_id = Uuid::new_v4();
    let order_id = Uuid::new_v4();
    create_delivery(&app, store_id, order_id).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/stores/{store_id}/deliveries"),
            json!({
                "order_id": order_id,
                "order_code": "A-1042",
                "customer_name": "Maria",
                "address": "Rua Augusta 1500"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn full_delivery_flow() {
    let (app, state) = setup();
    let store_id = Uuid::new_v4();
    let order_id = Uuid::new_v4();
    let driver_id = register_on_shift(&app, store_id, "Dispatch Dan").await;

    let created = create_delivery(&app, store_id, order_id).await;
    assert_eq!(created["status"], "pending");
    assert!(created.get("access_token").is_none());
    let delivery_id = created["id"].as_str().unwrap().to_string();
    let token = token_from(&created);

    let (status, assigned) = send(
        &app,
        json_request(
            "POST",
            &format!("/stores/{store_id}/orders/{order_id}/auto-assign"),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assigned["driver_id"], driver_id);
    assert_eq!(assigned["delivery"]["status"], "assigned");

    for next in ["picked_up", "in_transit"] {
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                &format!("/stores/{store_id}/deliveries/{delivery_id}/advance"),
                json!({ "status": next }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], next);
    }

    let (status, completion) = send(
        &app,
        json_request(
            "POST",
            &format!("/stores/{store_id}/orders/{order_id}/complete"),
            json!({ "photo_url": "https://cdn.example.com/proof/1.jpg" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completion["replayed"], false);
    assert_eq!(completion["delivery"]["status"], "delivered");
    assert_eq!(
        state.orders.get(&order_id).unwrap().status,
        delivery_dispatch::models::order::OrderStatus::Delivered
    );

    let public = format!("/public/stores/{store_id}/deliveries/{delivery_id}");

    let (status, validation) = send(&app, get_request(&format!("{public}?token={token}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(validation["valid"], true);
    assert_eq!(validation["delivery"]["status"], "delivered");
    assert_eq!(validation["delivery"]["order"]["order_code"], "A-1042");
    assert!(validation["delivery"].get("driver_phone").is_none());

    let (status, confirmed) = send(
        &app,
        json_request("POST", &format!("{public}/confirm"), json!({ "token": token })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["success"], true);

    let (status, rated) = send(
        &app,
        json_request(
            "POST",
            &format!("{public}/rating"),
            json!({ "token": token, "rating": 5, "comment": "fast" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rated["driver_rating"], 5);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("{public}/rating"),
            json!({ "token": token, "rating": 1 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, history) = send(
        &app,
        get_request(&format!("/stores/{store_id}/drivers/{driver_id}/deliveries")),
    )
    .await;
    assert_eq!(history["summary"]["delivered_total"], 1);
    assert_eq!(history["summary"]["rating"], 5.0);
    assert_eq!(history["summary"]["earnings_total"], "0.75");
}

#[tokio::test]
async fn invalid_links_are_indistinguishable() {
    let (app, _state) = setup();
    let store_id = Uuid::new_v4();
    let order_id = Uuid::new_v4();
    let created = create_delivery(&app, store_id, order_id).await;
    let delivery_id = created["id"].as_str().unwrap().to_string();
    let token = token_from(&created);
    let other_store = Uuid::new_v4();

    let uris = [
        format!("/public/stores/{store_id}/deliveries/{delivery_id}?token=wrong"),
        format!("/public/stores/{other_store}/deliveries/{delivery_id}?token={token}"),
        format!("/public/stores/{store_id}/deliveries/{}?token={token}", Uuid::new_v4()),
        format!("/public/stores/{store_id}/deliveries/not-a-uuid?token={token}"),
        format!("/public/stores/{store_id}/deliveries/{delivery_id}"),
    ];

    let mut bodies = Vec::new();
    for uri in &uris {
        let (status, body) = send(&app, get_request(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        bodies.push(body);
    }

    assert!(bodies.iter().all(|body| body == &bodies[0]));
    assert_eq!(bodies[0]["kind"], "invalid_link");
}

#[tokio::test]
async fn completion_without_photo_is_rejected_when_required() {
    let (app, state) = setup();
    let store_id = Uuid::new_v4();
    let order_id = Uuid::new_v4();
    register_on_shift(&app, store_id, "Ana").await;

    send(
        &app,
        json_request(
            "PATCH",
            &format!("/stores/{store_id}/delivery-settings"),
            json!({ "require_proof_photo": true }),
        ),
    )
    .await;

    let created = create_delivery(&app, store_id, order_id).await;
    let delivery_id = created["id"].as_str().unwrap().to_string();
    send(
        &app,
        json_request(
            "POST",
            &format!("/stores/{store_id}/orders/{order_id}/auto-assign"),
            json!({}),
        ),
    )
    .await;
    for next in ["picked_up", "in_transit"] {
        send(
            &app,
            json_request(
                "POST",
                &format!("/stores/{store_id}/deliveries/{delivery_id}/advance"),
                json!({ "status": next }),
            ),
        )
        .await;
    }

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/stores/{store_id}/orders/{order_id}/complete"),
            json!({ "photo_url": "   " }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (_, delivery) = send(
        &app,
        get_request(&format!("/stores/{store_id}/deliveries/{delivery_id}")),
    )
    .await;
    assert_eq!(delivery["status"], "in_transit");
    assert!(delivery["proof_photo_url"].is_null());
    assert_eq!(
        state.orders.get(&order_id).unwrap().status,
        delivery_dispatch::models::order::OrderStatus::Open
    );
}

#[tokio::test]
async fn auto_assign_on_creation_when_enabled() {
    let (app, _state) = setup();
    let store_id = Uuid::new_v4();
    let driver_id = register_on_shift(&app, store_id, "Bia").await;

    send(
        &app,
        json_request(
            "PATCH",
            &format!("/stores/{store_id}/delivery-settings"),
            json!({ "auto_assign_orders": true }),
        ),
    )
    .await;

    let created = create_delivery(&app, store_id, Uuid::new_v4()).await;
    assert_eq!(created["status"], "assigned");
    assert_eq!(created["driver_id"], driver_id);
    assert!(created["auto_assign_error"].is_null());
}

#[tokio::test]
async fn fee_quote_uses_store_settings() {
    let (app, _state) = setup();
    let store_id = Uuid::new_v4();

    let (status, quote) = send(
        &app,
        json_request(
            "POST",
            &format!("/stores/{store_id}/delivery-fee/quote"),
            json!({ "distance_km": 3.0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["fee"], "5.00");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/stores/{store_id}/delivery-fee/quote"),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fee_quote_overflow_returns_400() {
    let (app, _state) = setup();
    let store_id = Uuid::new_v4();

    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/stores/{store_id}/delivery-settings"),
            json!({
                "fee_model": "distance_based",
                "price_per_km": "79228162514264337593543950335",
                "max_fee": "0"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/stores/{store_id}/delivery-fee/quote"),
            json!({ "distance_km": 2.0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn rating_without_value_checks_link_first() {
    let (app, _state) = setup();
    let store_id = Uuid::new_v4();
    let created = create_delivery(&app, store_id, Uuid::new_v4()).await;
    let delivery_id = created["id"].as_str().unwrap().to_string();
    let token = token_from(&created);
    let uri = format!("/public/stores/{store_id}/deliveries/{delivery_id}/rating");

    let (status, body) = send(&app, json_request("POST", &uri, json!({ "token": "wrong" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "invalid_link");

    let (status, body) = send(&app, json_request("POST", &uri, json!({ "token": token }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}
