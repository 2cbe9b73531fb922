use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use courier_hub::api::rest::router;
use courier_hub::config::Config;
use courier_hub::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "dev-admin-token";
const VALID_NIP: &str = "5260250274";
const VALID_PESEL: &str = "44051401359";
const VALID_IBAN: &str = "PL61109010140000071219812874";

fn setup() -> axum::Router {
    router(Arc::new(AppState::new(&Config::default())))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn admin_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-admin-token", ADMIN_TOKEN)
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

fn restaurant_payload() -> Value {
    json!({
        "business_name": "Pod Złotym Lwem",
        "nip": VALID_NIP,
        "address": "Marszałkowska 1, Warszawa",
        "location": { "lat": 52.2297, "lng": 21.0122 },
        "contact_person": "Jan Kowalski",
        "iban": VALID_IBAN
    })
}

fn driver_payload() -> Value {
    json!({
        "name": "Adam Nowak",
        "pesel": VALID_PESEL,
        "vehicle_type": "scooter",
        "vehicle_plate": "WA 12345",
        "iban": VALID_IBAN
    })
}

fn request_payload() -> Value {
    json!({
        "delivery_address": "Puławska 10, Warszawa",
        "delivery": { "lat": 52.2000, "lng": 21.0250 },
        "order_reference": "ZAM-1001"
    })
}

/// Onboard a restaurant and approve it; returns its id.
async fn verified_restaurant(app: &axum::Router) -> String {
    let res = app
        .clone()
        .oneshot(json_request("POST", "/restaurants", restaurant_payload()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(admin_request(
            "POST",
            &format!("/admin/restaurants/{id}/verify"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    id
}

/// Onboard a driver, approve it, and mark it available; returns its id.
async fn available_driver(app: &axum::Router) -> String {
    let res = app
        .clone()
        .oneshot(json_request("POST", "/drivers", driver_payload()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(admin_request(
            "POST",
            &format!("/admin/drivers/{id}/verify"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/drivers/{id}/availability"),
            json!({ "is_available": true }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    id
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["restaurants"], 0);
    assert_eq!(body["drivers"], 0);
    assert_eq!(body["requests"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
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
    assert!(body.contains("pending_requests"));
}

#[tokio::test]
async fn restaurant_onboarding_starts_pending() {
    let app = setup();
    let response = app
        .oneshot(json_request("POST", "/restaurants", restaurant_payload()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "PendingVerification");
    assert_eq!(body["is_high_volume"], false);
    assert_eq!(body["monthly_delivery_count"], 0);
}

#[tokio::test]
async fn restaurant_with_invalid_nip_is_rejected() {
    let app = setup();
    let mut payload = restaurant_payload();
    payload["nip"] = json!("5260250275");

    let response = app
        .oneshot(json_request("POST", "/restaurants", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn driver_with_invalid_pesel_is_rejected() {
    let app = setup();
    let mut payload = driver_payload();
    payload["pesel"] = json!("44051401358");

    let response = app
        .oneshot(json_request("POST", "/drivers", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn driver_with_invalid_iban_is_rejected() {
    let app = setup();
    let mut payload = driver_payload();
    payload["iban"] = json!("DE61109010140000071219812874");

    let response = app
        .oneshot(json_request("POST", "/drivers", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_routes_require_token() {
    let app = setup();

    let res = app
        .clone()
        .oneshot(json_request("POST", "/restaurants", restaurant_payload()))
        .await
        .unwrap();
    let id = body_json(res).await["id"].as_str().unwrap().to_string();

    // No token at all.
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/admin/restaurants/{id}/verify"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Wrong token.
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/admin/restaurants/{id}/verify"))
                .header("content-type", "application/json")
                .header("x-admin-token", "not-the-token")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_verifies_restaurant() {
    let app = setup();
    let id = verified_restaurant(&app).await;

    let res = app
        .oneshot(get_request(&format!("/restaurants/{id}")))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["status"], "Verified");
}

#[tokio::test]
async fn rejected_driver_stays_rejected_and_cannot_go_available() {
    let app = setup();

    let res = app
        .clone()
        .oneshot(json_request("POST", "/drivers", driver_payload()))
        .await
        .unwrap();
    let id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(admin_request(
            "POST",
            &format!("/admin/drivers/{id}/reject"),
            json!({ "reason": "illegible documents" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "Rejected");
    assert_eq!(body["rejection_reason"], "illegible documents");

    // Rejection is terminal; a later approval attempt conflicts.
    let res = app
        .clone()
        .oneshot(admin_request(
            "POST",
            &format!("/admin/drivers/{id}/verify"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/drivers/{id}/availability"),
            json!({ "is_available": true }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unverified_restaurant_cannot_create_request() {
    let app = setup();

    let res = app
        .clone()
        .oneshot(json_request("POST", "/restaurants", restaurant_payload()))
        .await
        .unwrap();
    let id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/restaurants/{id}/requests"),
            request_payload(),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

// Quoting runs the same verified-and-geocoded gate as request creation.
#[tokio::test]
async fn unverified_restaurant_cannot_quote() {
    let app = setup();

    let res = app
        .clone()
        .oneshot(json_request("POST", "/restaurants", restaurant_payload()))
        .await
        .unwrap();
    let id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/restaurants/{id}/quote"),
            json!({ "delivery": { "lat": 52.2000, "lng": 21.0250 } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn created_request_holds_cost_invariants() {
    let app = setup();
    let restaurant_id = verified_restaurant(&app).await;

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/restaurants/{restaurant_id}/requests"),
            request_payload(),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["status"], "Pending");
    assert!(body["driver_id"].is_null());
    assert!(body["distance_km"].as_f64().unwrap() > 0.0);

    let fee = body["delivery_fee"].as_f64().unwrap();
    let restaurant_commission = body["restaurant_commission"].as_f64().unwrap();
    let driver_commission = body["driver_commission"].as_f64().unwrap();
    let platform_commission = body["platform_commission"].as_f64().unwrap();
    let total = body["total_cost"].as_f64().unwrap();

    assert!((platform_commission - (restaurant_commission + driver_commission)).abs() < 1e-9);
    assert!((total - (fee + platform_commission)).abs() < 1e-9);
    // v2 standard tier for both parties.
    assert_eq!(restaurant_commission, 2.0);
    assert_eq!(driver_commission, 2.0);
}

#[tokio::test]
async fn quote_reflects_high_volume_tier() {
    let app = setup();
    let restaurant_id = verified_restaurant(&app).await;

    let res = app
        .clone()
        .oneshot(admin_request(
            "PATCH",
            &format!("/admin/restaurants/{restaurant_id}/commission"),
            json!({ "is_high_volume": true }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/restaurants/{restaurant_id}/quote"),
            json!({ "delivery": { "lat": 52.2000, "lng": 21.0250 } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["restaurant_commission"], 1.5);
    assert_eq!(body["driver_commission"], 2.0);
    assert_eq!(body["platform_commission"], 3.5);
}

#[tokio::test]
async fn full_delivery_flow() {
    let app = setup();
    let restaurant_id = verified_restaurant(&app).await;
    let driver_id = available_driver(&app).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/restaurants/{restaurant_id}/requests"),
            request_payload(),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let request_id = body_json(res).await["id"].as_str().unwrap().to_string();

    // Visible on the driver board.
    let res = app
        .clone()
        .oneshot(get_request("/requests/pending"))
        .await
        .unwrap();
    let pending = body_json(res).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/requests/{request_id}/accept"),
            json!({ "driver_id": driver_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "Accepted");
    assert_eq!(body["driver_id"], driver_id.as_str());
    assert!(!body["accepted_at"].is_null());

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/requests/{request_id}/pickup"),
            json!({ "driver_id": driver_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/requests/{request_id}/deliver"),
            json!({ "driver_id": driver_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "Delivered");
    assert!(!body["delivered_at"].is_null());

    // The delivery counts toward the driver's monthly total.
    let res = app
        .oneshot(get_request(&format!("/drivers/{driver_id}")))
        .await
        .unwrap();
    let driver = body_json(res).await;
    assert_eq!(driver["monthly_delivery_count"], 1);
    assert!(driver["active_request"].is_null());
}

#[tokio::test]
async fn losing_accept_gets_conflict() {
    let app = setup();
    let restaurant_id = verified_restaurant(&app).await;
    let first_driver = available_driver(&app).await;
    let second_driver = available_driver(&app).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/restaurants/{restaurant_id}/requests"),
            request_payload(),
        ))
        .await
        .unwrap();
    let request_id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/requests/{request_id}/accept"),
            json!({ "driver_id": first_driver }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/requests/{request_id}/accept"),
            json!({ "driver_id": second_driver }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .oneshot(get_request(&format!("/requests/{request_id}")))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["status"], "Accepted");
    assert_eq!(body["driver_id"], first_driver.as_str());
}

#[tokio::test]
async fn out_of_order_transitions_are_rejected() {
    let app = setup();
    let restaurant_id = verified_restaurant(&app).await;
    let driver_id = available_driver(&app).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/restaurants/{restaurant_id}/requests"),
            request_payload(),
        ))
        .await
        .unwrap();
    let request_id = body_json(res).await["id"].as_str().unwrap().to_string();

    // Pickup before acceptance.
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/requests/{request_id}/pickup"),
            json!({ "driver_id": driver_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Delivery straight from accepted.
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/requests/{request_id}/accept"),
            json!({ "driver_id": driver_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/requests/{request_id}/deliver"),
            json!({ "driver_id": driver_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn restaurant_cancels_own_request_only() {
    let app = setup();
    let owner = verified_restaurant(&app).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/restaurants/{owner}/requests"),
            request_payload(),
        ))
        .await
        .unwrap();
    let request_id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/requests/{request_id}/cancel"),
            json!({ "cancelled_by": "restaurant", "restaurant_id": uuid::Uuid::new_v4() }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/requests/{request_id}/cancel"),
            json!({ "cancelled_by": "restaurant", "restaurant_id": owner }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "Cancelled");
    assert!(!body["cancelled_at"].is_null());
}

#[tokio::test]
async fn admin_cancel_requires_token() {
    let app = setup();
    let restaurant_id = verified_restaurant(&app).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/restaurants/{restaurant_id}/requests"),
            request_payload(),
        ))
        .await
        .unwrap();
    let request_id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/requests/{request_id}/cancel"),
            json!({ "cancelled_by": "admin" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .oneshot(admin_request(
            "POST",
            &format!("/requests/{request_id}/cancel"),
            json!({ "cancelled_by": "admin" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn geocode_without_provider_key_is_500() {
    let app = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/geocode",
            json!({ "address": "Marszałkowska 1, Warszawa" }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn geocode_requires_address() {
    let app = setup();
    let res = app
        .oneshot(json_request("POST", "/geocode", json!({ "address": "  " })))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn calculate_distance_requires_both_coordinates() {
    let app = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/calculate-distance",
            json!({ "start": { "lat": 52.2297, "lng": 21.0122 } }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn calculate_distance_fallback_is_deterministic() {
    let app = setup();
    let payload = json!({
        "start": { "lat": 52.2297, "lng": 21.0122 },
        "end": { "lat": 50.0647, "lng": 19.9450 }
    });

    let res = app
        .clone()
        .oneshot(json_request("POST", "/calculate-distance", payload.clone()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let first = body_json(res).await;

    let res = app
        .oneshot(json_request("POST", "/calculate-distance", payload))
        .await
        .unwrap();
    let second = body_json(res).await;

    assert_eq!(first["distanceKm"], second["distanceKm"]);
    assert_eq!(first["duration"], second["duration"]);
    assert!(first["distanceKm"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn admin_lists_pending_verifications_with_documents() {
    let app = setup();

    let res = app
        .clone()
        .oneshot(json_request("POST", "/drivers", driver_payload()))
        .await
        .unwrap();
    let driver_id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/drivers/{driver_id}/documents"),
            json!({ "document_type": "IdCard", "file_url": "https://files.example/id-card.jpg" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(admin_request("GET", "/admin/verifications", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    let drivers = body["drivers"].as_array().unwrap();
    assert_eq!(drivers.len(), 1);
    assert_eq!(drivers[0]["driver"]["id"], driver_id.as_str());
    assert_eq!(drivers[0]["documents"].as_array().unwrap().len(), 1);
    assert_eq!(drivers[0]["documents"][0]["document_type"], "IdCard");
}
