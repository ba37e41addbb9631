//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use booking_api::config::{CollaboratorMode, Config};
use booking_api::routes::bookings::AppState;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup_with_state() -> (axum::Router, Arc<AppState>) {
    let state = booking_api::create_default_state(get_metrics_handle()).unwrap();
    let app = booking_api::create_app(state.clone());
    (app, state)
}

fn start_request(seat: &str, amount: f64) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/bookings/start")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_string(&json!({
                "passenger_name": "John Doe",
                "flight_number": "FL001",
                "seat_number": seat,
                "payment_details": {
                    "amount": amount,
                    "currency": "USD",
                    "payment_method_type": "credit_card",
                    "payment_metadata": { "card_last4": "4242" }
                }
            }))
            .unwrap(),
        ))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn cancel_request(id: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/bookings/{id}/cancel"))
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

/// Starts a booking and waits for its forward pipeline to settle.
async fn book(app: &axum::Router, state: &AppState, seat: &str, amount: f64) -> String {
    let (status, json) = send(app, start_request(seat, amount)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    state.orchestrator.shutdown().await;
    json["booking_id"].as_str().unwrap().to_string()
}

fn operations(booking: &Value) -> Vec<String> {
    booking["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["operation"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup_with_state();

    let (status, json) = send(&app, get_request("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["steps"], json!(["seat", "payment", "allocation"]));
}

#[tokio::test]
async fn test_metrics_endpoint_is_prometheus_text() {
    let (app, state) = setup_with_state();
    book(&app, &state, "2A", 120.0).await;

    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_start_booking_returns_pending_immediately() {
    let (app, state) = setup_with_state();

    let (status, json) = send(&app, start_request("1A", 150.0)).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["status"], "PENDING");
    assert_eq!(json["message"], "Booking process started");
    assert!(json["booking_id"].as_str().is_some());
    state.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_booking_completes_with_boarding_pass() {
    let (app, state) = setup_with_state();
    let id = book(&app, &state, "1A", 150.0).await;

    let (status, booking) = send(&app, get_request(&format!("/api/bookings/{id}"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["status"], "COMPLETED");
    assert_eq!(
        operations(&booking),
        vec!["block_seat", "process_payment", "allocate_seat"]
    );
    assert_eq!(booking["boarding_pass"]["gate"], "B12");
    assert_eq!(booking["boarding_pass"]["passenger"], "John Doe");
}

#[tokio::test]
async fn test_payment_over_limit_fails_and_releases_seat() {
    let (app, state) = setup_with_state();
    let id = book(&app, &state, "2B", 5000.0).await;

    let (_, booking) = send(&app, get_request(&format!("/api/bookings/{id}"))).await;

    assert_eq!(booking["status"], "FAILED");
    assert_eq!(
        operations(&booking),
        vec!["block_seat", "process_payment", "release_seat"]
    );
    assert_eq!(booking["steps"][1]["status"], "FAILED");
    assert_eq!(booking["steps"][2]["status"], "RELEASED");
}

#[tokio::test]
async fn test_start_booking_validation() {
    let (app, _) = setup_with_state();

    let request = Request::builder()
        .method("POST")
        .uri("/api/bookings/start")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "passenger_name": "",
                "flight_number": "FL001",
                "seat_number": "1A",
                "payment_details": {
                    "amount": 10.0,
                    "currency": "USD",
                    "payment_method_type": "paypal"
                }
            })
            .to_string(),
        ))
        .unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "passenger_name must not be empty");

    let (status, _) = send(&app, start_request("1A", -5.0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_bookings() {
    let (app, state) = setup_with_state();
    let first = book(&app, &state, "1A", 100.0).await;
    let second = book(&app, &state, "2A", 100.0).await;

    let (status, json) = send(&app, get_request("/api/bookings")).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["booking_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first.as_str()));
    assert!(ids.contains(&second.as_str()));
}

#[tokio::test]
async fn test_get_nonexistent_booking() {
    let (app, _) = setup_with_state();
    let id = "00000000-0000-4000-8000-000000000000";

    let (status, json) = send(&app, get_request(&format!("/api/bookings/{id}"))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], format!("Booking {id} not found"));
}

#[tokio::test]
async fn test_invalid_booking_id_format() {
    let (app, _) = setup_with_state();

    let (status, json) = send(&app, get_request("/api/bookings/not-a-uuid")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().starts_with("Invalid ID format"));
}

#[tokio::test]
async fn test_cancel_completed_booking() {
    let (app, state) = setup_with_state();
    let id = book(&app, &state, "2C", 80.0).await;

    let (status, json) = send(&app, cancel_request(&id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "CANCELLED");
    assert_eq!(json["message"], "Booking cancellation started");
    assert_eq!(json["compensation_steps"], json!([]));

    state.orchestrator.shutdown().await;
    let (_, booking) = send(&app, get_request(&format!("/api/bookings/{id}"))).await;
    assert_eq!(booking["status"], "CANCELLED");
    assert_eq!(
        operations(&booking),
        vec![
            "block_seat",
            "process_payment",
            "allocate_seat",
            "cancel_allocation",
            "refund_payment",
            "release_seat",
        ]
    );
}

#[tokio::test]
async fn test_cancel_twice_reports_already_cancelled() {
    let (app, state) = setup_with_state();
    let id = book(&app, &state, "1A", 80.0).await;
    send(&app, cancel_request(&id)).await;
    state.orchestrator.shutdown().await;

    let (status, json) = send(&app, cancel_request(&id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Booking already cancelled");
    assert_eq!(json["compensation_steps"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_cancel_failed_booking_conflicts() {
    let (app, state) = setup_with_state();
    let id = book(&app, &state, "1A", 5000.0).await;

    let (status, _) = send(&app, cancel_request(&id)).await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_nonexistent_booking() {
    let (app, _) = setup_with_state();

    let (status, _) = send(
        &app,
        cancel_request("00000000-0000-4000-8000-000000000000"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_state_from_config_rejects_unknown_step() {
    let config = Config {
        collaborators: CollaboratorMode::InMemory,
        steps: vec!["seat".to_string(), "hotel".to_string()],
        ..Config::default()
    };

    let err = booking_api::create_state(&config, get_metrics_handle())
        .err()
        .unwrap();

    assert_eq!(err.to_string(), "Command 'hotel' is not supported");
}

#[tokio::test]
async fn test_state_from_config_with_custom_steps() {
    let config = Config {
        collaborators: CollaboratorMode::InMemory,
        steps: vec!["seat".to_string(), "payment".to_string()],
        ..Config::default()
    };
    let state = booking_api::create_state(&config, get_metrics_handle()).unwrap();
    let app = booking_api::create_app(state.clone());

    let id = book(&app, &state, "1A", 90.0).await;
    let (_, booking) = send(&app, get_request(&format!("/api/bookings/{id}"))).await;

    assert_eq!(booking["status"], "COMPLETED");
    assert_eq!(operations(&booking), vec!["block_seat", "process_payment"]);
    assert_eq!(booking["boarding_pass"], Value::Null);
}
