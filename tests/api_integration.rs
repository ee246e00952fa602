//! HTTP surface tests: the full router over the in-memory store, driven
//! request by request with `oneshot`.

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use household_utilities::{api, config::Config, repo::MemoryStore, service::AppState};

const ADMIN: &str = "integration-admin-token";

fn app() -> Router {
    let cfg = Config::for_memory(ADMIN);
    let state = AppState::with_store(cfg.clone(), Arc::new(MemoryStore::new()));
    api::router(state, &cfg)
}

enum Caller {
    Anonymous,
    Resident(i64),
    Admin,
}

async fn send(app: &Router, method: Method, uri: &str, caller: Caller, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    match caller {
        Caller::Anonymous => {}
        Caller::Resident(id) => req = req.header("X-Resident-Id", id.to_string()),
        Caller::Admin => req = req.header("Authorization", format!("Bearer {ADMIN}")),
    }
    let req = match body {
        Some(b) => req
            .header("content-type", "application/json")
            .body(Body::from(b.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Registers and activates a resident, returning its id
async fn active_resident(app: &Router, email: &str, phone: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/residents",
        Caller::Anonymous,
        Some(json!({
            "name": "Joana",
            "email": email,
            "phone": phone,
            "address": null,
            "postal_code": null,
            "city": "Porto"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["active"], false);
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        app,
        Method::POST,
        &format!("/api/v1/admin/residents/{id}/toggle"),
        Caller::Admin,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active"], true);
    id
}

async fn add_device(app: &Router, resident: i64, utility: &str, category: &str, unit: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/v1/devices",
        Caller::Resident(resident),
        Some(json!({"name": "meter", "utility": utility, "category": category, "unit": unit})),
    )
    .await
}

#[tokio::test]
async fn test_healthz() {
    let app = app();
    let (status, _) = send(&app, Method::GET, "/healthz", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, Method::GET, "/readyz", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"]["status"], "healthy");
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/v1/devices", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_inactive_resident_forbidden() {
    let app = app();
    let (_, body) = send(
        &app,
        Method::POST,
        "/api/v1/residents",
        Caller::Anonymous,
        Some(json!({"name": "Rui", "email": "rui@example.com", "phone": "917777777",
                    "address": null, "postal_code": null, "city": null})),
    )
    .await;
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(&app, Method::GET, "/api/v1/devices", Caller::Resident(id), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Inactive");

    // the profile stays readable so the resident can see the status
    let (status, body) = send(&app, Method::GET, "/api/v1/me", Caller::Resident(id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active"], false);
}

#[tokio::test]
async fn test_admin_routes_need_token() {
    let app = app();
    let (status, _) = send(&app, Method::GET, "/api/v1/admin/residents", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/api/v1/admin/residents")
        .header("Authorization", "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, "/api/v1/admin/residents", Caller::Admin, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 0);
}

#[tokio::test]
async fn test_unit_mismatch_rejected() {
    let app = app();
    let id = active_resident(&app, "a@example.com", "910000001").await;
    let (status, body) = add_device(&app, id, "water", "consumer", "kWh").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
}

#[tokio::test]
async fn test_duplicate_consumption_conflicts() {
    let app = app();
    let id = active_resident(&app, "a@example.com", "910000001").await;
    let (status, body) = add_device(&app, id, "water", "consumer", "m3").await;
    assert_eq!(status, StatusCode::CREATED);
    let device = body["data"]["id"].as_i64().unwrap();

    let reading = json!({"device_id": device, "year": 2025, "month": 5, "value": 7.5});
    let (status, _) = send(&app, Method::POST, "/api/v1/consumption", Caller::Resident(id), Some(reading.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, Method::POST, "/api/v1/consumption", Caller::Resident(id), Some(reading)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/consumption?year=2025&month=5",
        Caller::Resident(id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 1);
}

#[tokio::test]
async fn test_invalid_report_kind_is_bad_request() {
    let app = app();
    let id = active_resident(&app, "a@example.com", "910000001").await;
    let (status, body) = send(&app, Method::GET, "/api/v1/reports/weekly?year=2025&month=1", Caller::Resident(id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");

    let (status, body) = send(&app, Method::GET, "/api/v1/reports/monthly?year=2025&month=1", Caller::Resident(id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["kind"], "monthly");
}

#[tokio::test]
async fn test_full_billing_flow_over_http() {
    let app = app();
    let id = active_resident(&app, "a@example.com", "910000001").await;

    let (_, supplier) = send(
        &app,
        Method::POST,
        "/api/v1/admin/suppliers",
        Caller::Admin,
        Some(json!({"name": "Luz SA", "tax_number": "500100200", "address": null})),
    )
    .await;
    let supplier_id = supplier["data"]["id"].as_i64().unwrap();
    let (status, service) = send(
        &app,
        Method::POST,
        "/api/v1/admin/services",
        Caller::Admin,
        Some(json!({"supplier_id": supplier_id, "utility": "electricity", "unit": "kWh"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let service_id = service["data"]["id"].as_i64().unwrap();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/admin/tariffs",
        Caller::Admin,
        Some(json!({"service_id": service_id, "price": 0.20, "recorded_at": null})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/contracts",
        Caller::Resident(id),
        Some(json!({"service_id": service_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, d1) = add_device(&app, id, "electricity", "consumer", "kWh").await;
    let (_, d2) = add_device(&app, id, "electricity", "consumer", "kWh").await;
    let (_, solar) = add_device(&app, id, "electricity", "generator", "kWh").await;
    for (device, value) in [(&d1, 100.0), (&d2, 120.0), (&solar, 30.0)] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/consumption",
            Caller::Resident(id),
            Some(json!({"device_id": device["data"]["id"], "year": 2025, "month": 4, "value": value})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/budgets",
        Caller::Resident(id),
        Some(json!({"utility": "electricity", "year": 2025, "month": 4, "value": 30.0})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::GET, "/api/v1/dashboard?year=2025&month=4", Caller::Resident(id), None).await;
    assert_eq!(status, StatusCode::OK);
    let dash = &body["data"];
    assert_eq!(dash["costs"]["electricity"], 38.0);
    assert_eq!(dash["total_cost"], 38.0);
    assert_eq!(dash["alert"]["status"], "excedido");
    assert_eq!(dash["alert"]["overage"], 8.0);
    assert_eq!(dash["device_count"], 3);

    let (status, body) = send(&app, Method::GET, "/api/v1/suppliers", Caller::Resident(id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["services"][0]["current_price"], 0.20);
    assert_eq!(body["data"][0]["services"][0]["contracted"], true);

    let (status, body) = send(&app, Method::GET, "/api/v1/reports/trend?year=2025&month=4", Caller::Resident(id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["monthly_totals"][3]["total_cost"], 38.0);

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/devices/{}", d1["data"]["id"]),
        Caller::Resident(id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed_records"], 1);
}

#[tokio::test]
async fn test_foreign_budget_is_not_found() {
    let app = app();
    let owner = active_resident(&app, "a@example.com", "910000001").await;
    let other = active_resident(&app, "b@example.com", "910000002").await;
    let (_, budget) = send(
        &app,
        Method::POST,
        "/api/v1/budgets",
        Caller::Resident(owner),
        Some(json!({"utility": "gas", "year": 2025, "month": 2, "value": 20.0})),
    )
    .await;
    let budget_id = budget["data"]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/budgets/{budget_id}"),
        Caller::Resident(other),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_tariff_history_and_supplier_list() {
    let app = app();
    let (_, supplier) = send(
        &app,
        Method::POST,
        "/api/v1/admin/suppliers",
        Caller::Admin,
        Some(json!({"name": "Gas Norte", "tax_number": "500300400", "address": null})),
    )
    .await;
    let supplier_id = supplier["data"]["id"].as_i64().unwrap();
    let (_, service) = send(
        &app,
        Method::POST,
        "/api/v1/admin/services",
        Caller::Admin,
        Some(json!({"supplier_id": supplier_id, "utility": "gas", "unit": "m3"})),
    )
    .await;
    let service_id = service["data"]["id"].as_i64().unwrap();
    for (price, at) in [(0.80, "2025-01-01T00:00:00Z"), (0.95, "2025-06-01T00:00:00Z")] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/admin/tariffs",
            Caller::Admin,
            Some(json!({"service_id": service_id, "price": price, "recorded_at": at})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let uri = format!("/api/v1/admin/services/{service_id}/tariffs");
    let (status, body) = send(&app, Method::GET, &uri, Caller::Admin, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["data"][0]["price"], 0.95);
    assert_eq!(body["data"][1]["price"], 0.80);

    let (status, _) = send(&app, Method::GET, &uri, Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Method::GET, "/api/v1/admin/services/999/tariffs", Caller::Admin, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, "/api/v1/admin/suppliers", Caller::Admin, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["data"][0]["name"], "Gas Norte");
}

#[tokio::test]
async fn test_device_toggle_blocks_new_readings() {
    let app = app();
    let id = active_resident(&app, "a@example.com", "910000001").await;
    let (_, device) = add_device(&app, id, "gas", "consumer", "m3").await;
    let device_id = device["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/devices/{device_id}/toggle"),
        Caller::Resident(id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active"], false);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/consumption",
        Caller::Resident(id),
        Some(json!({"device_id": device_id, "year": 2025, "month": 3, "value": 4.0})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
