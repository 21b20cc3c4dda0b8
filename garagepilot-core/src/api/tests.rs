use axum::body::{to_bytes, Body};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Duration;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use super::*;
use crate::auth::issue_token;
use crate::db::Database;
use crate::ids::SequentialIds;
use crate::models::InventoryItem;
use crate::pipeline::directory::StaticDirectory;
use crate::pipeline::{Workshop, UNAUTHORIZED_ATTEMPT};

const SECRET: &str = "test-secret";

async fn app() -> (Router, AppState) {
    let db = Database::in_memory();
    let mut tx = db.inventory.begin().await;
    tx.insert(InventoryItem {
        code: "P1".into(),
        name: "Brake pad".into(),
        description: String::new(),
        quantity: 5,
        unit_price: Decimal::from(100),
        vehicle_id: None,
    })
    .unwrap();
    tx.commit().await.unwrap();

    let directory = Arc::new(
        StaticDirectory::default()
            .with_client("1-111", "Carla Mora")
            .with_vehicle("AAA111", "1-111", None)
            .with_user("Ana", "mechanic")
            .with_user("Bruno", "mechanic"),
    );
    let workshop = Workshop::new(
        &db,
        directory.clone(),
        directory,
        Arc::new(SequentialIds::starting_at(1)),
    );
    let state = AppState::new(workshop, SECRET);
    (create_router(state.clone()), state)
}

fn token(name: &str, role: &str) -> String {
    issue_token(SECRET, name, role, Duration::hours(1)).unwrap()
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = app().await;
    let (status, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_api_requires_a_valid_token() {
    let (app, _) = app().await;

    let (status, body) = send(&app, request("GET", "/api/inventory", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let forged = issue_token("wrong-secret", "Ana", "admin", Duration::hours(1)).unwrap();
    let (status, _) = send(&app, request("GET", "/api/inventory", Some(&forged), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = token("Root", "admin");
    let (status, body) = send(&app, request("GET", "/api/inventory", Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_mechanic_cannot_edit_inventory() {
    let (app, state) = app().await;
    let mechanic = token("Ana", "mechanic");

    let (status, body) = send(&app, request("DELETE", "/api/inventory/P1", Some(&mechanic), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    assert!(state.workshop.ledger.part("P1").await.is_ok());
    let filed = state.workshop.reports.list(Some(UNAUTHORIZED_ATTEMPT)).await;
    assert_eq!(filed.len(), 1);
    assert_eq!(filed[0].actor, "Ana");
}

#[tokio::test]
async fn test_booking_to_work_order_over_http() {
    let (app, _) = app().await;
    let admin = token("Root", "admin");
    let mechanic = token("Ana", "mechanic");

    let booking = json!({
        "client_id": "1-111",
        "vehicle_plate": "AAA111",
        "date": "2025-03-10",
        "time": "09:00",
        "description": "brake noise"
    });
    let (status, appt) = send(&app, request("POST", "/api/appointments", Some(&mechanic), Some(booking))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(appt["state"], "Waiting");
    let id = appt["id"].as_u64().unwrap();

    let uri = format!("/api/appointments/{}/mechanic", id);
    let (status, _) = send(&app, request("PATCH", &uri, Some(&mechanic), Some(json!({"mechanic": "Ana"})))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, appt) = send(&app, request("PATCH", &uri, Some(&admin), Some(json!({"mechanic": "Ana"})))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(appt["state"], "Accepted");

    let uri = "/api/appointments/availability?mechanic=Ana&date=2025-03-10&time=09:30";
    let (_, availability) = send(&app, request("GET", uri, Some(&mechanic), None)).await;
    assert_eq!(availability["available"], false);

    let (status, order) = send(
        &app,
        request("POST", "/api/work-orders", Some(&mechanic), Some(json!({"appointment_id": id}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let code = order["code_order"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        request("POST", "/api/work-orders", Some(&mechanic), Some(json!({"appointment_id": id}))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_WORK_ORDER");

    let parts = format!("/api/work-orders/{}/parts", code);
    let (status, order) = send(
        &app,
        request("POST", &parts, Some(&mechanic), Some(json!({"part_code": "P1", "quantity": 3}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["parts_used"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        request("POST", &parts, Some(&mechanic), Some(json!({"part_code": "P1", "quantity": 3}))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "InsufficientStock");

    let (_, orders) = send(&app, request("GET", "/api/work-orders", Some(&token("Bruno", "mechanic")), None)).await;
    assert!(orders.as_array().unwrap().is_empty());
    let (_, orders) = send(&app, request("GET", "/api/work-orders", Some(&mechanic), None)).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_requests_get_the_error_body() {
    let (app, state) = app().await;
    let mechanic = token("Ana", "mechanic");

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/work-orders/OT-1/parts",
            Some(&mechanic),
            Some(json!({"part_code": "P1", "quantity": -1})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidInput");
    assert_eq!(body["code"], "INVALID_INPUT");
    assert!(body["message"].as_str().unwrap().contains("quantity"));
    assert_eq!(state.workshop.ledger.part("P1").await.unwrap().quantity, 5);

    let (status, body) = send(&app, request("GET", "/api/appointments/abc", Some(&mechanic), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    let uri = "/api/appointments/availability?mechanic=Ana&date=tomorrow&time=09:30";
    let (status, body) = send(&app, request("GET", uri, Some(&mechanic), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidInput");
}

#[tokio::test]
async fn test_quotation_lifecycle_over_http() {
    let (app, _) = app().await;
    let admin = token("Root", "admin");

    let quotation = json!({
        "client_id": "1-111",
        "client_name": "Carla Mora",
        "parts": [{"code": "P1", "quantity": 2, "unit_price": 50}],
        "labor_lines": [{"name": "Diagnostics", "hours": 1, "rate": 1000}],
        "labor_discount_percent": 10
    });
    let (status, created) = send(&app, request("POST", "/api/quotations", Some(&admin), Some(quotation))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["totals"]["total"].as_f64(), Some(1130.0));
    let code = created["code"].as_str().unwrap().to_string();

    let uri = format!("/api/quotations/{}/proforma", code);
    let (status, frozen) = send(&app, request("PATCH", &uri, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(frozen["is_proforma"], true);

    let uri = format!("/api/quotations/{}", code);
    let (status, body) = send(&app, request("PUT", &uri, Some(&admin), Some(json!({"state": "accepted"})))).await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["code"], "PROFORMA_IMMUTABLE");

    let (status, _) = send(&app, request("DELETE", &uri, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::LOCKED);

    let (status, body) = send(
        &app,
        request("POST", "/api/quotations", Some(&admin), Some(json!({"client_id": "1-111"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_CLIENT");
}

#[tokio::test]
async fn test_reports_filed_and_filtered() {
    let (app, _) = app().await;
    let admin = token("Root", "admin");
    let mechanic = token("Ana", "mechanic");

    let report = json!({"kind": "Inventory", "description": "shelf B is empty"});
    let (status, filed) = send(&app, request("POST", "/api/reports", Some(&mechanic), Some(report))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(filed["actor"], "Ana");

    let (status, _) = send(&app, request("GET", "/api/reports", Some(&mechanic), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, all) = send(&app, request("GET", "/api/reports", Some(&admin), None)).await;
    // the forbidden read above was itself reported
    assert_eq!(all.as_array().unwrap().len(), 2);
    let (_, inventory) = send(&app, request("GET", "/api/reports?kind=inventory", Some(&admin), None)).await;
    assert_eq!(inventory.as_array().unwrap().len(), 1);
}
