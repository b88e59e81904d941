//! End-to-end tests driving the router in-process against an in-memory
//! database.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use stockroom_api::config::RetrySettings;
use stockroom_api::{app, AppState};
use stockroom_db::{Database, DbConfig};

async fn test_app() -> Router {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    app(AppState::new(db, RetrySettings::default()))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&value).unwrap())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn stock_up(app: &Router, unit: &str, location: &str, qty: i64) {
    let (status, _) = send(
        app,
        Method::POST,
        "/stock/adjust",
        Some(json!({ "unitId": unit, "locationId": location, "delta": qty })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

fn reserve_body(order: &str, qty: i64) -> Value {
    json!({
        "orderId": order,
        "orderLineId": "1",
        "unitId": "SIZE-M",
        "locationId": "WH",
        "qty": qty
    })
}

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_reserve_respects_safety_stock() {
    let app = test_app().await;
    stock_up(&app, "SIZE-M", "WH", 100).await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/stock/safety",
        Some(json!({ "unitId": "SIZE-M", "locationId": "WH", "safetyStock": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, reservation) =
        send(&app, Method::POST, "/reservations/on-hand", Some(reserve_body("o-1", 50))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reservation["status"], "ACTIVE");
    assert_eq!(reservation["kind"], "ON_HAND");

    let (status, err) =
        send(&app, Method::POST, "/reservations/on-hand", Some(reserve_body("o-2", 45))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "INSUFFICIENT_STOCK");

    let (status, ats) = send(&app, Method::GET, "/units/SIZE-M/locations/WH/ats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ats["ats"], 40);

    // Release, then the capacity is back
    let id = reservation["id"].as_str().unwrap();
    let (status, released) = send(
        &app,
        Method::POST,
        &format!("/reservations/{id}/release"),
        Some(json!({ "reason": "customer cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(released["status"], "RELEASED");

    let (_, ats) = send(&app, Method::GET, "/units/SIZE-M/locations/WH/ats", None).await;
    assert_eq!(ats["ats"], 90);
}

#[tokio::test]
async fn test_unknown_reservation_is_404() {
    let app = test_app().await;
    let (status, err) = send(&app, Method::GET, "/reservations/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_bad_input_is_400() {
    let app = test_app().await;

    let (status, err) =
        send(&app, Method::POST, "/reservations/on-hand", Some(reserve_body("o-1", 0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "BAD_INPUT");

    // Missing required field
    let (status, err) = send(
        &app,
        Method::POST,
        "/reservations/on-hand",
        Some(json!({ "orderId": "o-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "BAD_INPUT");

    let (status, _) = send(&app, Method::GET, "/units/SIZE-M/atp", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_incoming_without_supply() {
    let app = test_app().await;
    let (status, err) =
        send(&app, Method::POST, "/reservations/incoming", Some(reserve_body("o-1", 5))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "NO_INCOMING_SOURCE");
}

#[tokio::test]
async fn test_purchase_order_receipt_flow() {
    let app = test_app().await;

    let (status, order) = send(
        &app,
        Method::POST,
        "/purchase-orders",
        Some(json!({ "supplierRef": "SUP-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "OPEN");
    let po_id = order["id"].as_str().unwrap().to_string();

    let (status, line) = send(
        &app,
        Method::POST,
        &format!("/purchase-orders/{po_id}/lines"),
        Some(json!({ "unitId": "SIZE-M", "locationId": "WH", "qty": 200, "eta": "2030-01-15" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let line_id = line["id"].as_str().unwrap().to_string();

    let (status, reservation) =
        send(&app, Method::POST, "/reservations/incoming", Some(reserve_body("o-1", 150))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reservation["kind"], "INCOMING");
    assert_eq!(reservation["sourceLineId"], line_id.as_str());

    let (status, atp) = send(&app, Method::GET, "/units/SIZE-M/atp?date=2030-01-15", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(atp["atp"], 50);

    let (status, outcome) = send(
        &app,
        Method::POST,
        "/receipts",
        Some(json!({ "receipts": [{ "lineId": line_id, "locationId": "WH", "qty": 100 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["receipts"][0]["promotedQty"], 100);

    let (_, record) = send(&app, Method::GET, "/stock/SIZE-M/WH", None).await;
    assert_eq!(record["onHand"], 100);
    assert_eq!(record["incoming"], 100);
    assert_eq!(record["reservedOnHand"], 100);
    assert_eq!(record["reservedIncoming"], 50);

    let (_, detail) = send(&app, Method::GET, &format!("/purchase-orders/{po_id}"), None).await;
    assert_eq!(detail["order"]["status"], "PARTIAL");
    assert_eq!(detail["lines"][0]["receivedQty"], 100);

    // The remaining incoming reservation blocks cancellation
    let (status, err) = send(
        &app,
        Method::POST,
        &format!("/purchase-orders/{po_id}/cancel"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "INVALID_STATE");

    let (status, reports) = send(&app, Method::GET, "/reconcile", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reports[0]["drift"], 0);
}

#[tokio::test]
async fn test_pick_and_ledger() {
    let app = test_app().await;
    stock_up(&app, "SIZE-M", "WH", 20).await;
    send(&app, Method::POST, "/reservations/on-hand", Some(reserve_body("o-7", 5))).await;

    let (status, outcome) = send(
        &app,
        Method::POST,
        "/reservations/pick",
        Some(json!({ "orderId": "o-7", "orderLineId": "1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["groups"][0]["qty"], 5);

    let (status, entries) = send(&app, Method::GET, "/ledger/SIZE-M/WH?limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["movementType"], "PICK");
    assert_eq!(entries[0]["delta"], -5);

    // Nothing left to pick
    let (status, _) = send(
        &app,
        Method::POST,
        "/reservations/pick",
        Some(json!({ "orderId": "o-7", "orderLineId": "1" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
