//! # HTTP Routes
//!
//! One handler per engine operation. Handlers parse, call the engine, and
//! serialize; mutating calls go through [`with_retry`] so a lost write race
//! is replayed before the client sees it.
//!
//! ## Endpoints
//! ```text
//! GET  /health
//!
//! GET  /units/{unit}/ats                      ATS at every location
//! GET  /units/{unit}/locations/{loc}/ats      ATS at one location
//! GET  /units/{unit}/atp?date=YYYY-MM-DD      ATP by date
//! GET  /units/{unit}/stock                    stock records at every location
//! GET  /stock/{unit}/{loc}                    raw stock record
//!
//! POST /stock/adjust                          signed on-hand correction
//! POST /stock/safety                          set safety stock
//! POST /stock/returns                         customer return
//! POST /transfers                             move stock between locations
//!
//! POST /reservations/on-hand                  reserve physical stock
//! POST /reservations/incoming                 reserve expected stock
//! GET  /reservations?orderId=&orderLineId=    reservations of an order line
//! GET  /reservations/{id}
//! POST /reservations/{id}/release
//! POST /reservations/pick                     consume on-hand reservations
//! POST /reservations/expire                   sweep due reservations
//!
//! POST /receipts                              receive against supply lines
//!
//! GET  /locations        POST /locations      GET /locations/{id}
//! POST /purchase-orders                       GET /purchase-orders/{id}
//! POST /purchase-orders/{id}/lines            POST /purchase-orders/{id}/cancel
//!
//! GET  /ledger/{unit}/{loc}?limit=N           newest first
//! GET  /ledger/references/{id}
//! GET  /reconcile                             GET /reconcile/{unit}/{loc}
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use stockroom_core::requests::{
    AdjustOnHand, NewLocation, NewPurchaseOrder, NewSupplyLine, PickRequest, ReceiveBatch,
    ReleaseReservation, ReserveIncoming, ReserveOnHand, ReturnToStock, SetSafetyStock,
    TransferRequest,
};
use stockroom_core::{
    AvailableToPromise, LedgerEntry, Location, LocationAvailability, PickOutcome, PurchaseOrder,
    PurchaseOrderDetail, ReceiveOutcome, ReconciliationReport, Reservation, StockRecord,
    SupplyLine, TransferOutcome,
};

use crate::error::ApiError;
use crate::retry::with_retry;
use crate::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

const DEFAULT_LEDGER_LIMIT: i64 = 100;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Availability
        .route("/units/{unit}/ats", get(ats_all))
        .route("/units/{unit}/locations/{loc}/ats", get(ats))
        .route("/units/{unit}/atp", get(atp))
        .route("/units/{unit}/stock", get(stock_for_unit))
        .route("/stock/{unit}/{loc}", get(stock_record))
        // Stock maintenance
        .route("/stock/adjust", post(adjust_on_hand))
        .route("/stock/safety", post(set_safety_stock))
        .route("/stock/returns", post(return_to_stock))
        .route("/transfers", post(transfer))
        // Reservations
        .route("/reservations", get(list_reservations))
        .route("/reservations/on-hand", post(reserve_on_hand))
        .route("/reservations/incoming", post(reserve_incoming))
        .route("/reservations/pick", post(pick))
        .route("/reservations/expire", post(expire_due))
        .route("/reservations/{id}", get(get_reservation))
        .route("/reservations/{id}/release", post(release))
        // Receiving & purchasing
        .route("/receipts", post(receive))
        .route("/locations", get(list_locations).post(register_location))
        .route("/locations/{id}", get(get_location))
        .route("/purchase-orders", post(create_purchase_order))
        .route("/purchase-orders/{id}", get(get_purchase_order))
        .route("/purchase-orders/{id}/lines", post(add_supply_line))
        .route("/purchase-orders/{id}/cancel", post(cancel_purchase_order))
        // Audit
        .route("/ledger/references/{id}", get(ledger_for_reference))
        .route("/ledger/{unit}/{loc}", get(ledger_for_stock))
        .route("/reconcile", get(reconcile_all))
        .route("/reconcile/{unit}/{loc}", get(reconcile))
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    database: bool,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let database = state.db.health_check().await;
    Json(Health {
        status: if database { "ok" } else { "degraded" },
        database,
    })
}

// =============================================================================
// Availability
// =============================================================================

async fn ats_all(
    State(state): State<AppState>,
    Path(unit): Path<String>,
) -> ApiResult<Vec<LocationAvailability>> {
    Ok(Json(state.db.availability().ats_all(&unit).await?))
}

async fn ats(
    State(state): State<AppState>,
    Path((unit, loc)): Path<(String, String)>,
) -> ApiResult<LocationAvailability> {
    Ok(Json(state.db.availability().ats(&unit, &loc).await?))
}

#[derive(Debug, Deserialize)]
struct AtpQuery {
    date: NaiveDate,
}

async fn atp(
    State(state): State<AppState>,
    Path(unit): Path<String>,
    query: Result<Query<AtpQuery>, QueryRejection>,
) -> ApiResult<AvailableToPromise> {
    let Query(query) = query.map_err(|e| ApiError::bad_input(e.body_text()))?;
    Ok(Json(state.db.availability().atp(&unit, query.date).await?))
}

async fn stock_for_unit(
    State(state): State<AppState>,
    Path(unit): Path<String>,
) -> ApiResult<Vec<StockRecord>> {
    Ok(Json(state.db.stock().list_for_unit(&unit).await?))
}

async fn stock_record(
    State(state): State<AppState>,
    Path((unit, loc)): Path<(String, String)>,
) -> ApiResult<StockRecord> {
    state
        .db
        .stock()
        .get(&unit, &loc)
        .await?
        .map(Json)
        .ok_or_else(|| stockroom_db::DbError::not_found("StockRecord", format!("{unit}@{loc}")).into())
}

// =============================================================================
// Stock Maintenance
// =============================================================================

async fn adjust_on_hand(
    State(state): State<AppState>,
    payload: Result<Json<AdjustOnHand>, JsonRejection>,
) -> ApiResult<StockRecord> {
    let Json(req) = payload?;
    let adjustments = state.db.adjustments();
    let record = with_retry(&state.retry, "adjust_on_hand", || adjustments.adjust_on_hand(&req)).await?;
    Ok(Json(record))
}

async fn set_safety_stock(
    State(state): State<AppState>,
    payload: Result<Json<SetSafetyStock>, JsonRejection>,
) -> ApiResult<StockRecord> {
    let Json(req) = payload?;
    let adjustments = state.db.adjustments();
    let record =
        with_retry(&state.retry, "set_safety_stock", || adjustments.set_safety_stock(&req)).await?;
    Ok(Json(record))
}

async fn return_to_stock(
    State(state): State<AppState>,
    payload: Result<Json<ReturnToStock>, JsonRejection>,
) -> ApiResult<StockRecord> {
    let Json(req) = payload?;
    let adjustments = state.db.adjustments();
    let record =
        with_retry(&state.retry, "return_to_stock", || adjustments.return_to_stock(&req)).await?;
    Ok(Json(record))
}

async fn transfer(
    State(state): State<AppState>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> ApiResult<TransferOutcome> {
    let Json(req) = payload?;
    let transfers = state.db.transfers();
    let outcome = with_retry(&state.retry, "transfer", || transfers.transfer(&req)).await?;
    Ok(Json(outcome))
}

// =============================================================================
// Reservations
// =============================================================================

async fn reserve_on_hand(
    State(state): State<AppState>,
    payload: Result<Json<ReserveOnHand>, JsonRejection>,
) -> ApiResult<Reservation> {
    let Json(req) = payload?;
    let reservations = state.db.reservations();
    let reservation =
        with_retry(&state.retry, "reserve_on_hand", || reservations.reserve_on_hand(&req)).await?;
    Ok(Json(reservation))
}

async fn reserve_incoming(
    State(state): State<AppState>,
    payload: Result<Json<ReserveIncoming>, JsonRejection>,
) -> ApiResult<Reservation> {
    let Json(req) = payload?;
    let reservations = state.db.reservations();
    let reservation =
        with_retry(&state.retry, "reserve_incoming", || reservations.reserve_incoming(&req)).await?;
    Ok(Json(reservation))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderLineQuery {
    order_id: String,
    order_line_id: String,
}

async fn list_reservations(
    State(state): State<AppState>,
    query: Result<Query<OrderLineQuery>, QueryRejection>,
) -> ApiResult<Vec<Reservation>> {
    let Query(query) = query.map_err(|e| ApiError::bad_input(e.body_text()))?;
    let reservations = state
        .db
        .reservations()
        .list_for_order_line(&query.order_id, &query.order_line_id)
        .await?;
    Ok(Json(reservations))
}

async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Reservation> {
    Ok(Json(state.db.reservations().get(&id).await?))
}

#[derive(Debug, Default, Deserialize)]
struct ReleaseBody {
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    actor: Option<String>,
}

async fn release(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ReleaseBody>, JsonRejection>,
) -> ApiResult<Reservation> {
    let Json(body) = payload?;
    let req = ReleaseReservation {
        reservation_id: id,
        reason: body.reason,
        actor: body.actor,
    };
    let reservations = state.db.reservations();
    let reservation = with_retry(&state.retry, "release", || reservations.release(&req)).await?;
    Ok(Json(reservation))
}

async fn pick(
    State(state): State<AppState>,
    payload: Result<Json<PickRequest>, JsonRejection>,
) -> ApiResult<PickOutcome> {
    let Json(req) = payload?;
    let reservations = state.db.reservations();
    let outcome = with_retry(&state.retry, "pick", || reservations.pick(&req)).await?;
    Ok(Json(outcome))
}

async fn expire_due(State(state): State<AppState>) -> ApiResult<Vec<Reservation>> {
    let now = Utc::now();
    let reservations = state.db.reservations();
    let expired = with_retry(&state.retry, "expire_due", || reservations.expire_due(now)).await?;
    Ok(Json(expired))
}

// =============================================================================
// Receiving & Purchasing
// =============================================================================

async fn receive(
    State(state): State<AppState>,
    payload: Result<Json<ReceiveBatch>, JsonRejection>,
) -> ApiResult<ReceiveOutcome> {
    let Json(batch) = payload?;
    let receiving = state.db.receiving();
    let outcome = with_retry(&state.retry, "receive", || receiving.receive(&batch)).await?;
    Ok(Json(outcome))
}

async fn list_locations(State(state): State<AppState>) -> ApiResult<Vec<Location>> {
    Ok(Json(state.db.locations().list().await?))
}

async fn register_location(
    State(state): State<AppState>,
    payload: Result<Json<NewLocation>, JsonRejection>,
) -> ApiResult<Location> {
    let Json(req) = payload?;
    Ok(Json(state.db.locations().register(&req).await?))
}

async fn get_location(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Location> {
    Ok(Json(state.db.locations().get(&id).await?))
}

async fn create_purchase_order(
    State(state): State<AppState>,
    payload: Result<Json<NewPurchaseOrder>, JsonRejection>,
) -> ApiResult<PurchaseOrder> {
    let Json(req) = payload?;
    Ok(Json(state.db.purchasing().create_order(&req).await?))
}

async fn get_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PurchaseOrderDetail> {
    Ok(Json(state.db.purchasing().get_order(&id).await?))
}

async fn add_supply_line(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<NewSupplyLine>, JsonRejection>,
) -> ApiResult<SupplyLine> {
    let Json(req) = payload?;
    let purchasing = state.db.purchasing();
    let line = with_retry(&state.retry, "add_supply_line", || purchasing.add_line(&id, &req)).await?;
    Ok(Json(line))
}

#[derive(Debug, Default, Deserialize)]
struct CancelBody {
    #[serde(default)]
    actor: Option<String>,
}

async fn cancel_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CancelBody>, JsonRejection>,
) -> ApiResult<PurchaseOrder> {
    let Json(body) = payload?;
    let purchasing = state.db.purchasing();
    let order = with_retry(&state.retry, "cancel_purchase_order", || {
        purchasing.cancel_order(&id, body.actor.as_deref())
    })
    .await?;
    Ok(Json(order))
}

// =============================================================================
// Ledger & Reconciliation
// =============================================================================

#[derive(Debug, Deserialize)]
struct LedgerQuery {
    #[serde(default)]
    limit: Option<i64>,
}

async fn ledger_for_stock(
    State(state): State<AppState>,
    Path((unit, loc)): Path<(String, String)>,
    query: Result<Query<LedgerQuery>, QueryRejection>,
) -> ApiResult<Vec<LedgerEntry>> {
    let Query(query) = query.map_err(|e| ApiError::bad_input(e.body_text()))?;
    let limit = query.limit.unwrap_or(DEFAULT_LEDGER_LIMIT);
    if limit <= 0 {
        return Err(ApiError::bad_input("limit must be positive"));
    }
    Ok(Json(state.db.ledger().for_stock(&unit, &loc, limit).await?))
}

async fn ledger_for_reference(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<LedgerEntry>> {
    Ok(Json(state.db.ledger().for_reference(&id).await?))
}

async fn reconcile_all(State(state): State<AppState>) -> ApiResult<Vec<ReconciliationReport>> {
    Ok(Json(state.db.reconciliation().reconcile_all().await?))
}

async fn reconcile(
    State(state): State<AppState>,
    Path((unit, loc)): Path<(String, String)>,
) -> ApiResult<ReconciliationReport> {
    Ok(Json(state.db.reconciliation().reconcile(&unit, &loc).await?))
}
