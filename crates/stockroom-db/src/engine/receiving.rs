//! # Purchase-Order Receiving
//!
//! Turns incoming supply into physical stock.
//!
//! ## One Receipt
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. line.receivedQty += qty        (rejected past line.qty)            │
//! │  2. onHand += qty                  PURCHASE_RECEIPT (+qty)             │
//! │  3. promote ACTIVE INCOMING reservations of the line at this location, │
//! │     oldest first, at most qty units in total:                          │
//! │        reservedIncoming -= p, reservedOnHand += p, kind → ON_HAND      │
//! │     a reservation only partly covered is split                         │
//! │  4. incoming -= min(incoming, qty)                                     │
//! │  5. order → PARTIAL, or CLOSED once every line is fully received       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A batch is one transaction: the first failing receipt aborts all of them.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::reject;
use crate::error::DbResult;
use crate::repository::ledger::{LedgerDraft, LedgerRepository};
use crate::repository::reservation::ReservationRepository;
use crate::repository::stock::StockRepository;
use crate::repository::supply::SupplyRepository;
use stockroom_core::requests::{Receipt, ReceiveBatch};
use stockroom_core::{
    InventoryError, MovementType, PurchaseOrderStatus, ReceiptOutcome, ReceiveOutcome,
    ReferenceType, Reservation, ReservationKind, StockDelta, StockRecord, SupplyLine,
};

/// Receiving service.
#[derive(Debug, Clone)]
pub struct Receiving {
    pool: SqlitePool,
}

impl Receiving {
    pub fn new(pool: SqlitePool) -> Self {
        Receiving { pool }
    }

    /// Applies a batch of receipts atomically.
    ///
    /// ## Errors
    /// - `NOT_FOUND` for an unknown supply line
    /// - `INVALID_STATE` when the line's order is closed or cancelled
    /// - `BAD_INPUT` when a receipt would exceed the ordered quantity
    pub async fn receive(&self, batch: &ReceiveBatch) -> DbResult<ReceiveOutcome> {
        batch.validate()?;
        let now = Utc::now();

        debug!(receipts = batch.receipts.len(), "Receiving batch");

        let mut tx = self.pool.begin().await?;

        let mut receipts = Vec::with_capacity(batch.receipts.len());
        for receipt in &batch.receipts {
            let outcome = receive_one(
                &mut *tx,
                receipt,
                batch.note.as_deref(),
                batch.actor.as_deref(),
                now,
            )
            .await?;
            receipts.push(outcome);
        }

        tx.commit().await?;

        for r in &receipts {
            info!(
                line_id = %r.line_id,
                location_id = %r.location_id,
                received = r.received_qty,
                promoted = r.promoted_qty,
                "Receipt applied"
            );
        }
        Ok(ReceiveOutcome { receipts })
    }
}

async fn receive_one(
    conn: &mut SqliteConnection,
    receipt: &Receipt,
    note: Option<&str>,
    actor: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<ReceiptOutcome> {
    let line = match SupplyRepository::record_receipt(conn, &receipt.line_id, receipt.qty, now).await? {
        Some(line) => line,
        None => return Err(reject("receive", diagnose_refused(conn, receipt).await?)),
    };

    let record = StockRepository::get_or_create(conn, &line.unit_id, &receipt.location_id, now).await?;
    let mut record = StockRepository::apply(conn, &record, StockDelta::on_hand(receipt.qty), now).await?;

    let draft = LedgerDraft::new(
        &line.unit_id,
        &receipt.location_id,
        MovementType::PurchaseReceipt,
        receipt.qty,
    )
    .reference(ReferenceType::PurchaseOrder, &line.purchase_order_id)
    .note(note)
    .actor(actor);
    LedgerRepository::append(conn, draft, now).await?;

    let (promoted_qty, promoted_reservation_ids) =
        promote_reservations(conn, &line, &mut record, receipt.qty, now).await?;

    let incoming_decrement = record.incoming.min(receipt.qty);
    if incoming_decrement > 0 {
        StockRepository::apply(conn, &record, StockDelta::incoming(-incoming_decrement), now).await?;
    }

    let lines = SupplyRepository::lines_for_order(conn, &line.purchase_order_id).await?;
    let status = if lines.iter().all(SupplyLine::is_fully_received) {
        PurchaseOrderStatus::Closed
    } else {
        PurchaseOrderStatus::Partial
    };
    SupplyRepository::set_order_status(conn, &line.purchase_order_id, status, now).await?;

    Ok(ReceiptOutcome {
        line_id: line.id,
        location_id: receipt.location_id.clone(),
        received_qty: receipt.qty,
        incoming_decrement,
        promoted_qty,
        promoted_reservation_ids,
    })
}

/// Explains why the guarded receipt update matched nothing.
async fn diagnose_refused(conn: &mut SqliteConnection, receipt: &Receipt) -> DbResult<InventoryError> {
    let Some(line) = SupplyRepository::find_line(conn, &receipt.line_id).await? else {
        return Ok(InventoryError::not_found("SupplyLine", &receipt.line_id));
    };

    let open = SupplyRepository::find_order(conn, &line.purchase_order_id)
        .await?
        .map(|order| order.status.is_open())
        .unwrap_or(false);
    if !open {
        return Ok(InventoryError::invalid_state(format!(
            "supply line {} belongs to a closed or cancelled purchase order",
            line.id
        )));
    }

    Ok(InventoryError::bad_input(format!(
        "receiving {} on line {} at {} exceeds the {} still expected",
        receipt.qty,
        line.id,
        receipt.location_id,
        line.remaining()
    )))
}

/// Promotes INCOMING reservations of `line` at the record's location, up
/// to `budget` units. Returns the promoted quantity and reservation ids.
async fn promote_reservations(
    conn: &mut SqliteConnection,
    line: &SupplyLine,
    record: &mut StockRecord,
    budget: i64,
    now: DateTime<Utc>,
) -> DbResult<(i64, Vec<String>)> {
    let location_id = record.location_id.clone();
    let waiting =
        ReservationRepository::active_incoming_for_line(conn, &line.id, Some(location_id.as_str())).await?;

    let mut left = budget;
    let mut promoted_ids = Vec::new();
    for reservation in waiting {
        if left == 0 {
            break;
        }
        let qty = reservation.qty.min(left);
        if record.reserved_incoming < qty || record.unreserved_on_hand() < qty {
            break;
        }

        let promoted = if qty == reservation.qty {
            ReservationRepository::promote(conn, &reservation.id, now).await?
        } else {
            split_off_on_hand(conn, &reservation, qty, now).await?
        };
        let Some(promoted) = promoted else {
            break;
        };

        let delta = StockDelta::reserved_incoming(-qty).with_reserved_on_hand(qty);
        *record = StockRepository::apply(conn, record, delta, now).await?;

        debug!(
            reservation_id = %promoted.id,
            source_reservation_id = %reservation.id,
            qty,
            "Reservation promoted to on-hand"
        );
        promoted_ids.push(promoted.id);
        left -= qty;
    }

    Ok((budget - left, promoted_ids))
}

/// Moves `qty` units of an INCOMING reservation into a new ON_HAND one.
async fn split_off_on_hand(
    conn: &mut SqliteConnection,
    reservation: &Reservation,
    qty: i64,
    now: DateTime<Utc>,
) -> DbResult<Option<Reservation>> {
    if ReservationRepository::shrink(conn, &reservation.id, qty, now)
        .await?
        .is_none()
    {
        return Ok(None);
    }

    let split = Reservation {
        id: Uuid::new_v4().to_string(),
        qty,
        kind: ReservationKind::OnHand,
        created_at: now,
        updated_at: now,
        ..reservation.clone()
    };
    ReservationRepository::insert(conn, &split).await?;
    Ok(Some(split))
}
