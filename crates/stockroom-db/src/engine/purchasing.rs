//! # Purchasing
//!
//! Purchase orders and the supply lines that feed `incoming`.
//!
//! ## Order Lifecycle
//! ```text
//!   OPEN ──receipt──► PARTIAL ──last line received──► CLOSED
//!     │                  │
//!     └──── cancel ──────┴──► CANCELLED   (only with no ACTIVE INCOMING
//!                                           reservations on its lines)
//! ```
//!
//! Adding a line bumps `incoming` at the line's location; cancelling takes
//! every unreceived remainder back out. Both are ledgered as
//! `PURCHASE_ORDERED` so the audit trail shows where `incoming` came from.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use super::reject;
use crate::error::{DbError, DbResult};
use crate::repository::ledger::{LedgerDraft, LedgerRepository};
use crate::repository::reservation::ReservationRepository;
use crate::repository::stock::StockRepository;
use crate::repository::supply::SupplyRepository;
use stockroom_core::requests::{NewPurchaseOrder, NewSupplyLine};
use stockroom_core::{
    InventoryError, MovementType, PurchaseOrder, PurchaseOrderDetail, PurchaseOrderStatus,
    ReferenceType, StockDelta, SupplyLine,
};

/// Purchase order service.
#[derive(Debug, Clone)]
pub struct Purchasing {
    pool: SqlitePool,
}

impl Purchasing {
    pub fn new(pool: SqlitePool) -> Self {
        Purchasing { pool }
    }

    /// Opens an empty purchase order.
    pub async fn create_order(&self, req: &NewPurchaseOrder) -> DbResult<PurchaseOrder> {
        req.validate()?;
        let now = Utc::now();

        let order = PurchaseOrder {
            id: Uuid::new_v4().to_string(),
            supplier_ref: req.supplier_ref.clone(),
            status: PurchaseOrderStatus::Open,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.pool.acquire().await?;
        SupplyRepository::insert_order(&mut conn, &order).await?;

        info!(id = %order.id, supplier = ?order.supplier_ref, "Purchase order opened");
        Ok(order)
    }

    /// Adds a line to an open purchase order and raises `incoming` at the
    /// line's location.
    pub async fn add_line(&self, purchase_order_id: &str, req: &NewSupplyLine) -> DbResult<SupplyLine> {
        req.validate()?;
        let now = Utc::now();

        debug!(
            purchase_order_id,
            unit_id = %req.unit_id,
            location_id = %req.location_id,
            qty = req.qty,
            eta = %req.eta,
            "Adding supply line"
        );

        let mut tx = self.pool.begin().await?;

        let record =
            StockRepository::get_or_create(&mut *tx, &req.unit_id, &req.location_id, now).await?;

        let order = SupplyRepository::find_order(&mut *tx, purchase_order_id)
            .await?
            .ok_or_else(|| DbError::not_found("PurchaseOrder", purchase_order_id))?;
        if !order.status.is_open() {
            return Err(reject(
                "add_line",
                InventoryError::invalid_state(format!(
                    "purchase order {} is {:?}",
                    order.id, order.status
                )),
            ));
        }

        let line = SupplyLine {
            id: Uuid::new_v4().to_string(),
            purchase_order_id: order.id.clone(),
            unit_id: req.unit_id.clone(),
            location_id: req.location_id.clone(),
            qty: req.qty,
            eta: req.eta,
            received_qty: 0,
            created_at: now,
            updated_at: now,
        };
        SupplyRepository::insert_line(&mut *tx, &line).await?;

        StockRepository::apply(&mut *tx, &record, StockDelta::incoming(req.qty), now).await?;

        let draft = LedgerDraft::new(
            &req.unit_id,
            &req.location_id,
            MovementType::PurchaseOrdered,
            req.qty,
        )
        .reference(ReferenceType::PurchaseOrder, &order.id)
        .actor(req.actor.as_deref());
        LedgerRepository::append(&mut *tx, draft, now).await?;

        tx.commit().await?;

        info!(
            line_id = %line.id,
            purchase_order_id = %line.purchase_order_id,
            qty = line.qty,
            "Supply line added"
        );
        Ok(line)
    }

    /// A purchase order with its lines.
    pub async fn get_order(&self, purchase_order_id: &str) -> DbResult<PurchaseOrderDetail> {
        let mut conn = self.pool.acquire().await?;
        let order = SupplyRepository::find_order(&mut conn, purchase_order_id)
            .await?
            .ok_or_else(|| DbError::not_found("PurchaseOrder", purchase_order_id))?;
        let lines = SupplyRepository::lines_for_order(&mut conn, purchase_order_id).await?;
        Ok(PurchaseOrderDetail { order, lines })
    }

    /// Cancels an open purchase order and withdraws its unreceived supply.
    ///
    /// ## Errors
    /// - `NOT_FOUND` for an unknown order
    /// - `INVALID_STATE` when the order is already closed or cancelled, or
    ///   ACTIVE INCOMING reservations still depend on its lines
    pub async fn cancel_order(
        &self,
        purchase_order_id: &str,
        actor: Option<&str>,
    ) -> DbResult<PurchaseOrder> {
        let now = Utc::now();
        debug!(purchase_order_id, "Cancelling purchase order");

        let mut tx = self.pool.begin().await?;

        let Some(order) = SupplyRepository::finish_order(
            &mut *tx,
            purchase_order_id,
            PurchaseOrderStatus::Cancelled,
            now,
        )
        .await?
        else {
            let err = match SupplyRepository::find_order(&mut *tx, purchase_order_id).await? {
                None => InventoryError::not_found("PurchaseOrder", purchase_order_id),
                Some(order) => InventoryError::invalid_state(format!(
                    "purchase order {} is {:?}",
                    order.id, order.status
                )),
            };
            return Err(reject("cancel_order", err));
        };

        let dependent =
            ReservationRepository::count_active_incoming_for_order(&mut *tx, purchase_order_id).await?;
        if dependent > 0 {
            return Err(reject(
                "cancel_order",
                InventoryError::invalid_state(format!(
                    "purchase order {purchase_order_id} backs {dependent} active incoming reservation(s)"
                )),
            ));
        }

        let lines = SupplyRepository::lines_for_order(&mut *tx, purchase_order_id).await?;
        for line in lines.iter().filter(|l| l.remaining() > 0) {
            let record =
                StockRepository::get_or_create(&mut *tx, &line.unit_id, &line.location_id, now).await?;
            let withdrawn = line.remaining().min(record.incoming);
            if withdrawn == 0 {
                continue;
            }

            StockRepository::apply(&mut *tx, &record, StockDelta::incoming(-withdrawn), now).await?;

            let draft = LedgerDraft::new(
                &line.unit_id,
                &line.location_id,
                MovementType::PurchaseOrdered,
                -withdrawn,
            )
            .reference(ReferenceType::PurchaseOrder, purchase_order_id)
            .note(Some("purchase order cancelled"))
            .actor(actor);
            LedgerRepository::append(&mut *tx, draft, now).await?;
        }

        tx.commit().await?;

        info!(id = %order.id, lines = lines.len(), "Purchase order cancelled");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::test_support::*;
    use stockroom_core::requests::{NewPurchaseOrder, NewSupplyLine, ReleaseReservation};
    use stockroom_core::{ErrorKind, MovementType, PurchaseOrderStatus};

    fn line_req(unit: &str, qty: i64, eta: u32) -> NewSupplyLine {
        NewSupplyLine {
            unit_id: unit.to_string(),
            location_id: "WH".to_string(),
            qty,
            eta: day(eta),
            actor: Some("buyer".to_string()),
        }
    }

    #[tokio::test]
    async fn test_order_with_lines() {
        let db = db().await;
        let order = db
            .purchasing()
            .create_order(&NewPurchaseOrder::default())
            .await
            .unwrap();
        assert_eq!(order.status, PurchaseOrderStatus::Open);

        db.purchasing().add_line(&order.id, &line_req("SIZE-M", 200, 15)).await.unwrap();
        db.purchasing().add_line(&order.id, &line_req("SIZE-L", 50, 20)).await.unwrap();

        let detail = db.purchasing().get_order(&order.id).await.unwrap();
        assert_eq!(detail.lines.len(), 2);
        assert_eq!(detail.lines[0].unit_id, "SIZE-M");

        let record = db.stock().get("SIZE-M", "WH").await.unwrap().unwrap();
        assert_eq!(record.incoming, 200);
        assert_eq!(record.on_hand, 0);

        let entries = db.ledger().for_reference(&order.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.movement_type == MovementType::PurchaseOrdered));
    }

    #[tokio::test]
    async fn test_add_line_to_unknown_order() {
        let db = db().await;
        let err = db
            .purchasing()
            .add_line("po-missing", &line_req("SIZE-M", 1, 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_cancel_withdraws_incoming() {
        let db = db().await;
        let line = place_supply(&db, "SIZE-M", "WH", 200, day(15)).await;

        let cancelled = db
            .purchasing()
            .cancel_order(&line.purchase_order_id, Some("buyer"))
            .await
            .unwrap();
        assert_eq!(cancelled.status, PurchaseOrderStatus::Cancelled);

        let record = db.stock().get("SIZE-M", "WH").await.unwrap().unwrap();
        assert_eq!(record.incoming, 0);

        let entries = db.ledger().for_reference(&line.purchase_order_id).await.unwrap();
        assert_eq!(entries.last().unwrap().delta, -200);

        // Terminal
        let err = db
            .purchasing()
            .cancel_order(&line.purchase_order_id, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidState));
        let err = db
            .purchasing()
            .add_line(&line.purchase_order_id, &line_req("SIZE-M", 5, 15))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidState));
    }

    #[tokio::test]
    async fn test_cancel_blocked_by_incoming_reservation() {
        let db = db().await;
        let line = place_supply(&db, "SIZE-M", "WH", 200, day(15)).await;
        let rsv = db
            .reservations()
            .reserve_incoming(&incoming_req("o-1", "l-1", "SIZE-M", "WH", 20))
            .await
            .unwrap();

        let err = db
            .purchasing()
            .cancel_order(&line.purchase_order_id, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidState));

        // Rolled back: still open, incoming untouched
        let detail = db.purchasing().get_order(&line.purchase_order_id).await.unwrap();
        assert_eq!(detail.order.status, PurchaseOrderStatus::Open);
        let record = db.stock().get("SIZE-M", "WH").await.unwrap().unwrap();
        assert_eq!(record.incoming, 200);

        db.reservations()
            .release(&ReleaseReservation {
                reservation_id: rsv.id,
                reason: None,
                actor: None,
            })
            .await
            .unwrap();
        db.purchasing()
            .cancel_order(&line.purchase_order_id, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_unknown_order() {
        let db = db().await;
        let err = db.purchasing().cancel_order("po-missing", None).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }
}
