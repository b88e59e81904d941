//! Ledger reconciliation.
//!
//! Replays the on-hand movements of the ledger and compares the sum with
//! the stored `onHand`. A non-zero drift means a record was changed outside
//! the engine.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::ledger::LedgerRepository;
use crate::repository::stock::StockRepository;
use stockroom_core::{ReconciliationReport, StockRecord};

/// Ledger replay service.
#[derive(Debug, Clone)]
pub struct Reconciler {
    pool: SqlitePool,
}

impl Reconciler {
    pub fn new(pool: SqlitePool) -> Self {
        Reconciler { pool }
    }

    /// Reconciles one (unit, location). `NOT_FOUND` if no record exists.
    pub async fn reconcile(&self, unit_id: &str, location_id: &str) -> DbResult<ReconciliationReport> {
        let mut tx = self.pool.begin().await?;
        let record = StockRepository::find(&mut *tx, unit_id, location_id)
            .await?
            .ok_or_else(|| DbError::not_found("StockRecord", format!("{unit_id}@{location_id}")))?;
        let ledger_on_hand = LedgerRepository::on_hand_total(&mut *tx, unit_id, location_id).await?;
        tx.commit().await?;

        Ok(report(&record, ledger_on_hand))
    }

    /// Reconciles every stock record. Returns one report per record.
    pub async fn reconcile_all(&self) -> DbResult<Vec<ReconciliationReport>> {
        let mut tx = self.pool.begin().await?;
        let records = StockRepository::all(&mut *tx).await?;

        let mut reports = Vec::with_capacity(records.len());
        for record in &records {
            let ledger_on_hand =
                LedgerRepository::on_hand_total(&mut *tx, &record.unit_id, &record.location_id).await?;
            reports.push(report(record, ledger_on_hand));
        }
        tx.commit().await?;

        let drifted = reports.iter().filter(|r| !r.is_consistent()).count();
        info!(records = reports.len(), drifted, "Reconciliation complete");
        Ok(reports)
    }
}

fn report(record: &StockRecord, ledger_on_hand: i64) -> ReconciliationReport {
    let drift = record.on_hand - ledger_on_hand;
    if drift != 0 {
        warn!(
            unit_id = %record.unit_id,
            location_id = %record.location_id,
            recorded = record.on_hand,
            ledger = ledger_on_hand,
            drift,
            "Stock record drifted from ledger"
        );
    }

    ReconciliationReport {
        unit_id: record.unit_id.clone(),
        location_id: record.location_id.clone(),
        recorded_on_hand: record.on_hand,
        ledger_on_hand,
        drift,
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::test_support::*;
    use stockroom_core::requests::{PickRequest, Receipt, ReceiveBatch, ReleaseReservation, TransferRequest};
    use stockroom_core::ErrorKind;

    #[tokio::test]
    async fn test_ledger_replays_to_on_hand() {
        let db = db().await;
        stock_up(&db, "SIZE-M", "WH", 100).await;
        safety(&db, "SIZE-M", "WH", 10).await;
        let line = place_supply(&db, "SIZE-M", "WH", 40, day(12)).await;

        let kept = db
            .reservations()
            .reserve_on_hand(&on_hand_req("o-1", "l-1", "SIZE-M", "WH", 30))
            .await
            .unwrap();
        let dropped = db
            .reservations()
            .reserve_on_hand(&on_hand_req("o-2", "l-1", "SIZE-M", "WH", 5))
            .await
            .unwrap();
        db.reservations()
            .release(&ReleaseReservation {
                reservation_id: dropped.id,
                reason: None,
                actor: None,
            })
            .await
            .unwrap();
        db.reservations()
            .pick(&PickRequest {
                order_id: kept.order_id.clone(),
                order_line_id: kept.order_line_id.clone(),
                location_id: None,
                note: None,
                actor: None,
            })
            .await
            .unwrap();
        db.transfers()
            .transfer(&TransferRequest {
                unit_id: "SIZE-M".to_string(),
                from_location_id: "WH".to_string(),
                to_location_id: "STORE".to_string(),
                qty: 20,
                note: None,
                actor: None,
            })
            .await
            .unwrap();
        db.receiving()
            .receive(&ReceiveBatch {
                receipts: vec![Receipt {
                    line_id: line.id.clone(),
                    location_id: "WH".to_string(),
                    qty: 25,
                }],
                note: None,
                actor: None,
            })
            .await
            .unwrap();

        let reports = db.reconciliation().reconcile_all().await.unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.is_consistent()));

        let wh = db.reconciliation().reconcile("SIZE-M", "WH").await.unwrap();
        // 100 - 30 picked - 20 moved + 25 received
        assert_eq!(wh.recorded_on_hand, 75);
        assert_eq!(wh.ledger_on_hand, 75);
    }

    #[tokio::test]
    async fn test_out_of_band_write_shows_drift() {
        let db = db().await;
        stock_up(&db, "SIZE-M", "WH", 10).await;

        sqlx::query("UPDATE stock_records SET on_hand = on_hand + 3 WHERE unit_id = 'SIZE-M'")
            .execute(db.pool())
            .await
            .unwrap();

        let report = db.reconciliation().reconcile("SIZE-M", "WH").await.unwrap();
        assert_eq!(report.drift, 3);
        assert!(!report.is_consistent());
    }

    #[tokio::test]
    async fn test_reconcile_missing_record() {
        let db = db().await;
        let err = db.reconciliation().reconcile("SIZE-M", "WH").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }
}
