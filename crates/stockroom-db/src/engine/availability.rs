//! # Availability Calculator
//!
//! Read-only answers to "how many can I sell?".
//!
//! - **ATS** (available-to-sell) per location:
//!   `max(0, onHand - reservedOnHand - safetyStock)`.
//! - **ATP** (available-to-promise) for a unit by a date:
//!   `Σ ATS + incoming due by date - Σ reservedIncoming`.
//!
//! Queries never create stock records; a missing record reads as zero.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::stock::StockRepository;
use crate::repository::supply::SupplyRepository;
use stockroom_core::availability::{ats_by_location, available_to_promise};
use stockroom_core::{AvailableToPromise, LocationAvailability};

/// Availability query service.
#[derive(Debug, Clone)]
pub struct AvailabilityCalculator {
    pool: SqlitePool,
}

impl AvailabilityCalculator {
    pub fn new(pool: SqlitePool) -> Self {
        AvailabilityCalculator { pool }
    }

    /// ATS for one (unit, location).
    pub async fn ats(&self, unit_id: &str, location_id: &str) -> DbResult<LocationAvailability> {
        let mut conn = self.pool.acquire().await?;
        let ats = StockRepository::find(&mut conn, unit_id, location_id)
            .await?
            .map(|record| record.ats())
            .unwrap_or(0);

        Ok(LocationAvailability {
            location_id: location_id.to_string(),
            ats,
        })
    }

    /// ATS at every location holding a record for the unit.
    pub async fn ats_all(&self, unit_id: &str) -> DbResult<Vec<LocationAvailability>> {
        let mut conn = self.pool.acquire().await?;
        let records = StockRepository::for_unit(&mut conn, unit_id).await?;
        Ok(ats_by_location(&records))
    }

    /// ATP for a unit by `date`.
    ///
    /// Records and supply lines are read in one transaction so the
    /// answer reflects a single snapshot.
    pub async fn atp(&self, unit_id: &str, date: NaiveDate) -> DbResult<AvailableToPromise> {
        let mut tx = self.pool.begin().await?;
        let records = StockRepository::for_unit(&mut *tx, unit_id).await?;
        let open_lines = SupplyRepository::open_lines_for_unit(&mut *tx, unit_id).await?;
        tx.commit().await?;

        let atp = available_to_promise(unit_id, date, &records, &open_lines);
        debug!(
            unit_id,
            %date,
            ats_now = atp.ats_now,
            incoming = atp.incoming_by_date,
            atp = atp.atp,
            "Computed ATP"
        );
        Ok(atp)
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::test_support::*;
    use stockroom_core::ErrorKind;

    #[tokio::test]
    async fn test_ats_missing_record_is_zero() {
        let db = db().await;
        let ats = db.availability().ats("SIZE-M", "WH").await.unwrap();
        assert_eq!(ats.ats, 0);
        // Queries leave no trace
        assert!(db.stock().get("SIZE-M", "WH").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ats_per_location() {
        let db = db().await;
        stock_up(&db, "SIZE-M", "WH", 100).await;
        safety(&db, "SIZE-M", "WH", 10).await;
        stock_up(&db, "SIZE-M", "STORE", 6).await;
        db.reservations()
            .reserve_on_hand(&on_hand_req("o-1", "l-1", "SIZE-M", "STORE", 4))
            .await
            .unwrap();

        let all = db.availability().ats_all("SIZE-M").await.unwrap();
        assert_eq!(all.len(), 2);
        let store = all.iter().find(|a| a.location_id == "STORE").unwrap();
        let wh = all.iter().find(|a| a.location_id == "WH").unwrap();
        assert_eq!(store.ats, 2);
        assert_eq!(wh.ats, 90);
    }

    #[tokio::test]
    async fn test_ats_floors_at_zero_under_safety_stock() {
        let db = db().await;
        stock_up(&db, "SIZE-M", "WH", 5).await;
        safety(&db, "SIZE-M", "WH", 8).await;
        let ats = db.availability().ats("SIZE-M", "WH").await.unwrap();
        assert_eq!(ats.ats, 0);

        let err = db
            .reservations()
            .reserve_on_hand(&on_hand_req("o-1", "l-1", "SIZE-M", "WH", 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InsufficientStock));
    }

    #[tokio::test]
    async fn test_atp_counts_supply_due_by_date() {
        // WH: onHand 90 after picking, safety 10; one line of 200 due day 15
        let db = db().await;
        stock_up(&db, "SIZE-M", "WH", 90).await;
        safety(&db, "SIZE-M", "WH", 10).await;
        place_supply(&db, "SIZE-M", "WH", 200, day(15)).await;
        db.reservations()
            .reserve_incoming(&incoming_req("o-1", "l-1", "SIZE-M", "WH", 150))
            .await
            .unwrap();

        let before = db.availability().atp("SIZE-M", day(14)).await.unwrap();
        assert_eq!(before.ats_now, 80);
        assert_eq!(before.incoming_by_date, 0);
        assert_eq!(before.reserved_incoming, 150);
        assert_eq!(before.atp, -70);

        let on_eta = db.availability().atp("SIZE-M", day(15)).await.unwrap();
        assert_eq!(on_eta.incoming_by_date, 200);
        assert_eq!(on_eta.atp, 130);
    }

    #[tokio::test]
    async fn test_atp_ignores_cancelled_supply() {
        let db = db().await;
        let line = place_supply(&db, "SIZE-M", "WH", 30, day(3)).await;
        db.purchasing()
            .cancel_order(&line.purchase_order_id, None)
            .await
            .unwrap();

        let atp = db.availability().atp("SIZE-M", day(30)).await.unwrap();
        assert_eq!(atp.incoming_by_date, 0);
        assert_eq!(atp.atp, 0);
    }
}
