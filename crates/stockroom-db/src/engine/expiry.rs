//! Expiry sweep.
//!
//! Reservations past `expires_at` keep counting as reserved until swept.
//! A sweep moves each due reservation ACTIVE → EXPIRED and credits its
//! bucket back exactly like a release.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::reservations::{credit_back, ReservationManager};
use crate::error::DbResult;
use crate::repository::reservation::ReservationRepository;
use stockroom_core::{Reservation, ReservationStatus};

const EXPIRED_NOTE: &str = "expired";

impl ReservationManager {
    /// Expires every ACTIVE reservation due at `now`, in one transaction.
    ///
    /// Returns the reservations that were expired (empty when none were due).
    pub async fn expire_due(&self, now: DateTime<Utc>) -> DbResult<Vec<Reservation>> {
        let mut tx = self.pool.begin().await?;

        let candidates = ReservationRepository::active_with_expiry(&mut *tx).await?;
        let due: Vec<Reservation> = candidates.into_iter().filter(|r| r.is_due(now)).collect();

        debug!(due = due.len(), "Sweeping expired reservations");

        let mut expired = Vec::with_capacity(due.len());
        for mut reservation in due {
            reservation.transition(ReservationStatus::Expired, now)?;
            let Some(finished) =
                ReservationRepository::finish(&mut *tx, &reservation.id, reservation.status, now).await?
            else {
                continue;
            };
            credit_back(&mut *tx, &finished, Some(EXPIRED_NOTE), None, now).await?;
            expired.push(finished);
        }

        tx.commit().await?;

        if !expired.is_empty() {
            info!(count = expired.len(), "Reservations expired");
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::engine::test_support::*;
    use stockroom_core::{ErrorKind, MovementType, ReservationStatus};
    use stockroom_core::requests::ReleaseReservation;

    #[tokio::test]
    async fn test_expired_reservation_is_swept() {
        let db = db().await;
        stock_up(&db, "SIZE-M", "WH", 20).await;

        let now = chrono::Utc::now();
        let mut req = on_hand_req("o-1", "l-1", "SIZE-M", "WH", 8);
        req.expires_at = Some(now + Duration::minutes(15));
        let rsv = db.reservations().reserve_on_hand(&req).await.unwrap();

        // Not yet due: still counts as reserved
        let swept = db.reservations().expire_due(now).await.unwrap();
        assert!(swept.is_empty());
        let ats = db.availability().ats("SIZE-M", "WH").await.unwrap();
        assert_eq!(ats.ats, 12);

        let swept = db
            .reservations()
            .expire_due(now + Duration::minutes(16))
            .await
            .unwrap();
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].id, rsv.id);
        assert_eq!(swept[0].status, ReservationStatus::Expired);

        let record = db.stock().get("SIZE-M", "WH").await.unwrap().unwrap();
        assert_eq!(record.reserved_on_hand, 0);

        let latest = db.ledger().for_stock("SIZE-M", "WH", 1).await.unwrap();
        assert_eq!(latest[0].movement_type, MovementType::OrderDeallocate);
        assert_eq!(latest[0].note.as_deref(), Some("expired"));
    }

    #[tokio::test]
    async fn test_sweep_skips_finished_and_unexpiring() {
        let db = db().await;
        stock_up(&db, "SIZE-M", "WH", 20).await;
        let now = chrono::Utc::now();

        let forever = db
            .reservations()
            .reserve_on_hand(&on_hand_req("o-1", "l-1", "SIZE-M", "WH", 2))
            .await
            .unwrap();

        let mut req = on_hand_req("o-2", "l-1", "SIZE-M", "WH", 3);
        req.expires_at = Some(now + Duration::seconds(30));
        let released = db.reservations().reserve_on_hand(&req).await.unwrap();
        db.reservations()
            .release(&ReleaseReservation {
                reservation_id: released.id.clone(),
                reason: None,
                actor: None,
            })
            .await
            .unwrap();

        let swept = db
            .reservations()
            .expire_due(now + Duration::hours(1))
            .await
            .unwrap();
        assert!(swept.is_empty());

        let still = db.reservations().get(&forever.id).await.unwrap();
        assert_eq!(still.status, ReservationStatus::Active);
        let record = db.stock().get("SIZE-M", "WH").await.unwrap().unwrap();
        assert_eq!(record.reserved_on_hand, 2);
    }

    #[tokio::test]
    async fn test_expired_incoming_credits_reserved_incoming() {
        let db = db().await;
        place_supply(&db, "SIZE-M", "WH", 40, day(10)).await;
        let now = chrono::Utc::now();

        let mut req = incoming_req("o-1", "l-1", "SIZE-M", "WH", 15);
        req.expires_at = Some(now + Duration::minutes(1));
        let rsv = db.reservations().reserve_incoming(&req).await.unwrap();

        db.reservations()
            .expire_due(now + Duration::minutes(2))
            .await
            .unwrap();

        let record = db.stock().get("SIZE-M", "WH").await.unwrap().unwrap();
        assert_eq!(record.incoming, 40);
        assert_eq!(record.reserved_incoming, 0);

        // Expired is terminal
        let err = db
            .reservations()
            .release(&ReleaseReservation {
                reservation_id: rsv.id,
                reason: None,
                actor: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidState));
    }
}
