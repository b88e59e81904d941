//! Inter-location transfers.
//!
//! A transfer moves unreserved physical stock: reserved units stay where
//! their reservation points. Both sides land in one transaction with a
//! paired TRANSFER_OUT / TRANSFER_IN sharing one transfer id.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use super::reject;
use crate::error::DbResult;
use crate::repository::ledger::{LedgerDraft, LedgerRepository};
use crate::repository::stock::StockRepository;
use stockroom_core::requests::TransferRequest;
use stockroom_core::{InventoryError, MovementType, ReferenceType, StockDelta, TransferOutcome};

/// Transfer service.
#[derive(Debug, Clone)]
pub struct TransferEngine {
    pool: SqlitePool,
}

impl TransferEngine {
    pub fn new(pool: SqlitePool) -> Self {
        TransferEngine { pool }
    }

    /// Moves `qty` on-hand units from one location to another.
    ///
    /// Fails with `INSUFFICIENT_STOCK` when the source's unreserved on-hand
    /// (`onHand - reservedOnHand`) is below `qty`.
    pub async fn transfer(&self, req: &TransferRequest) -> DbResult<TransferOutcome> {
        req.validate()?;
        let now = Utc::now();
        let transfer_id = Uuid::new_v4().to_string();

        debug!(
            %transfer_id,
            unit_id = %req.unit_id,
            from = %req.from_location_id,
            to = %req.to_location_id,
            qty = req.qty,
            "Transferring stock"
        );

        let mut tx = self.pool.begin().await?;

        let source =
            StockRepository::get_or_create(&mut *tx, &req.unit_id, &req.from_location_id, now).await?;
        let movable = source.unreserved_on_hand();
        if req.qty > movable {
            return Err(reject(
                "transfer",
                InventoryError::InsufficientStock {
                    unit_id: req.unit_id.clone(),
                    location_id: req.from_location_id.clone(),
                    available: movable.max(0),
                    requested: req.qty,
                },
            ));
        }
        let destination =
            StockRepository::get_or_create(&mut *tx, &req.unit_id, &req.to_location_id, now).await?;

        let from = StockRepository::apply(&mut *tx, &source, StockDelta::on_hand(-req.qty), now).await?;
        let to = StockRepository::apply(&mut *tx, &destination, StockDelta::on_hand(req.qty), now).await?;

        let out = LedgerDraft::new(
            &req.unit_id,
            &req.from_location_id,
            MovementType::TransferOut,
            -req.qty,
        )
        .reference(ReferenceType::Transfer, &transfer_id)
        .note(req.note.as_deref())
        .actor(req.actor.as_deref());
        LedgerRepository::append(&mut *tx, out, now).await?;

        let inbound = LedgerDraft::new(
            &req.unit_id,
            &req.to_location_id,
            MovementType::TransferIn,
            req.qty,
        )
        .reference(ReferenceType::Transfer, &transfer_id)
        .note(req.note.as_deref())
        .actor(req.actor.as_deref());
        LedgerRepository::append(&mut *tx, inbound, now).await?;

        tx.commit().await?;

        info!(
            %transfer_id,
            unit_id = %req.unit_id,
            from = %req.from_location_id,
            to = %req.to_location_id,
            qty = req.qty,
            "Transfer completed"
        );
        Ok(TransferOutcome { transfer_id, from, to })
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::test_support::*;
    use stockroom_core::requests::TransferRequest;
    use stockroom_core::{ErrorKind, MovementType, ReferenceType};

    fn transfer(from: &str, to: &str, qty: i64) -> TransferRequest {
        TransferRequest {
            unit_id: "SIZE-M".to_string(),
            from_location_id: from.to_string(),
            to_location_id: to.to_string(),
            qty,
            note: Some("rebalance".to_string()),
            actor: Some("ops".to_string()),
        }
    }

    #[tokio::test]
    async fn test_transfer_moves_stock() {
        // WH-A: onHand 30, STORE-B: onHand 0
        let db = db().await;
        stock_up(&db, "SIZE-M", "WH-A", 30).await;

        let outcome = db.transfers().transfer(&transfer("WH-A", "STORE-B", 10)).await.unwrap();
        assert_eq!(outcome.from.on_hand, 20);
        assert_eq!(outcome.to.on_hand, 10);

        let entries = db.ledger().for_reference(&outcome.transfer_id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].movement_type, MovementType::TransferOut);
        assert_eq!(entries[0].delta, -10);
        assert_eq!(entries[0].location_id, "WH-A");
        assert_eq!(entries[1].movement_type, MovementType::TransferIn);
        assert_eq!(entries[1].delta, 10);
        assert_eq!(entries[1].location_id, "STORE-B");
        assert!(entries.iter().all(|e| e.reference_type == Some(ReferenceType::Transfer)));
    }

    #[tokio::test]
    async fn test_transfer_leaves_reserved_stock() {
        let db = db().await;
        stock_up(&db, "SIZE-M", "WH-A", 30).await;
        db.reservations()
            .reserve_on_hand(&on_hand_req("o-1", "l-1", "SIZE-M", "WH-A", 25))
            .await
            .unwrap();

        let err = db
            .transfers()
            .transfer(&transfer("WH-A", "STORE-B", 6))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InsufficientStock));

        // Nothing moved, and no destination record was left behind
        let source = db.stock().get("SIZE-M", "WH-A").await.unwrap().unwrap();
        assert_eq!(source.on_hand, 30);
        assert!(db.stock().get("SIZE-M", "STORE-B").await.unwrap().is_none());

        db.transfers().transfer(&transfer("WH-A", "STORE-B", 5)).await.unwrap();
    }

    #[tokio::test]
    async fn test_transfer_to_same_location_rejected() {
        let db = db().await;
        stock_up(&db, "SIZE-M", "WH-A", 30).await;
        let err = db
            .transfers()
            .transfer(&transfer("WH-A", "WH-A", 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::BadInput));
    }
}
