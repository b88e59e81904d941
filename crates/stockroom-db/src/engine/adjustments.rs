//! # Stock Adjustments
//!
//! Direct on-hand corrections that are not driven by an order or a
//! purchase order: stock-takes, damage write-offs, customer returns, and
//! the safety-stock buffer.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::reject;
use crate::error::DbResult;
use crate::repository::ledger::{LedgerDraft, LedgerRepository};
use crate::repository::stock::StockRepository;
use stockroom_core::requests::{AdjustOnHand, ReturnToStock, SetSafetyStock};
use stockroom_core::{MovementType, ReferenceType, StockDelta, StockRecord};

/// Manual stock maintenance.
#[derive(Debug, Clone)]
pub struct StockAdjustments {
    pool: SqlitePool,
}

impl StockAdjustments {
    pub fn new(pool: SqlitePool) -> Self {
        StockAdjustments { pool }
    }

    /// Applies a signed on-hand correction.
    ///
    /// A negative delta may not take on-hand below what is reserved there;
    /// that fails with `INVALID_STATE` and changes nothing.
    pub async fn adjust_on_hand(&self, req: &AdjustOnHand) -> DbResult<StockRecord> {
        req.validate()?;
        let now = Utc::now();

        debug!(
            unit_id = %req.unit_id,
            location_id = %req.location_id,
            delta = req.delta,
            "Adjusting on-hand"
        );

        let mut tx = self.pool.begin().await?;

        let record =
            StockRepository::get_or_create(&mut *tx, &req.unit_id, &req.location_id, now).await?;
        if let Err(err) = record.apply(&StockDelta::on_hand(req.delta)) {
            return Err(reject("adjust_on_hand", err));
        }
        let updated =
            StockRepository::apply(&mut *tx, &record, StockDelta::on_hand(req.delta), now).await?;

        let draft = LedgerDraft::new(
            &req.unit_id,
            &req.location_id,
            MovementType::ManualAdjustment,
            req.delta,
        )
        .note(req.note.as_deref())
        .actor(req.actor.as_deref());
        LedgerRepository::append(&mut *tx, draft, now).await?;

        tx.commit().await?;

        info!(
            unit_id = %updated.unit_id,
            location_id = %updated.location_id,
            delta = req.delta,
            on_hand = updated.on_hand,
            "On-hand adjusted"
        );
        Ok(updated)
    }

    /// Sets the safety-stock buffer. Quantities are untouched; the ledger
    /// gets a zero-delta entry noting the old and new buffer.
    ///
    /// A buffer above on-hand is accepted; ATS then reads zero.
    pub async fn set_safety_stock(&self, req: &SetSafetyStock) -> DbResult<StockRecord> {
        req.validate()?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let record =
            StockRepository::get_or_create(&mut *tx, &req.unit_id, &req.location_id, now).await?;
        let updated = StockRepository::set_safety_stock(
            &mut *tx,
            &req.unit_id,
            &req.location_id,
            req.safety_stock,
            now,
        )
        .await?;

        let note = format!("safety stock {} -> {}", record.safety_stock, req.safety_stock);
        let draft = LedgerDraft::new(&req.unit_id, &req.location_id, MovementType::ManualAdjustment, 0)
            .note(Some(note.as_str()))
            .actor(req.actor.as_deref());
        LedgerRepository::append(&mut *tx, draft, now).await?;

        tx.commit().await?;

        info!(
            unit_id = %updated.unit_id,
            location_id = %updated.location_id,
            safety_stock = updated.safety_stock,
            "Safety stock set"
        );
        Ok(updated)
    }

    /// Puts returned units back on hand.
    pub async fn return_to_stock(&self, req: &ReturnToStock) -> DbResult<StockRecord> {
        req.validate()?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let record =
            StockRepository::get_or_create(&mut *tx, &req.unit_id, &req.location_id, now).await?;
        let updated = StockRepository::apply(&mut *tx, &record, StockDelta::on_hand(req.qty), now).await?;

        let mut draft = LedgerDraft::new(&req.unit_id, &req.location_id, MovementType::Return, req.qty)
            .note(req.note.as_deref())
            .actor(req.actor.as_deref());
        if let Some(order_id) = &req.order_id {
            draft = draft.reference(ReferenceType::Order, order_id);
        }
        LedgerRepository::append(&mut *tx, draft, now).await?;

        tx.commit().await?;

        info!(
            unit_id = %updated.unit_id,
            location_id = %updated.location_id,
            qty = req.qty,
            order_id = ?req.order_id,
            "Return restocked"
        );
        Ok(updated)
    }
}
