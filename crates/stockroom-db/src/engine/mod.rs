//! # Inventory Engine
//!
//! Transactional services built on the repositories. Each public mutating
//! method is one unit of work.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      One Engine Operation                               │
//! │                                                                         │
//! │  request.validate()          ← BAD_INPUT before any I/O                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pool.begin()                                                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  StockRepository::get_or_create   (takes the write lock)        │   │
//! │  │  business checks (ATS, line capacity, state)                    │   │
//! │  │  StockRepository::apply           (guarded UPDATE)              │   │
//! │  │  ReservationRepository / SupplyRepository writes                │   │
//! │  │  LedgerRepository::append         (one per quantity change)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ├── Ok  → tx.commit()                                            │
//! │       └── Err → tx dropped → ROLLBACK (nothing persists)               │
//! │                                                                         │
//! │  DbError::Conflict is returned as-is; callers decide whether to retry. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Services
//!
//! - [`ReservationManager`] - reserve on-hand / incoming, release, pick, expire
//! - [`AvailabilityCalculator`] - ATS per location, ATP by date
//! - [`Receiving`] - purchase-order receipts and reservation promotion
//! - [`TransferEngine`] - inter-location moves
//! - [`StockAdjustments`] - manual adjustments, safety stock, returns
//! - [`Purchasing`] - purchase orders and supply lines
//! - [`Reconciler`] - ledger replay against stored records

use tracing::warn;

use crate::error::DbError;
use stockroom_core::InventoryError;

pub mod adjustments;
pub mod availability;
pub mod expiry;
pub mod purchasing;
pub mod receiving;
pub mod reconcile;
pub mod reservations;
pub mod transfer;

pub use adjustments::StockAdjustments;
pub use availability::AvailabilityCalculator;
pub use purchasing::Purchasing;
pub use receiving::Receiving;
pub use reconcile::Reconciler;
pub use reservations::ReservationManager;
pub use transfer::TransferEngine;

/// Logs a business-rule rejection and wraps it.
pub(crate) fn reject(operation: &'static str, err: InventoryError) -> DbError {
    warn!(operation, code = err.code(), error = %err, "Operation rejected");
    DbError::Inventory(err)
}

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;

    use crate::pool::{Database, DbConfig};
    use stockroom_core::requests::{
        AdjustOnHand, NewPurchaseOrder, NewSupplyLine, ReserveIncoming, ReserveOnHand,
        SetSafetyStock,
    };
    use stockroom_core::SupplyLine;

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, d).unwrap()
    }

    /// Puts `qty` on hand via a manual adjustment.
    pub async fn stock_up(db: &Database, unit: &str, location: &str, qty: i64) {
        db.adjustments()
            .adjust_on_hand(&AdjustOnHand {
                unit_id: unit.to_string(),
                location_id: location.to_string(),
                delta: qty,
                note: Some("opening count".to_string()),
                actor: Some("test".to_string()),
            })
            .await
            .unwrap();
    }

    pub async fn safety(db: &Database, unit: &str, location: &str, qty: i64) {
        db.adjustments()
            .set_safety_stock(&SetSafetyStock {
                unit_id: unit.to_string(),
                location_id: location.to_string(),
                safety_stock: qty,
                actor: None,
            })
            .await
            .unwrap();
    }

    /// Places a one-line purchase order and returns the line.
    pub async fn place_supply(
        db: &Database,
        unit: &str,
        location: &str,
        qty: i64,
        eta: NaiveDate,
    ) -> SupplyLine {
        let order = db
            .purchasing()
            .create_order(&NewPurchaseOrder {
                supplier_ref: Some("ACME".to_string()),
            })
            .await
            .unwrap();
        db.purchasing()
            .add_line(
                &order.id,
                &NewSupplyLine {
                    unit_id: unit.to_string(),
                    location_id: location.to_string(),
                    qty,
                    eta,
                    actor: None,
                },
            )
            .await
            .unwrap()
    }

    pub fn on_hand_req(order: &str, line: &str, unit: &str, location: &str, qty: i64) -> ReserveOnHand {
        ReserveOnHand {
            order_id: order.to_string(),
            order_line_id: line.to_string(),
            unit_id: unit.to_string(),
            location_id: location.to_string(),
            qty,
            expires_at: None,
            actor: Some("checkout".to_string()),
        }
    }

    pub fn incoming_req(order: &str, line: &str, unit: &str, location: &str, qty: i64) -> ReserveIncoming {
        ReserveIncoming {
            order_id: order.to_string(),
            order_line_id: line.to_string(),
            unit_id: unit.to_string(),
            location_id: location.to_string(),
            qty,
            expires_at: None,
            actor: Some("checkout".to_string()),
        }
    }
}
