//! # Stock Record
//!
//! The per-(unit, location) quantity record and the arithmetic that keeps it
//! consistent.
//!
//! ## Buckets
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       StockRecord (unit, location)                      │
//! │                                                                         │
//! │   onHand ─────────────────────────────────────────────┐                 │
//! │   ├── reservedOnHand   (claimed by active orders)     │ physical        │
//! │   ├── safetyStock      (never sellable)               │                 │
//! │   └── ATS = max(0, onHand - reservedOnHand - safety)  ┘                 │
//! │                                                                         │
//! │   incoming ───────────────────────────────────────────┐                 │
//! │   └── reservedIncoming (pre-claimed forward orders)   ┘ expected        │
//! │                                                                         │
//! │   INVARIANTS (checked on every mutation):                              │
//! │     all fields ≥ 0                                                      │
//! │     reservedOnHand   ≤ onHand                                           │
//! │     reservedIncoming ≤ incoming                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations are expressed as a [`StockDelta`] and applied with
//! [`StockRecord::apply`], which returns the new record or an
//! `INVALID_STATE` error. The storage layer mirrors the same guards in its
//! conditional `UPDATE`s, so a record that violates them is never written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{InventoryError, InventoryResult};

// =============================================================================
// Stock Record
// =============================================================================

/// Physical and reserved quantities for one unit at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    pub unit_id: String,
    pub location_id: String,
    pub on_hand: i64,
    pub reserved_on_hand: i64,
    pub incoming: i64,
    pub reserved_incoming: i64,
    pub safety_stock: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl StockRecord {
    /// A zeroed record, as created on first reference.
    pub fn empty(unit_id: impl Into<String>, location_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        StockRecord {
            unit_id: unit_id.into(),
            location_id: location_id.into(),
            on_hand: 0,
            reserved_on_hand: 0,
            incoming: 0,
            reserved_incoming: 0,
            safety_stock: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Available-to-sell: `max(0, onHand - reservedOnHand - safetyStock)`.
    #[inline]
    pub fn ats(&self) -> i64 {
        (self.on_hand - self.reserved_on_hand - self.safety_stock).max(0)
    }

    /// Physical units not claimed by any reservation. Transfers and
    /// negative adjustments may take at most this much.
    #[inline]
    pub fn unreserved_on_hand(&self) -> i64 {
        self.on_hand - self.reserved_on_hand
    }

    /// Incoming units not yet pre-claimed.
    #[inline]
    pub fn unreserved_incoming(&self) -> i64 {
        self.incoming - self.reserved_incoming
    }

    /// Verifies every record invariant.
    pub fn check_invariants(&self) -> InventoryResult<()> {
        let fields = [
            ("onHand", self.on_hand),
            ("reservedOnHand", self.reserved_on_hand),
            ("incoming", self.incoming),
            ("reservedIncoming", self.reserved_incoming),
            ("safetyStock", self.safety_stock),
        ];
        for (name, value) in fields {
            if value < 0 {
                return Err(self.violation(format!("{name} would be {value}")));
            }
        }
        if self.reserved_on_hand > self.on_hand {
            return Err(self.violation(format!(
                "reservedOnHand {} would exceed onHand {}",
                self.reserved_on_hand, self.on_hand
            )));
        }
        if self.reserved_incoming > self.incoming {
            return Err(self.violation(format!(
                "reservedIncoming {} would exceed incoming {}",
                self.reserved_incoming, self.incoming
            )));
        }
        Ok(())
    }

    /// Returns the record with `delta` applied, or `INVALID_STATE` if the
    /// result would break an invariant. `self` is left untouched.
    pub fn apply(&self, delta: &StockDelta) -> InventoryResult<StockRecord> {
        let mut next = self.clone();
        next.on_hand = checked(self.on_hand, delta.on_hand)?;
        next.reserved_on_hand = checked(self.reserved_on_hand, delta.reserved_on_hand)?;
        next.incoming = checked(self.incoming, delta.incoming)?;
        next.reserved_incoming = checked(self.reserved_incoming, delta.reserved_incoming)?;
        next.check_invariants()?;
        Ok(next)
    }

    fn violation(&self, detail: String) -> InventoryError {
        InventoryError::invalid_state(format!(
            "stock record {}@{}: {}",
            self.unit_id, self.location_id, detail
        ))
    }
}

fn checked(value: i64, delta: i64) -> InventoryResult<i64> {
    value
        .checked_add(delta)
        .ok_or_else(|| InventoryError::invalid_state("quantity overflow"))
}

// =============================================================================
// Stock Delta
// =============================================================================

/// Signed change to the four quantity buckets of a record.
///
/// `safetyStock` is set, never shifted, so it has no delta.
///
/// ```rust
/// use stockroom_core::stock::StockDelta;
///
/// // Receipt: +100 on hand, -100 incoming
/// let delta = StockDelta::on_hand(100).with_incoming(-100);
/// assert_eq!(delta.on_hand, 100);
/// assert_eq!(delta.incoming, -100);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockDelta {
    pub on_hand: i64,
    pub reserved_on_hand: i64,
    pub incoming: i64,
    pub reserved_incoming: i64,
}

impl StockDelta {
    pub const fn on_hand(qty: i64) -> Self {
        StockDelta { on_hand: qty, reserved_on_hand: 0, incoming: 0, reserved_incoming: 0 }
    }

    pub const fn reserved_on_hand(qty: i64) -> Self {
        StockDelta { on_hand: 0, reserved_on_hand: qty, incoming: 0, reserved_incoming: 0 }
    }

    pub const fn incoming(qty: i64) -> Self {
        StockDelta { on_hand: 0, reserved_on_hand: 0, incoming: qty, reserved_incoming: 0 }
    }

    pub const fn reserved_incoming(qty: i64) -> Self {
        StockDelta { on_hand: 0, reserved_on_hand: 0, incoming: 0, reserved_incoming: qty }
    }

    pub const fn with_on_hand(mut self, qty: i64) -> Self {
        self.on_hand = qty;
        self
    }

    pub const fn with_reserved_on_hand(mut self, qty: i64) -> Self {
        self.reserved_on_hand = qty;
        self
    }

    pub const fn with_incoming(mut self, qty: i64) -> Self {
        self.incoming = qty;
        self
    }

    pub const fn with_reserved_incoming(mut self, qty: i64) -> Self {
        self.reserved_incoming = qty;
        self
    }

    pub const fn is_zero(&self) -> bool {
        self.on_hand == 0
            && self.reserved_on_hand == 0
            && self.incoming == 0
            && self.reserved_incoming == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(on_hand: i64, reserved: i64, safety: i64) -> StockRecord {
        let mut rec = StockRecord::empty("SIZE-M", "WH-UK-01", Utc::now());
        rec.on_hand = on_hand;
        rec.reserved_on_hand = reserved;
        rec.safety_stock = safety;
        rec
    }

    #[test]
    fn test_ats_subtracts_reserved_and_safety() {
        assert_eq!(record(100, 0, 10).ats(), 90);
        assert_eq!(record(100, 50, 10).ats(), 40);
    }

    #[test]
    fn test_ats_floors_at_zero() {
        assert_eq!(record(5, 0, 10).ats(), 0);
        assert_eq!(record(10, 10, 1).ats(), 0);
    }

    #[test]
    fn test_apply_rejects_reserving_past_on_hand() {
        let rec = record(10, 8, 0);
        let err = rec.apply(&StockDelta::reserved_on_hand(3)).unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
        assert!(err.to_string().contains("reservedOnHand 11 would exceed onHand 10"));
    }

    #[test]
    fn test_apply_rejects_negative_buckets() {
        let rec = record(10, 0, 0);
        assert!(rec.apply(&StockDelta::on_hand(-11)).is_err());
        assert!(rec.apply(&StockDelta::incoming(-1)).is_err());
    }

    #[test]
    fn test_apply_pick_consumes_both_buckets() {
        let rec = record(100, 50, 10);
        let next = rec
            .apply(&StockDelta::on_hand(-50).with_reserved_on_hand(-50))
            .unwrap();
        assert_eq!(next.on_hand, 50);
        assert_eq!(next.reserved_on_hand, 0);
        // Original untouched
        assert_eq!(rec.on_hand, 100);
    }

    #[test]
    fn test_delta_is_zero() {
        assert!(StockDelta::default().is_zero());
        assert!(!StockDelta::incoming(1).is_zero());
    }

    proptest! {
        /// Whatever sequence of deltas is attempted, every accepted result
        /// satisfies the invariants.
        #[test]
        fn prop_apply_preserves_invariants(
            deltas in prop::collection::vec(
                (-50i64..50, -50i64..50, -50i64..50, -50i64..50),
                0..40,
            )
        ) {
            let mut rec = StockRecord::empty("u", "l", Utc::now());
            for (a, b, c, d) in deltas {
                let delta = StockDelta::on_hand(a)
                    .with_reserved_on_hand(b)
                    .with_incoming(c)
                    .with_reserved_incoming(d);
                if let Ok(next) = rec.apply(&delta) {
                    rec = next;
                }
                prop_assert!(rec.check_invariants().is_ok());
                prop_assert!(rec.reserved_on_hand <= rec.on_hand);
                prop_assert!(rec.reserved_incoming <= rec.incoming);
            }
        }

        /// ATS is never negative and never exceeds unreserved on-hand.
        #[test]
        fn prop_ats_bounds(on_hand in 0i64..1000, reserved in 0i64..1000, safety in 0i64..100) {
            prop_assume!(reserved <= on_hand);
            let rec = record(on_hand, reserved, safety);
            prop_assert!(rec.ats() >= 0);
            prop_assert!(rec.ats() <= rec.unreserved_on_hand());
        }

        /// Reserving then releasing the same quantity restores the record.
        #[test]
        fn prop_reserve_release_round_trip(on_hand in 0i64..500, qty in 1i64..500) {
            let rec = record(on_hand, 0, 0);
            if let Ok(reserved) = rec.apply(&StockDelta::reserved_on_hand(qty)) {
                let released = reserved.apply(&StockDelta::reserved_on_hand(-qty)).unwrap();
                prop_assert_eq!(released.reserved_on_hand, rec.reserved_on_hand);
                prop_assert_eq!(released.on_hand, rec.on_hand);
            } else {
                prop_assert!(qty > on_hand);
            }
        }
    }
}
