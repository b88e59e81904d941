//! # Domain Types
//!
//! Core domain types used throughout Stockroom.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   StockRecord   │   │   Reservation   │   │   LedgerEntry   │       │
//! │  │  (stock.rs)     │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  unit+location  │   │  order line     │   │  movement type  │       │
//! │  │  onHand ...     │   │  kind / status  │   │  signed delta   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Location     │   │  PurchaseOrder  │   │   SupplyLine    │       │
//! │  │  code, kind     │   │  status         │   │  qty, eta,      │       │
//! │  │  address        │   │                 │   │  receivedQty    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Units, orders and order lines are owned by external collaborators, so
//! their ids are opaque strings passed through verbatim. Everything this
//! engine creates (reservations, ledger entries, purchase orders, supply
//! lines, locations) gets a UUID v4.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{InventoryError, InventoryResult};
use crate::stock::StockRecord;

// =============================================================================
// Location
// =============================================================================

/// What sort of place a location is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Warehouse,
    Store,
    Dropship,
}

impl Default for LocationKind {
    fn default() -> Self {
        LocationKind::Warehouse
    }
}

/// Postal address of a location. Every part is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub line1: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// A warehouse, store or dropship endpoint holding stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    /// Business identifier, e.g. `WH-UK-01`. Unique.
    pub code: String,
    pub name: String,
    pub kind: LocationKind,
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub address: Address,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Reservation
// =============================================================================

/// Which bucket a reservation claims against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationKind {
    /// Claims physical stock (`reservedOnHand`).
    OnHand,
    /// Claims expected stock on a purchase-order line (`reservedIncoming`).
    Incoming,
}

/// Reservation lifecycle.
///
/// ```text
///            ┌──► RELEASED  (cancelled before consumption)
///            │
///  ACTIVE ───┼──► CONSUMED  (picked / shipped)
///            │
///            └──► EXPIRED   (expiry sweep)
/// ```
/// All three outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Active,
    Released,
    Consumed,
    Expired,
}

impl Default for ReservationStatus {
    fn default() -> Self {
        ReservationStatus::Active
    }
}

impl ReservationStatus {
    /// True once the reservation can no longer change.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::Active)
    }

    /// Checks whether the lifecycle allows moving to `next`.
    pub const fn can_transition_to(&self, next: ReservationStatus) -> bool {
        !self.is_terminal() && next.is_terminal()
    }

    /// Returns the stored representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Active => "ACTIVE",
            ReservationStatus::Released => "RELEASED",
            ReservationStatus::Consumed => "CONSUMED",
            ReservationStatus::Expired => "EXPIRED",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A claim against on-hand or incoming stock for one order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    pub order_id: String,
    pub order_line_id: String,
    pub unit_id: String,
    pub location_id: String,
    pub qty: i64,
    pub kind: ReservationKind,
    /// Supply line claimed, when `kind == Incoming`.
    pub source_line_id: Option<String>,
    /// ETA of the source line at reservation time.
    #[ts(as = "Option<String>")]
    pub expected_by: Option<NaiveDate>,
    pub status: ReservationStatus,
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Moves the reservation to `next`, enforcing the lifecycle.
    pub fn transition(&mut self, next: ReservationStatus, now: DateTime<Utc>) -> InventoryResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(InventoryError::invalid_state(format!(
                "reservation {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// True when an expiry is set and has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Active
            && self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

// =============================================================================
// Audit Ledger
// =============================================================================

/// Kind of quantity movement recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    ManualAdjustment,
    PurchaseReceipt,
    OrderAllocate,
    OrderDeallocate,
    Pick,
    Ship,
    Return,
    TransferOut,
    TransferIn,
    /// Supply placed on order; documents an `incoming` increment.
    PurchaseOrdered,
}

impl MovementType {
    /// Movement types whose delta changes `onHand`.
    pub const ON_HAND: [MovementType; 7] = [
        MovementType::ManualAdjustment,
        MovementType::PurchaseReceipt,
        MovementType::Pick,
        MovementType::Ship,
        MovementType::Return,
        MovementType::TransferOut,
        MovementType::TransferIn,
    ];

    /// True when the delta of this movement is a physical on-hand change.
    pub fn affects_on_hand(&self) -> bool {
        Self::ON_HAND.contains(self)
    }

    /// Returns the stored representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementType::ManualAdjustment => "MANUAL_ADJUSTMENT",
            MovementType::PurchaseReceipt => "PURCHASE_RECEIPT",
            MovementType::OrderAllocate => "ORDER_ALLOCATE",
            MovementType::OrderDeallocate => "ORDER_DEALLOCATE",
            MovementType::Pick => "PICK",
            MovementType::Ship => "SHIP",
            MovementType::Return => "RETURN",
            MovementType::TransferOut => "TRANSFER_OUT",
            MovementType::TransferIn => "TRANSFER_IN",
            MovementType::PurchaseOrdered => "PURCHASE_ORDERED",
        }
    }
}

/// What an external reference on a ledger entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Order,
    PurchaseOrder,
    Transfer,
}

/// An immutable fact: one signed quantity change at one (unit, location).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: String,
    pub unit_id: String,
    pub location_id: String,
    pub movement_type: MovementType,
    /// Signed: `+` in, `-` out.
    pub delta: i64,
    pub reference_type: Option<ReferenceType>,
    pub reference_id: Option<String>,
    pub note: Option<String>,
    pub actor: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Purchasing
// =============================================================================

/// Purchase order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    /// Placed, nothing received yet.
    Open,
    /// Some lines partially or fully received.
    Partial,
    /// Every line fully received.
    Closed,
    Cancelled,
}

impl Default for PurchaseOrderStatus {
    fn default() -> Self {
        PurchaseOrderStatus::Open
    }
}

impl PurchaseOrderStatus {
    /// True while the order still expects supply.
    pub const fn is_open(&self) -> bool {
        matches!(self, PurchaseOrderStatus::Open | PurchaseOrderStatus::Partial)
    }
}

/// A purchase order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    pub id: String,
    pub supplier_ref: Option<String>,
    pub status: PurchaseOrderStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// One line of an open purchase order: expected future stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SupplyLine {
    pub id: String,
    pub purchase_order_id: String,
    pub unit_id: String,
    /// Destination whose `incoming` was bumped when the line was placed.
    pub location_id: String,
    pub qty: i64,
    #[ts(as = "String")]
    pub eta: NaiveDate,
    /// Cumulative received quantity. Never exceeds `qty`.
    pub received_qty: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl SupplyLine {
    /// Quantity still expected on this line.
    #[inline]
    pub fn remaining(&self) -> i64 {
        self.qty - self.received_qty
    }

    #[inline]
    pub fn is_fully_received(&self) -> bool {
        self.received_qty >= self.qty
    }
}

/// A purchase order together with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderDetail {
    pub order: PurchaseOrder,
    pub lines: Vec<SupplyLine>,
}

// =============================================================================
// Operation Outcomes
// =============================================================================

/// ATS at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LocationAvailability {
    pub location_id: String,
    pub ats: i64,
}

/// Available-to-promise breakdown for a unit by a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AvailableToPromise {
    pub unit_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    /// Summed ATS across all locations.
    pub ats_now: i64,
    /// Unreceived supply with ETA on or before `date`.
    pub incoming_by_date: i64,
    /// Summed `reservedIncoming` across all locations.
    pub reserved_incoming: i64,
    /// `ats_now + incoming_by_date - reserved_incoming`. May be negative.
    pub atp: i64,
}

/// One (unit, location) group consumed by a pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PickedGroup {
    pub unit_id: String,
    pub location_id: String,
    pub qty: i64,
    pub reservation_ids: Vec<String>,
}

/// Result of picking an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PickOutcome {
    pub order_id: String,
    pub order_line_id: String,
    pub groups: Vec<PickedGroup>,
}

impl PickOutcome {
    /// Total units consumed across groups.
    pub fn total_qty(&self) -> i64 {
        self.groups.iter().map(|g| g.qty).sum()
    }
}

/// Result of applying one receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptOutcome {
    pub line_id: String,
    pub location_id: String,
    pub received_qty: i64,
    /// How much `incoming` actually went down at the location.
    pub incoming_decrement: i64,
    /// Units of INCOMING reservations moved to ON_HAND.
    pub promoted_qty: i64,
    /// Reservations now ON_HAND because of this receipt (including splits).
    pub promoted_reservation_ids: Vec<String>,
}

/// Result of a receiving batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveOutcome {
    pub receipts: Vec<ReceiptOutcome>,
}

/// Both sides of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    /// Shared reference on the paired ledger entries.
    pub transfer_id: String,
    pub from: StockRecord,
    pub to: StockRecord,
}

/// Ledger replay compared with the stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub unit_id: String,
    pub location_id: String,
    pub recorded_on_hand: i64,
    pub ledger_on_hand: i64,
    /// `recorded_on_hand - ledger_on_hand`; zero when consistent.
    pub drift: i64,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.drift == 0
    }
}
