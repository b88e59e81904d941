//! # Requests
//!
//! Input payloads for every mutating engine operation. Each carries a
//! `validate()` that runs before any storage access, so a structurally bad
//! request fails with `BAD_INPUT` without opening a transaction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{InventoryError, InventoryResult};
use crate::types::{Address, LocationKind};
use crate::validation::{
    validate_delta, validate_id, validate_location_code, validate_name, validate_note,
    validate_quantity, validate_safety_stock,
};

// =============================================================================
// Reservations
// =============================================================================

/// Reserve physical stock for an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReserveOnHand {
    pub order_id: String,
    pub order_line_id: String,
    pub unit_id: String,
    pub location_id: String,
    pub qty: i64,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actor: Option<String>,
}

impl ReserveOnHand {
    pub fn validate(&self) -> InventoryResult<()> {
        validate_order_line(&self.order_id, &self.order_line_id)?;
        validate_id("unitId", &self.unit_id)?;
        validate_id("locationId", &self.location_id)?;
        validate_quantity("qty", self.qty)?;
        Ok(())
    }
}

/// Reserve forward stock from the earliest open supply line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReserveIncoming {
    pub order_id: String,
    pub order_line_id: String,
    pub unit_id: String,
    /// Location whose `reservedIncoming` is charged.
    pub location_id: String,
    pub qty: i64,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actor: Option<String>,
}

impl ReserveIncoming {
    pub fn validate(&self) -> InventoryResult<()> {
        validate_order_line(&self.order_id, &self.order_line_id)?;
        validate_id("unitId", &self.unit_id)?;
        validate_id("locationId", &self.location_id)?;
        validate_quantity("qty", self.qty)?;
        Ok(())
    }
}

/// Release an active reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseReservation {
    pub reservation_id: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

impl ReleaseReservation {
    pub fn validate(&self) -> InventoryResult<()> {
        validate_id("reservationId", &self.reservation_id)?;
        validate_note(self.reason.as_deref())?;
        Ok(())
    }
}

/// Consume the active on-hand reservations of an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PickRequest {
    pub order_id: String,
    pub order_line_id: String,
    /// Restrict the pick to one location.
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

impl PickRequest {
    pub fn validate(&self) -> InventoryResult<()> {
        validate_order_line(&self.order_id, &self.order_line_id)?;
        if let Some(location_id) = &self.location_id {
            validate_id("locationId", location_id)?;
        }
        validate_note(self.note.as_deref())?;
        Ok(())
    }
}

// =============================================================================
// Receiving
// =============================================================================

/// One physical receipt against a supply line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub line_id: String,
    pub location_id: String,
    pub qty: i64,
}

/// A batch of receipts applied all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveBatch {
    pub receipts: Vec<Receipt>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

impl ReceiveBatch {
    pub fn validate(&self) -> InventoryResult<()> {
        if self.receipts.is_empty() {
            return Err(InventoryError::bad_input("receipts must not be empty"));
        }
        for receipt in &self.receipts {
            validate_id("lineId", &receipt.line_id)?;
            validate_id("locationId", &receipt.location_id)?;
            validate_quantity("qty", receipt.qty)?;
        }
        validate_note(self.note.as_deref())?;
        Ok(())
    }
}

// =============================================================================
// Stock Movements
// =============================================================================

/// Move physical stock between two locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub unit_id: String,
    pub from_location_id: String,
    pub to_location_id: String,
    pub qty: i64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

impl TransferRequest {
    pub fn validate(&self) -> InventoryResult<()> {
        validate_id("unitId", &self.unit_id)?;
        validate_id("fromLocationId", &self.from_location_id)?;
        validate_id("toLocationId", &self.to_location_id)?;
        if self.from_location_id == self.to_location_id {
            return Err(InventoryError::bad_input(
                "source and destination locations must differ",
            ));
        }
        validate_quantity("qty", self.qty)?;
        validate_note(self.note.as_deref())?;
        Ok(())
    }
}

/// Signed on-hand correction (stock-take, damage, found stock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AdjustOnHand {
    pub unit_id: String,
    pub location_id: String,
    pub delta: i64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

impl AdjustOnHand {
    pub fn validate(&self) -> InventoryResult<()> {
        validate_id("unitId", &self.unit_id)?;
        validate_id("locationId", &self.location_id)?;
        validate_delta(self.delta)?;
        validate_note(self.note.as_deref())?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SetSafetyStock {
    pub unit_id: String,
    pub location_id: String,
    pub safety_stock: i64,
    #[serde(default)]
    pub actor: Option<String>,
}

impl SetSafetyStock {
    pub fn validate(&self) -> InventoryResult<()> {
        validate_id("unitId", &self.unit_id)?;
        validate_id("locationId", &self.location_id)?;
        validate_safety_stock(self.safety_stock)?;
        Ok(())
    }
}

/// Customer return put back into sellable stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnToStock {
    pub unit_id: String,
    pub location_id: String,
    pub qty: i64,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

impl ReturnToStock {
    pub fn validate(&self) -> InventoryResult<()> {
        validate_id("unitId", &self.unit_id)?;
        validate_id("locationId", &self.location_id)?;
        validate_quantity("qty", self.qty)?;
        if let Some(order_id) = &self.order_id {
            validate_id("orderId", order_id)?;
        }
        validate_note(self.note.as_deref())?;
        Ok(())
    }
}

// =============================================================================
// Locations & Purchasing
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewLocation {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub kind: LocationKind,
    #[serde(default)]
    pub address: Address,
}

impl NewLocation {
    pub fn validate(&self) -> InventoryResult<()> {
        validate_location_code(&self.code)?;
        validate_name(&self.name)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewPurchaseOrder {
    #[serde(default)]
    pub supplier_ref: Option<String>,
}

impl NewPurchaseOrder {
    pub fn validate(&self) -> InventoryResult<()> {
        if let Some(supplier_ref) = &self.supplier_ref {
            validate_id("supplierRef", supplier_ref)?;
        }
        Ok(())
    }
}

/// A line placed on a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewSupplyLine {
    pub unit_id: String,
    /// Destination whose `incoming` is bumped.
    pub location_id: String,
    pub qty: i64,
    #[ts(as = "String")]
    pub eta: NaiveDate,
    #[serde(default)]
    pub actor: Option<String>,
}

impl NewSupplyLine {
    pub fn validate(&self) -> InventoryResult<()> {
        validate_id("unitId", &self.unit_id)?;
        validate_id("locationId", &self.location_id)?;
        validate_quantity("qty", self.qty)?;
        Ok(())
    }
}

fn validate_order_line(order_id: &str, order_line_id: &str) -> InventoryResult<()> {
    validate_id("orderId", order_id)?;
    validate_id("orderLineId", order_line_id)?;
    Ok(())
}
