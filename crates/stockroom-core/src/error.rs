//! # Error Types
//!
//! Domain-specific error types for stockroom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockroom-core errors (this file)                                     │
//! │  ├── InventoryError   - Typed business-rule failures                   │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockroom-db errors (separate crate)                                  │
//! │  └── DbError          - Storage failures + write conflicts             │
//! │                                                                         │
//! │  stockroom-api errors (app)                                            │
//! │  └── ApiError         - What HTTP callers see ({ code, message })      │
//! │                                                                         │
//! │  Flow: ValidationError → InventoryError → DbError → ApiError           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Retry Policy
//! Business-rule failures are final: retrying an `InsufficientStock` with the
//! same input yields the same answer. Only storage write conflicts (see
//! `DbError::Conflict`) are worth retrying, and that decision belongs to the
//! caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Error Kind
// =============================================================================

/// Machine-readable failure kind.
///
/// Serialized as SCREAMING_SNAKE_CASE so the wire codes read
/// `INSUFFICIENT_STOCK`, `NO_INCOMING_SOURCE`, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InsufficientStock,
    InsufficientIncoming,
    NoIncomingSource,
    InvalidState,
    NotFound,
    BadInput,
}

impl ErrorKind {
    /// Returns the stable wire code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorKind::InsufficientIncoming => "INSUFFICIENT_INCOMING",
            ErrorKind::NoIncomingSource => "NO_INCOMING_SOURCE",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::BadInput => "BAD_INPUT",
        }
    }

    /// True for the kinds a storefront shows as "out of stock".
    pub const fn is_out_of_stock(&self) -> bool {
        matches!(
            self,
            ErrorKind::InsufficientStock | ErrorKind::InsufficientIncoming
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Inventory Error
// =============================================================================

/// Business-rule failures raised by the inventory engine.
///
/// Every variant aborts the enclosing unit of work; nothing it touched is
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// Requested quantity exceeds on-hand-derived capacity.
    ///
    /// ## When This Occurs
    /// - `reserve_on_hand` with `qty > ATS`
    /// - `transfer` with `qty > onHand - reservedOnHand` at the source
    #[error("Insufficient stock for {unit_id} at {location_id}: available {available}, requested {requested}")]
    InsufficientStock {
        unit_id: String,
        location_id: String,
        available: i64,
        requested: i64,
    },

    /// Requested quantity exceeds unclaimed incoming supply.
    #[error("Insufficient incoming supply on line {line_id}: available {available}, requested {requested}")]
    InsufficientIncoming {
        line_id: String,
        available: i64,
        requested: i64,
    },

    /// No open purchase-order line exists for the unit.
    #[error("No open incoming supply for unit {unit_id}")]
    NoIncomingSource { unit_id: String },

    /// The target is in a state that forbids the operation, or an
    /// arithmetic guard tripped.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Referenced reservation, line, order or record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Structurally invalid request.
    #[error("Bad input: {0}")]
    BadInput(String),

    /// Field-level validation failure (reported as `BAD_INPUT`).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl InventoryError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        InventoryError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        InventoryError::InvalidState(reason.into())
    }

    /// Creates a BadInput error.
    pub fn bad_input(reason: impl Into<String>) -> Self {
        InventoryError::BadInput(reason.into())
    }

    /// Returns the machine-readable kind of this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InventoryError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            InventoryError::InsufficientIncoming { .. } => ErrorKind::InsufficientIncoming,
            InventoryError::NoIncomingSource { .. } => ErrorKind::NoIncomingSource,
            InventoryError::InvalidState(_) => ErrorKind::InvalidState,
            InventoryError::NotFound { .. } => ErrorKind::NotFound,
            InventoryError::BadInput(_) | InventoryError::Validation(_) => ErrorKind::BadInput,
        }
    }

    /// Returns the stable wire code (`INSUFFICIENT_STOCK`, ...).
    pub fn code(&self) -> &'static str {
        self.kind().as_str()
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any storage is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Value must not be zero.
    #[error("{field} must not be zero")]
    MustNotBeZero { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with InventoryError.
pub type InventoryResult<T> = Result<T, InventoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = InventoryError::InsufficientStock {
            unit_id: "SIZE-M".to_string(),
            location_id: "WH-UK-01".to_string(),
            available: 40,
            requested: 45,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for SIZE-M at WH-UK-01: available 40, requested 45"
        );
        assert_eq!(err.code(), "INSUFFICIENT_STOCK");
    }

    #[test]
    fn test_validation_reports_bad_input() {
        let err: InventoryError = ValidationError::MustBePositive {
            field: "qty".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::BadInput);
        assert_eq!(err.to_string(), "Validation error: qty must be positive");
    }

    #[test]
    fn test_out_of_stock_kinds() {
        assert!(ErrorKind::InsufficientStock.is_out_of_stock());
        assert!(ErrorKind::InsufficientIncoming.is_out_of_stock());
        assert!(!ErrorKind::NoIncomingSource.is_out_of_stock());
        assert!(!ErrorKind::InvalidState.is_out_of_stock());
    }

    #[test]
    fn test_kind_serializes_as_wire_code() {
        let json = serde_json::to_string(&ErrorKind::NoIncomingSource).unwrap();
        assert_eq!(json, "\"NO_INCOMING_SOURCE\"");
        assert_eq!(ErrorKind::NoIncomingSource.to_string(), "NO_INCOMING_SOURCE");
    }
}
