//! # stockroom-core: Pure Inventory Domain Logic
//!
//! Types, invariants and availability math for the Stockroom reservation &
//! availability engine. No I/O lives here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Stockroom Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Callers: order service, receiving, stock-take          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP (stockroom-api)                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               stockroom-db (engine + storage)                   │   │
//! │  │   reserve / release / pick / receive / transfer / adjust        │   │
//! │  │   one SQLite transaction per operation                          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockroom-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   stock   │  │availability│  │ requests  │  │   │
//! │  │   │Reservation│  │StockRecord│  │  ATS, ATP  │  │ validate  │  │   │
//! │  │   │LedgerEntry│  │StockDelta │  │            │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Reservation, LedgerEntry, SupplyLine, ...)
//! - [`stock`] - The stock record and its invariant-checked arithmetic
//! - [`availability`] - ATS / ATP calculations
//! - [`requests`] - Operation payloads with validation
//! - [`validation`] - Field validators
//! - [`error`] - Typed failure kinds
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use stockroom_core::stock::{StockDelta, StockRecord};
//!
//! let mut record = StockRecord::empty("SIZE-M", "WH-UK-01", Utc::now());
//! record.on_hand = 100;
//! record.safety_stock = 10;
//! assert_eq!(record.ats(), 90);
//!
//! let reserved = record.apply(&StockDelta::reserved_on_hand(50)).unwrap();
//! assert_eq!(reserved.ats(), 40);
//!
//! // Reserving more than is on hand breaks an invariant
//! assert!(reserved.apply(&StockDelta::reserved_on_hand(60)).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod availability;
pub mod error;
pub mod requests;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{ErrorKind, InventoryError, InventoryResult, ValidationError};
pub use stock::{StockDelta, StockRecord};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest quantity accepted in a single movement.
///
/// Guards against fat-finger entries (100000 instead of 100) and keeps
/// summed quantities comfortably inside `i64`.
pub const MAX_QUANTITY: i64 = 1_000_000;

/// Maximum length of an opaque identifier.
pub const MAX_ID_LENGTH: usize = 64;

/// Maximum length of a ledger note or release reason.
pub const MAX_NOTE_LENGTH: usize = 500;
