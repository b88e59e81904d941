//! # stockroom-db: Storage & Engine for Stockroom
//!
//! SQLite storage (via sqlx) and the transactional inventory engine built
//! on it. Every mutating engine call is a single transaction spanning stock
//! records, reservations, supply lines and the audit ledger.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Stockroom Data Flow                                │
//! │                                                                         │
//! │  HTTP handler (POST /reservations/on-hand)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  stockroom-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐    │   │
//! │  │   │   Engine      │   │  Repositories  │   │  Migrations  │    │   │
//! │  │   │ (engine/)     │──►│ (repository/)  │   │  (embedded)  │    │   │
//! │  │   │               │   │                │   │              │    │   │
//! │  │   │ Reservations  │   │ StockRepo      │   │ 0001_        │    │   │
//! │  │   │ Receiving     │   │ LedgerRepo     │   │  inventory   │    │   │
//! │  │   │ Transfers     │   │ ReservationRepo│   │  .sql        │    │   │
//! │  │   │ Availability  │   │ SupplyRepo     │   │              │    │   │
//! │  │   └───────────────┘   └────────────────┘   └──────────────┘    │   │
//! │  │            │                  │                                 │   │
//! │  │            └────── Database (pool.rs) ───────┘                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types and SQLite error mapping
//! - [`repository`] - Row-level access (stock, ledger, reservations, supply, locations)
//! - [`engine`] - Transactional operations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockroom_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./stockroom.db")).await?;
//!
//! let ats = db.availability().ats("SIZE-M", "WH-UK-01").await?;
//! let reservation = db.reservations().reserve_on_hand(&request).await?;
//! ```
//!
//! ## Conflicts
//!
//! Two writers racing for the database surface as [`DbError::Conflict`].
//! The engine never retries on its own; check [`DbError::is_retryable`]
//! and resubmit.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::ledger::LedgerRepository;
pub use repository::location::LocationRepository;
pub use repository::stock::StockRepository;

// Engine services
pub use engine::{
    AvailabilityCalculator, Purchasing, Receiving, Reconciler, ReservationManager,
    StockAdjustments, TransferEngine,
};
