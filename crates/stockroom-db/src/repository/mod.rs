//! # Repository Module
//!
//! SQL for each table lives in exactly one repository.
//!
//! ## Two Kinds of Methods
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Access Paths                              │
//! │                                                                         │
//! │  Read path (&self, pool)            Write path (associated fn, conn)   │
//! │  ───────────────────────            ────────────────────────────────   │
//! │  db.stock().get(unit, loc)          StockRepository::apply(            │
//! │  db.ledger().for_stock(...)             &mut *tx, &record, delta, now) │
//! │  db.locations().list()              LedgerRepository::append(          │
//! │                                         &mut *tx, draft, now)          │
//! │       │                                      │                          │
//! │       ▼                                      ▼                          │
//! │  Any pooled connection              The caller's open transaction      │
//! │                                     (engine owns begin/commit)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Write-path functions take `&mut SqliteConnection` so the engine can
//! thread one transaction through several repositories.
//!
//! ## Available Repositories
//!
//! - [`StockRepository`](stock::StockRepository) - Stock records and guarded updates
//! - [`LedgerRepository`](ledger::LedgerRepository) - Append-only audit ledger
//! - [`ReservationRepository`](reservation::ReservationRepository) - Reservation rows
//! - [`SupplyRepository`](supply::SupplyRepository) - Purchase orders and supply lines
//! - [`LocationRepository`](location::LocationRepository) - Location registry

pub mod ledger;
pub mod location;
pub mod reservation;
pub mod stock;
pub mod supply;
