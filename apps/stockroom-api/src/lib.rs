//! # Stockroom API
//!
//! HTTP surface for the inventory engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom API Server                             │
//! │                                                                         │
//! │  Storefront / OMS ───► HTTP (8080) ───► routes ───► stockroom-db        │
//! │                                           │               │             │
//! │                                           ▼               ▼             │
//! │                                    retry on conflict    SQLite (WAL)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The router is built by [`app`] so tests can drive it in-process.

pub mod config;
pub mod error;
pub mod retry;
pub mod routes;

use axum::Router;
use stockroom_db::Database;
use tower_http::trace::TraceLayer;

use crate::config::RetrySettings;

/// Shared handler state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub retry: RetrySettings,
}

impl AppState {
    pub fn new(db: Database, retry: RetrySettings) -> Self {
        AppState { db, retry }
    }
}

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    routes::router(state).layer(TraceLayer::new_for_http())
}
