//! # Database Error Types
//!
//! Error types for storage and engine operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        InventoryError (business rule)      │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ← categorizes: conflict / constraint / other    │
//! │       │                                                                 │
//! │       ├── is_retryable() → caller retries (bounded)                    │
//! │       ▼                                                                 │
//! │  ApiError (stockroom-api) ← { code, message } with HTTP status         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Conflicts
//! SQLite reports a competing writer as `SQLITE_BUSY` (5) or `SQLITE_LOCKED`
//! (6), including extended codes such as `SQLITE_BUSY_SNAPSHOT` (517) when a
//! read transaction tries to upgrade after another writer committed. Those
//! become [`DbError::Conflict`]; nothing was written and the whole operation
//! can be replayed.

use stockroom_core::{ErrorKind, InventoryError};
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A business rule rejected the operation. Never retryable.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Registering a second location with the same code
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A competing writer holds the database. Safe to retry.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True when replaying the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Conflict(_) | DbError::PoolExhausted)
    }

    /// Business failure kind, if this error is one.
    ///
    /// Storage faults (connection, migration, conflict...) return `None`.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DbError::Inventory(err) => Some(err.kind()),
            DbError::NotFound { .. } => Some(ErrorKind::NotFound),
            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                Some(ErrorKind::BadInput)
            }
            _ => None,
        }
    }
}

/// Primary SQLite result codes that signal a competing writer.
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

fn is_conflict_code(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i64>().ok())
        .map(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → BUSY/LOCKED → Conflict
///                               CHECK       → Inventory(InvalidState)
///                               UNIQUE / FK → UniqueViolation / ForeignKeyViolation
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code();

                if is_conflict_code(code.as_deref())
                    || msg.contains("database is locked")
                    || msg.contains("database table is locked")
                {
                    DbError::Conflict(msg.to_string())
                } else if msg.contains("CHECK constraint failed") {
                    // A stock invariant guard in the schema tripped
                    DbError::Inventory(InventoryError::invalid_state(msg.to_string()))
                } else if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_codes() {
        assert!(is_conflict_code(Some("5")));
        assert!(is_conflict_code(Some("6")));
        assert!(is_conflict_code(Some("517")));
        assert!(!is_conflict_code(Some("19")));
        assert!(!is_conflict_code(Some("2067")));
        assert!(!is_conflict_code(None));
    }

    #[test]
    fn test_retryable() {
        assert!(DbError::Conflict("database is locked".to_string()).is_retryable());
        assert!(DbError::PoolExhausted.is_retryable());
        assert!(!DbError::Inventory(InventoryError::bad_input("x")).is_retryable());
        assert!(!DbError::not_found("Reservation", "r-1").is_retryable());
    }

    #[test]
    fn test_kind_passes_through_business_errors() {
        let err: DbError = InventoryError::NoIncomingSource {
            unit_id: "SIZE-M".to_string(),
        }
        .into();
        assert_eq!(err.kind(), Some(ErrorKind::NoIncomingSource));
        assert_eq!(err.to_string(), "No open incoming supply for unit SIZE-M");
        assert_eq!(DbError::PoolExhausted.kind(), None);
    }
}
