//! # Stock Record Repository
//!
//! Lazily created per-(unit, location) records and the only way to change
//! their quantities: [`StockRepository::apply`].
//!
//! ## Guarded Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. core: record.apply(delta)    → InvalidState if an invariant breaks │
//! │  2. SQL:  UPDATE ... SET x = x + Δ                                     │
//! │           WHERE key AND every invariant holds on the new values       │
//! │           RETURNING *                                                  │
//! │  3. No row back → InvalidState (stored row disagreed with the read)    │
//! │  4. CHECK constraints reject anything else at the storage level        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockroom_core::{InventoryError, StockDelta, StockRecord};

/// Repository for stock records.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Gets the record for (unit, location) without creating it.
    pub async fn get(&self, unit_id: &str, location_id: &str) -> DbResult<Option<StockRecord>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, unit_id, location_id).await
    }

    /// All records for a unit, one per location.
    pub async fn list_for_unit(&self, unit_id: &str) -> DbResult<Vec<StockRecord>> {
        let mut conn = self.pool.acquire().await?;
        Self::for_unit(&mut conn, unit_id).await
    }

    // =========================================================================
    // Transaction-level operations
    // =========================================================================

    pub async fn find(
        conn: &mut SqliteConnection,
        unit_id: &str,
        location_id: &str,
    ) -> DbResult<Option<StockRecord>> {
        let record = sqlx::query_as::<_, StockRecord>(
            "SELECT * FROM stock_records WHERE unit_id = ?1 AND location_id = ?2",
        )
        .bind(unit_id)
        .bind(location_id)
        .fetch_optional(conn)
        .await?;
        Ok(record)
    }

    pub async fn all(conn: &mut SqliteConnection) -> DbResult<Vec<StockRecord>> {
        let records = sqlx::query_as::<_, StockRecord>(
            "SELECT * FROM stock_records ORDER BY unit_id, location_id",
        )
        .fetch_all(conn)
        .await?;
        Ok(records)
    }

    pub async fn for_unit(conn: &mut SqliteConnection, unit_id: &str) -> DbResult<Vec<StockRecord>> {
        let records = sqlx::query_as::<_, StockRecord>(
            "SELECT * FROM stock_records WHERE unit_id = ?1 ORDER BY location_id",
        )
        .bind(unit_id)
        .fetch_all(conn)
        .await?;
        Ok(records)
    }

    /// Returns the record, inserting a zeroed one if absent.
    ///
    /// `INSERT .. ON CONFLICT DO NOTHING` makes concurrent first touches
    /// converge on one row. Being a write, it also takes the database write
    /// lock before anything else in the transaction is read.
    pub async fn get_or_create(
        conn: &mut SqliteConnection,
        unit_id: &str,
        location_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<StockRecord> {
        sqlx::query(
            r#"
            INSERT INTO stock_records (unit_id, location_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT (unit_id, location_id) DO NOTHING
            "#,
        )
        .bind(unit_id)
        .bind(location_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Self::find(conn, unit_id, location_id)
            .await?
            .ok_or_else(|| DbError::not_found("StockRecord", format!("{unit_id}@{location_id}")))
    }

    /// Applies `delta` to `current` under invariant guards.
    ///
    /// `current` must be the record as read in this transaction.
    pub async fn apply(
        conn: &mut SqliteConnection,
        current: &StockRecord,
        delta: StockDelta,
        now: DateTime<Utc>,
    ) -> DbResult<StockRecord> {
        // Fails with a descriptive InvalidState before touching storage
        current.apply(&delta)?;

        debug!(
            unit_id = %current.unit_id,
            location_id = %current.location_id,
            ?delta,
            "Applying stock delta"
        );

        let updated = sqlx::query_as::<_, StockRecord>(
            r#"
            UPDATE stock_records
            SET on_hand = on_hand + ?1,
                reserved_on_hand = reserved_on_hand + ?2,
                incoming = incoming + ?3,
                reserved_incoming = reserved_incoming + ?4,
                updated_at = ?5
            WHERE unit_id = ?6 AND location_id = ?7
              AND on_hand + ?1 >= 0
              AND reserved_on_hand + ?2 >= 0
              AND incoming + ?3 >= 0
              AND reserved_incoming + ?4 >= 0
              AND reserved_on_hand + ?2 <= on_hand + ?1
              AND reserved_incoming + ?4 <= incoming + ?3
            RETURNING *
            "#,
        )
        .bind(delta.on_hand)
        .bind(delta.reserved_on_hand)
        .bind(delta.incoming)
        .bind(delta.reserved_incoming)
        .bind(now)
        .bind(&current.unit_id)
        .bind(&current.location_id)
        .fetch_optional(conn)
        .await?;

        updated.ok_or_else(|| {
            DbError::Inventory(InventoryError::invalid_state(format!(
                "stock record {}@{} changed underneath the update",
                current.unit_id, current.location_id
            )))
        })
    }

    /// Sets the safety-stock buffer.
    pub async fn set_safety_stock(
        conn: &mut SqliteConnection,
        unit_id: &str,
        location_id: &str,
        safety_stock: i64,
        now: DateTime<Utc>,
    ) -> DbResult<StockRecord> {
        let updated = sqlx::query_as::<_, StockRecord>(
            r#"
            UPDATE stock_records
            SET safety_stock = ?1, updated_at = ?2
            WHERE unit_id = ?3 AND location_id = ?4
            RETURNING *
            "#,
        )
        .bind(safety_stock)
        .bind(now)
        .bind(unit_id)
        .bind(location_id)
        .fetch_optional(conn)
        .await?;

        updated.ok_or_else(|| DbError::not_found("StockRecord", format!("{unit_id}@{location_id}")))
    }
}
