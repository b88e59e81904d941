//! # Audit Ledger Repository
//!
//! Insert-only log of every quantity change. There is no update or delete
//! here, and triggers in the schema abort any that are attempted.
//!
//! Appends never read first, so two transactions appending for the same
//! (unit, location) cannot conflict on the ledger itself.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use stockroom_core::{LedgerEntry, MovementType, ReferenceType};

/// An entry about to be appended.
///
/// ```rust,ignore
/// let draft = LedgerDraft::new(unit_id, location_id, MovementType::Pick, -qty)
///     .reference(ReferenceType::Order, order_id)
///     .note(note)
///     .actor(actor);
/// LedgerRepository::append(&mut *tx, draft, now).await?;
/// ```
#[derive(Debug, Clone)]
pub struct LedgerDraft<'a> {
    unit_id: &'a str,
    location_id: &'a str,
    movement_type: MovementType,
    delta: i64,
    reference: Option<(ReferenceType, &'a str)>,
    note: Option<&'a str>,
    actor: Option<&'a str>,
}

impl<'a> LedgerDraft<'a> {
    pub fn new(unit_id: &'a str, location_id: &'a str, movement_type: MovementType, delta: i64) -> Self {
        LedgerDraft {
            unit_id,
            location_id,
            movement_type,
            delta,
            reference: None,
            note: None,
            actor: None,
        }
    }

    pub fn reference(mut self, reference_type: ReferenceType, reference_id: &'a str) -> Self {
        self.reference = Some((reference_type, reference_id));
        self
    }

    pub fn note(mut self, note: Option<&'a str>) -> Self {
        self.note = note;
        self
    }

    pub fn actor(mut self, actor: Option<&'a str>) -> Self {
        self.actor = actor;
        self
    }
}

/// Repository for ledger entries.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Entries for (unit, location), newest first.
    pub async fn for_stock(
        &self,
        unit_id: &str,
        location_id: &str,
        limit: i64,
    ) -> DbResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT * FROM ledger_entries
            WHERE unit_id = ?1 AND location_id = ?2
            ORDER BY rowid DESC
            LIMIT ?3
            "#,
        )
        .bind(unit_id)
        .bind(location_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    /// Entries carrying an external reference (order, purchase order or
    /// transfer id), in append order.
    pub async fn for_reference(&self, reference_id: &str) -> DbResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            "SELECT * FROM ledger_entries WHERE reference_id = ?1 ORDER BY rowid",
        )
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    // =========================================================================
    // Transaction-level operations
    // =========================================================================

    /// Appends one entry inside the caller's transaction.
    pub async fn append(
        conn: &mut SqliteConnection,
        draft: LedgerDraft<'_>,
        now: DateTime<Utc>,
    ) -> DbResult<LedgerEntry> {
        let entry = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            unit_id: draft.unit_id.to_string(),
            location_id: draft.location_id.to_string(),
            movement_type: draft.movement_type,
            delta: draft.delta,
            reference_type: draft.reference.map(|(kind, _)| kind),
            reference_id: draft.reference.map(|(_, id)| id.to_string()),
            note: draft.note.map(str::to_string),
            actor: draft.actor.map(str::to_string),
            created_at: now,
        };

        debug!(
            unit_id = %entry.unit_id,
            location_id = %entry.location_id,
            movement = entry.movement_type.as_str(),
            delta = entry.delta,
            "Appending ledger entry"
        );

        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, unit_id, location_id, movement_type, delta,
                reference_type, reference_id, note, actor, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.unit_id)
        .bind(&entry.location_id)
        .bind(entry.movement_type)
        .bind(entry.delta)
        .bind(entry.reference_type)
        .bind(&entry.reference_id)
        .bind(&entry.note)
        .bind(&entry.actor)
        .bind(entry.created_at)
        .execute(conn)
        .await?;

        Ok(entry)
    }

    /// Sum of on-hand-affecting deltas for (unit, location).
    pub async fn on_hand_total(
        conn: &mut SqliteConnection,
        unit_id: &str,
        location_id: &str,
    ) -> DbResult<i64> {
        let placeholders = vec!["?"; MovementType::ON_HAND.len()].join(", ");
        let sql = format!(
            "SELECT COALESCE(SUM(delta), 0) FROM ledger_entries \
             WHERE unit_id = ? AND location_id = ? AND movement_type IN ({placeholders})"
        );

        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(unit_id).bind(location_id);
        for movement in MovementType::ON_HAND {
            query = query.bind(movement);
        }
        Ok(query.fetch_one(conn).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_append_and_query() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let now = Utc::now();

        let draft = LedgerDraft::new("SIZE-M", "WH", MovementType::PurchaseReceipt, 100)
            .reference(ReferenceType::PurchaseOrder, "po-1")
            .actor(Some("receiver"));
        LedgerRepository::append(&mut conn, draft, now).await.unwrap();
        let draft = LedgerDraft::new("SIZE-M", "WH", MovementType::OrderAllocate, 30)
            .reference(ReferenceType::Order, "o-1");
        LedgerRepository::append(&mut conn, draft, now).await.unwrap();
        let draft = LedgerDraft::new("SIZE-M", "WH", MovementType::Pick, -30)
            .reference(ReferenceType::Order, "o-1");
        LedgerRepository::append(&mut conn, draft, now).await.unwrap();

        // Allocation is not an on-hand movement
        let total = LedgerRepository::on_hand_total(&mut conn, "SIZE-M", "WH").await.unwrap();
        assert_eq!(total, 70);
        drop(conn);

        let entries = db.ledger().for_stock("SIZE-M", "WH", 10).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].movement_type, MovementType::Pick);

        let by_order = db.ledger().for_reference("o-1").await.unwrap();
        assert_eq!(by_order.len(), 2);
        assert_eq!(by_order[0].reference_type, Some(ReferenceType::Order));
    }

    #[tokio::test]
    async fn test_ledger_is_immutable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let draft = LedgerDraft::new("SIZE-M", "WH", MovementType::ManualAdjustment, 5);
        let entry = LedgerRepository::append(&mut conn, draft, Utc::now()).await.unwrap();

        let update: DbResult<_> = sqlx::query("UPDATE ledger_entries SET delta = 500 WHERE id = ?1")
            .bind(&entry.id)
            .execute(&mut *conn)
            .await
            .map_err(DbError::from);
        assert!(update.is_err());

        let delete: DbResult<_> = sqlx::query("DELETE FROM ledger_entries WHERE id = ?1")
            .bind(&entry.id)
            .execute(&mut *conn)
            .await
            .map_err(DbError::from);
        assert!(delete.is_err());

        drop(conn);
        let entries = db.ledger().for_stock("SIZE-M", "WH", 10).await.unwrap();
        assert_eq!(entries[0].delta, 5);
    }
}
