//! # Reservation Repository
//!
//! Reservation rows. Status changes are conditional updates
//! (`WHERE status = 'ACTIVE'`), so a reservation can leave ACTIVE only once
//! no matter how many callers race for it.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockroom_core::{Reservation, ReservationKind, ReservationStatus};

/// Repository for reservations.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    /// Creates a new ReservationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    /// Gets a reservation by id.
    pub async fn get(&self, id: &str) -> DbResult<Reservation> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Reservation", id))
    }

    /// Every reservation of an order line, oldest first.
    pub async fn list_for_order_line(
        &self,
        order_id: &str,
        order_line_id: &str,
    ) -> DbResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE order_id = ?1 AND order_line_id = ?2
            ORDER BY rowid
            "#,
        )
        .bind(order_id)
        .bind(order_line_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    // =========================================================================
    // Transaction-level operations
    // =========================================================================

    pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(reservation)
    }

    pub async fn insert(conn: &mut SqliteConnection, r: &Reservation) -> DbResult<()> {
        debug!(
            id = %r.id,
            order_id = %r.order_id,
            kind = ?r.kind,
            qty = r.qty,
            "Inserting reservation"
        );

        sqlx::query(
            r#"
            INSERT INTO reservations (
                id, order_id, order_line_id, unit_id, location_id, qty, kind,
                source_line_id, expected_by, status, expires_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&r.id)
        .bind(&r.order_id)
        .bind(&r.order_line_id)
        .bind(&r.unit_id)
        .bind(&r.location_id)
        .bind(r.qty)
        .bind(r.kind)
        .bind(&r.source_line_id)
        .bind(r.expected_by)
        .bind(r.status)
        .bind(r.expires_at)
        .bind(r.created_at)
        .bind(r.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Moves an ACTIVE reservation to `next`. Returns `None` when the
    /// reservation is missing or no longer ACTIVE.
    pub async fn finish(
        conn: &mut SqliteConnection,
        id: &str,
        next: ReservationStatus,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Reservation>> {
        let finished = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations
            SET status = ?1, updated_at = ?2
            WHERE id = ?3 AND status = ?4
            RETURNING *
            "#,
        )
        .bind(next)
        .bind(now)
        .bind(id)
        .bind(ReservationStatus::Active)
        .fetch_optional(conn)
        .await?;
        Ok(finished)
    }

    /// Marks every ACTIVE ON_HAND reservation of an order line CONSUMED and
    /// returns them. Optionally restricted to one location.
    pub async fn consume_for_line(
        conn: &mut SqliteConnection,
        order_id: &str,
        order_line_id: &str,
        location_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<Reservation>> {
        let consumed = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations
            SET status = ?1, updated_at = ?2
            WHERE order_id = ?3 AND order_line_id = ?4
              AND kind = ?5 AND status = ?6
              AND (?7 IS NULL OR location_id = ?7)
            RETURNING *
            "#,
        )
        .bind(ReservationStatus::Consumed)
        .bind(now)
        .bind(order_id)
        .bind(order_line_id)
        .bind(ReservationKind::OnHand)
        .bind(ReservationStatus::Active)
        .bind(location_id)
        .fetch_all(conn)
        .await?;
        Ok(consumed)
    }

    /// ACTIVE INCOMING reservations sourced from a line, oldest first.
    /// Optionally restricted to one location.
    pub async fn active_incoming_for_line(
        conn: &mut SqliteConnection,
        line_id: &str,
        location_id: Option<&str>,
    ) -> DbResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE source_line_id = ?1 AND kind = ?2 AND status = ?3
              AND (?4 IS NULL OR location_id = ?4)
            ORDER BY rowid
            "#,
        )
        .bind(line_id)
        .bind(ReservationKind::Incoming)
        .bind(ReservationStatus::Active)
        .bind(location_id)
        .fetch_all(conn)
        .await?;
        Ok(reservations)
    }

    /// Quantity already promised against a supply line by ACTIVE INCOMING
    /// reservations.
    pub async fn reserved_against_line(conn: &mut SqliteConnection, line_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(qty), 0) FROM reservations
            WHERE source_line_id = ?1 AND kind = ?2 AND status = ?3
            "#,
        )
        .bind(line_id)
        .bind(ReservationKind::Incoming)
        .bind(ReservationStatus::Active)
        .fetch_one(conn)
        .await?;
        Ok(total)
    }

    /// Number of ACTIVE INCOMING reservations on any line of a purchase order.
    pub async fn count_active_incoming_for_order(
        conn: &mut SqliteConnection,
        purchase_order_id: &str,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM reservations r
            JOIN supply_lines l ON l.id = r.source_line_id
            WHERE l.purchase_order_id = ?1 AND r.kind = ?2 AND r.status = ?3
            "#,
        )
        .bind(purchase_order_id)
        .bind(ReservationKind::Incoming)
        .bind(ReservationStatus::Active)
        .fetch_one(conn)
        .await?;
        Ok(count)
    }

    /// ACTIVE reservations carrying an expiry, oldest first.
    pub async fn active_with_expiry(conn: &mut SqliteConnection) -> DbResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE status = ?1 AND expires_at IS NOT NULL
            ORDER BY rowid
            "#,
        )
        .bind(ReservationStatus::Active)
        .fetch_all(conn)
        .await?;
        Ok(reservations)
    }

    /// Flips an ACTIVE INCOMING reservation to ON_HAND in place.
    pub async fn promote(
        conn: &mut SqliteConnection,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Reservation>> {
        let promoted = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations
            SET kind = ?1, updated_at = ?2
            WHERE id = ?3 AND kind = ?4 AND status = ?5
            RETURNING *
            "#,
        )
        .bind(ReservationKind::OnHand)
        .bind(now)
        .bind(id)
        .bind(ReservationKind::Incoming)
        .bind(ReservationStatus::Active)
        .fetch_optional(conn)
        .await?;
        Ok(promoted)
    }

    /// Shrinks an ACTIVE reservation by `by` units (used when splitting).
    pub async fn shrink(
        conn: &mut SqliteConnection,
        id: &str,
        by: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Reservation>> {
        let shrunk = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations
            SET qty = qty - ?1, updated_at = ?2
            WHERE id = ?3 AND status = ?4 AND qty > ?1
            RETURNING *
            "#,
        )
        .bind(by)
        .bind(now)
        .bind(id)
        .bind(ReservationStatus::Active)
        .fetch_optional(conn)
        .await?;
        Ok(shrunk)
    }
}
