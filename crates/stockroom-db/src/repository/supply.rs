//! # Supply Repository
//!
//! Purchase orders and their lines (expected future stock).
//!
//! ## Open Lines
//! A line is *open* while its purchase order is OPEN or PARTIAL and it has
//! not been fully received. An ETA in the past does not close it.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use stockroom_core::{PurchaseOrder, PurchaseOrderStatus, SupplyLine};

const OPEN_LINES_SQL: &str = r#"
    SELECT l.* FROM supply_lines l
    JOIN purchase_orders p ON p.id = l.purchase_order_id
    WHERE l.unit_id = ?1
      AND l.received_qty < l.qty
      AND p.status IN (?2, ?3)
    ORDER BY l.eta ASC, l.rowid ASC
"#;

const EARLIEST_LINE_AT_SQL: &str = r#"
    SELECT l.* FROM supply_lines l
    JOIN purchase_orders p ON p.id = l.purchase_order_id
    WHERE l.unit_id = ?1
      AND l.received_qty < l.qty
      AND p.status IN (?2, ?3)
      AND l.location_id = ?4
    ORDER BY l.eta ASC, l.rowid ASC
    LIMIT 1
"#;

/// Repository for purchase orders and supply lines.
///
/// Every operation runs on the caller's connection so it can join the
/// engine's transaction.
#[derive(Debug, Clone, Copy)]
pub struct SupplyRepository;

impl SupplyRepository {
    // =========================================================================
    // Transaction-level operations
    // =========================================================================

    pub async fn insert_order(conn: &mut SqliteConnection, order: &PurchaseOrder) -> DbResult<()> {
        debug!(id = %order.id, "Inserting purchase order");

        sqlx::query(
            r#"
            INSERT INTO purchase_orders (id, supplier_ref, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&order.id)
        .bind(&order.supplier_ref)
        .bind(order.status)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn find_order(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<PurchaseOrder>> {
        let order = sqlx::query_as::<_, PurchaseOrder>("SELECT * FROM purchase_orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(order)
    }

    pub async fn set_order_status(
        conn: &mut SqliteConnection,
        id: &str,
        status: PurchaseOrderStatus,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query("UPDATE purchase_orders SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(status)
            .bind(now)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Moves an OPEN or PARTIAL order to a terminal status. Returns `None`
    /// when the order is missing or already closed or cancelled.
    pub async fn finish_order(
        conn: &mut SqliteConnection,
        id: &str,
        status: PurchaseOrderStatus,
        now: DateTime<Utc>,
    ) -> DbResult<Option<PurchaseOrder>> {
        let order = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            UPDATE purchase_orders
            SET status = ?1, updated_at = ?2
            WHERE id = ?3 AND status IN (?4, ?5)
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(now)
        .bind(id)
        .bind(PurchaseOrderStatus::Open)
        .bind(PurchaseOrderStatus::Partial)
        .fetch_optional(conn)
        .await?;
        Ok(order)
    }

    pub async fn insert_line(conn: &mut SqliteConnection, line: &SupplyLine) -> DbResult<()> {
        debug!(
            id = %line.id,
            purchase_order_id = %line.purchase_order_id,
            unit_id = %line.unit_id,
            qty = line.qty,
            "Inserting supply line"
        );

        sqlx::query(
            r#"
            INSERT INTO supply_lines (
                id, purchase_order_id, unit_id, location_id, qty, eta,
                received_qty, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&line.id)
        .bind(&line.purchase_order_id)
        .bind(&line.unit_id)
        .bind(&line.location_id)
        .bind(line.qty)
        .bind(line.eta)
        .bind(line.received_qty)
        .bind(line.created_at)
        .bind(line.updated_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn find_line(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<SupplyLine>> {
        let line = sqlx::query_as::<_, SupplyLine>("SELECT * FROM supply_lines WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(line)
    }

    pub async fn lines_for_order(
        conn: &mut SqliteConnection,
        purchase_order_id: &str,
    ) -> DbResult<Vec<SupplyLine>> {
        let lines = sqlx::query_as::<_, SupplyLine>(
            "SELECT * FROM supply_lines WHERE purchase_order_id = ?1 ORDER BY rowid",
        )
        .bind(purchase_order_id)
        .fetch_all(conn)
        .await?;
        Ok(lines)
    }

    /// Open lines for a unit, earliest ETA first (ties: earliest created).
    pub async fn open_lines_for_unit(
        conn: &mut SqliteConnection,
        unit_id: &str,
    ) -> DbResult<Vec<SupplyLine>> {
        let lines = sqlx::query_as::<_, SupplyLine>(OPEN_LINES_SQL)
            .bind(unit_id)
            .bind(PurchaseOrderStatus::Open)
            .bind(PurchaseOrderStatus::Partial)
            .fetch_all(conn)
            .await?;
        Ok(lines)
    }

    /// The earliest open line delivering `unit_id` to `location_id`,
    /// re-evaluated on every call.
    pub async fn earliest_open_line(
        conn: &mut SqliteConnection,
        unit_id: &str,
        location_id: &str,
    ) -> DbResult<Option<SupplyLine>> {
        let line = sqlx::query_as::<_, SupplyLine>(EARLIEST_LINE_AT_SQL)
            .bind(unit_id)
            .bind(PurchaseOrderStatus::Open)
            .bind(PurchaseOrderStatus::Partial)
            .bind(location_id)
            .fetch_optional(conn)
            .await?;
        Ok(line)
    }

    /// Adds `qty` to a line's received quantity. Returns `None` when the
    /// line is missing, its order is not open, or `qty` would push the
    /// received quantity past the ordered quantity.
    pub async fn record_receipt(
        conn: &mut SqliteConnection,
        line_id: &str,
        qty: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Option<SupplyLine>> {
        let line = sqlx::query_as::<_, SupplyLine>(
            r#"
            UPDATE supply_lines
            SET received_qty = received_qty + ?1, updated_at = ?2
            WHERE id = ?3
              AND received_qty + ?1 <= qty
              AND purchase_order_id IN (
                  SELECT id FROM purchase_orders WHERE status IN (?4, ?5)
              )
            RETURNING *
            "#,
        )
        .bind(qty)
        .bind(now)
        .bind(line_id)
        .bind(PurchaseOrderStatus::Open)
        .bind(PurchaseOrderStatus::Partial)
        .fetch_optional(conn)
        .await?;
        Ok(line)
    }
}
