//! # Reservation Manager
//!
//! Creates, releases and consumes reservations.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve_on_hand   ATS ≥ qty?       reservedOnHand   += qty            │
//! │                                     ON_HAND reservation, ORDER_ALLOCATE │
//! │                                                                         │
//! │  reserve_incoming  earliest open line bound for the location           │
//! │                    (ETA, then created)                                 │
//! │                    line remaining - already promised ≥ qty?            │
//! │                    location incoming - reservedIncoming ≥ qty?         │
//! │                                     reservedIncoming += qty            │
//! │                                     INCOMING reservation, ORDER_ALLOCATE│
//! │                                                                         │
//! │  release           ACTIVE → RELEASED, bucket -= qty, ORDER_DEALLOCATE  │
//! │                                                                         │
//! │  pick              ACTIVE ON_HAND of the line → CONSUMED               │
//! │                    per (unit, location): onHand -= q,                  │
//! │                    reservedOnHand -= q, PICK (-q)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::reject;
use crate::error::DbResult;
use crate::repository::ledger::{LedgerDraft, LedgerRepository};
use crate::repository::reservation::ReservationRepository;
use crate::repository::stock::StockRepository;
use crate::repository::supply::SupplyRepository;
use stockroom_core::requests::{PickRequest, ReleaseReservation, ReserveIncoming, ReserveOnHand};
use stockroom_core::{
    InventoryError, MovementType, PickOutcome, PickedGroup, ReferenceType, Reservation,
    ReservationKind, ReservationStatus, StockDelta,
};

/// Reservation lifecycle service.
#[derive(Debug, Clone)]
pub struct ReservationManager {
    pub(super) pool: SqlitePool,
}

impl ReservationManager {
    pub fn new(pool: SqlitePool) -> Self {
        ReservationManager { pool }
    }

    /// Gets a reservation by id.
    pub async fn get(&self, id: &str) -> DbResult<Reservation> {
        ReservationRepository::new(self.pool.clone()).get(id).await
    }

    /// Every reservation of an order line, whatever its status.
    pub async fn list_for_order_line(
        &self,
        order_id: &str,
        order_line_id: &str,
    ) -> DbResult<Vec<Reservation>> {
        ReservationRepository::new(self.pool.clone())
            .list_for_order_line(order_id, order_line_id)
            .await
    }

    /// Claims physical stock for an order line.
    ///
    /// ## Errors
    /// - `INSUFFICIENT_STOCK` when `qty` exceeds ATS at the location
    /// - `BAD_INPUT` for malformed requests or an expiry in the past
    pub async fn reserve_on_hand(&self, req: &ReserveOnHand) -> DbResult<Reservation> {
        req.validate()?;
        let now = Utc::now();
        check_expiry(req.expires_at, now)?;

        debug!(
            order_id = %req.order_id,
            unit_id = %req.unit_id,
            location_id = %req.location_id,
            qty = req.qty,
            "Reserving on-hand stock"
        );

        let mut tx = self.pool.begin().await?;

        let record =
            StockRepository::get_or_create(&mut *tx, &req.unit_id, &req.location_id, now).await?;

        let ats = record.ats();
        if req.qty > ats {
            return Err(reject(
                "reserve_on_hand",
                InventoryError::InsufficientStock {
                    unit_id: req.unit_id.clone(),
                    location_id: req.location_id.clone(),
                    available: ats,
                    requested: req.qty,
                },
            ));
        }

        StockRepository::apply(&mut *tx, &record, StockDelta::reserved_on_hand(req.qty), now).await?;

        let reservation = Reservation {
            id: Uuid::new_v4().to_string(),
            order_id: req.order_id.clone(),
            order_line_id: req.order_line_id.clone(),
            unit_id: req.unit_id.clone(),
            location_id: req.location_id.clone(),
            qty: req.qty,
            kind: ReservationKind::OnHand,
            source_line_id: None,
            expected_by: None,
            status: ReservationStatus::Active,
            expires_at: req.expires_at,
            created_at: now,
            updated_at: now,
        };
        ReservationRepository::insert(&mut *tx, &reservation).await?;

        let draft = LedgerDraft::new(
            &req.unit_id,
            &req.location_id,
            MovementType::OrderAllocate,
            req.qty,
        )
        .reference(ReferenceType::Order, &req.order_id)
        .actor(req.actor.as_deref());
        LedgerRepository::append(&mut *tx, draft, now).await?;

        tx.commit().await?;

        info!(
            reservation_id = %reservation.id,
            unit_id = %reservation.unit_id,
            location_id = %reservation.location_id,
            qty = reservation.qty,
            "On-hand reservation created"
        );
        Ok(reservation)
    }

    /// Claims forward stock from the unit's earliest open supply line.
    ///
    /// ## Errors
    /// - `NO_INCOMING_SOURCE` when no open line delivers the unit to the
    ///   requested location
    /// - `INSUFFICIENT_INCOMING` when the line's unpromised remainder, or
    ///   the location's unreserved incoming, is below `qty`
    pub async fn reserve_incoming(&self, req: &ReserveIncoming) -> DbResult<Reservation> {
        req.validate()?;
        let now = Utc::now();
        check_expiry(req.expires_at, now)?;

        debug!(
            order_id = %req.order_id,
            unit_id = %req.unit_id,
            location_id = %req.location_id,
            qty = req.qty,
            "Reserving incoming stock"
        );

        let mut tx = self.pool.begin().await?;

        let record =
            StockRepository::get_or_create(&mut *tx, &req.unit_id, &req.location_id, now).await?;

        let line = SupplyRepository::earliest_open_line(&mut *tx, &req.unit_id, &req.location_id)
            .await?
            .ok_or_else(|| {
                reject(
                    "reserve_incoming",
                    InventoryError::NoIncomingSource {
                        unit_id: req.unit_id.clone(),
                    },
                )
            })?;

        let promised = ReservationRepository::reserved_against_line(&mut *tx, &line.id).await?;
        let line_available = line.remaining() - promised;
        if req.qty > line_available {
            return Err(reject(
                "reserve_incoming",
                InventoryError::InsufficientIncoming {
                    line_id: line.id.clone(),
                    available: line_available.max(0),
                    requested: req.qty,
                },
            ));
        }

        // reservedIncoming may never exceed incoming at the charged location
        let location_available = record.unreserved_incoming();
        if req.qty > location_available {
            return Err(reject(
                "reserve_incoming",
                InventoryError::InsufficientIncoming {
                    line_id: line.id.clone(),
                    available: location_available.max(0),
                    requested: req.qty,
                },
            ));
        }

        StockRepository::apply(&mut *tx, &record, StockDelta::reserved_incoming(req.qty), now).await?;

        let reservation = Reservation {
            id: Uuid::new_v4().to_string(),
            order_id: req.order_id.clone(),
            order_line_id: req.order_line_id.clone(),
            unit_id: req.unit_id.clone(),
            location_id: req.location_id.clone(),
            qty: req.qty,
            kind: ReservationKind::Incoming,
            source_line_id: Some(line.id.clone()),
            expected_by: Some(line.eta),
            status: ReservationStatus::Active,
            expires_at: req.expires_at,
            created_at: now,
            updated_at: now,
        };
        ReservationRepository::insert(&mut *tx, &reservation).await?;

        let draft = LedgerDraft::new(
            &req.unit_id,
            &req.location_id,
            MovementType::OrderAllocate,
            req.qty,
        )
        .reference(ReferenceType::Order, &req.order_id)
        .note(Some("incoming supply"))
        .actor(req.actor.as_deref());
        LedgerRepository::append(&mut *tx, draft, now).await?;

        tx.commit().await?;

        info!(
            reservation_id = %reservation.id,
            unit_id = %reservation.unit_id,
            line_id = %line.id,
            eta = %line.eta,
            qty = reservation.qty,
            "Incoming reservation created"
        );
        Ok(reservation)
    }

    /// Releases an ACTIVE reservation and credits its bucket back.
    ///
    /// A second release of the same reservation fails with `INVALID_STATE`.
    pub async fn release(&self, req: &ReleaseReservation) -> DbResult<Reservation> {
        req.validate()?;
        let now = Utc::now();

        debug!(reservation_id = %req.reservation_id, "Releasing reservation");

        let mut tx = self.pool.begin().await?;

        let reservation = finish_active(
            &mut *tx,
            "release",
            &req.reservation_id,
            ReservationStatus::Released,
            now,
        )
        .await?;
        credit_back(
            &mut *tx,
            &reservation,
            req.reason.as_deref(),
            req.actor.as_deref(),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(
            reservation_id = %reservation.id,
            kind = ?reservation.kind,
            qty = reservation.qty,
            "Reservation released"
        );
        Ok(reservation)
    }

    /// Consumes every ACTIVE ON_HAND reservation of an order line.
    ///
    /// ## Errors
    /// - `NOT_FOUND` when the line has nothing left to pick
    /// - `INVALID_STATE` when a stock record cannot cover the consumption
    pub async fn pick(&self, req: &PickRequest) -> DbResult<PickOutcome> {
        req.validate()?;
        let now = Utc::now();

        debug!(
            order_id = %req.order_id,
            order_line_id = %req.order_line_id,
            location_id = ?req.location_id,
            "Picking order line"
        );

        let mut tx = self.pool.begin().await?;

        let consumed = ReservationRepository::consume_for_line(
            &mut *tx,
            &req.order_id,
            &req.order_line_id,
            req.location_id.as_deref(),
            now,
        )
        .await?;

        if consumed.is_empty() {
            return Err(reject(
                "pick",
                InventoryError::not_found(
                    "Active reservation",
                    format!("{}/{}", req.order_id, req.order_line_id),
                ),
            ));
        }

        let mut groups: BTreeMap<(String, String), PickedGroup> = BTreeMap::new();
        for reservation in consumed {
            let group = groups
                .entry((reservation.unit_id.clone(), reservation.location_id.clone()))
                .or_insert_with(|| PickedGroup {
                    unit_id: reservation.unit_id.clone(),
                    location_id: reservation.location_id.clone(),
                    qty: 0,
                    reservation_ids: Vec::new(),
                });
            group.qty += reservation.qty;
            group.reservation_ids.push(reservation.id);
        }

        for group in groups.values() {
            let record = StockRepository::find(&mut *tx, &group.unit_id, &group.location_id)
                .await?
                .ok_or_else(|| {
                    reject(
                        "pick",
                        InventoryError::invalid_state(format!(
                            "no stock record for {}@{}",
                            group.unit_id, group.location_id
                        )),
                    )
                })?;

            if record.reserved_on_hand < group.qty || record.on_hand < group.qty {
                return Err(reject(
                    "pick",
                    InventoryError::invalid_state(format!(
                        "{}@{} cannot cover pick of {} (onHand {}, reservedOnHand {})",
                        group.unit_id,
                        group.location_id,
                        group.qty,
                        record.on_hand,
                        record.reserved_on_hand
                    )),
                ));
            }

            let delta = StockDelta::on_hand(-group.qty).with_reserved_on_hand(-group.qty);
            StockRepository::apply(&mut *tx, &record, delta, now).await?;

            let draft = LedgerDraft::new(
                &group.unit_id,
                &group.location_id,
                MovementType::Pick,
                -group.qty,
            )
            .reference(ReferenceType::Order, &req.order_id)
            .note(req.note.as_deref())
            .actor(req.actor.as_deref());
            LedgerRepository::append(&mut *tx, draft, now).await?;
        }

        tx.commit().await?;

        let outcome = PickOutcome {
            order_id: req.order_id.clone(),
            order_line_id: req.order_line_id.clone(),
            groups: groups.into_values().collect(),
        };

        info!(
            order_id = %outcome.order_id,
            order_line_id = %outcome.order_line_id,
            qty = outcome.total_qty(),
            groups = outcome.groups.len(),
            "Order line picked"
        );
        Ok(outcome)
    }
}

fn check_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DbResult<()> {
    match expires_at {
        Some(at) if at <= now => Err(reject(
            "reserve",
            InventoryError::bad_input("expiresAt must be in the future"),
        )),
        _ => Ok(()),
    }
}

/// Moves a reservation out of ACTIVE, distinguishing a missing reservation
/// (`NOT_FOUND`) from one already finished (`INVALID_STATE`).
pub(crate) async fn finish_active(
    conn: &mut SqliteConnection,
    operation: &'static str,
    id: &str,
    next: ReservationStatus,
    now: DateTime<Utc>,
) -> DbResult<Reservation> {
    if !ReservationStatus::Active.can_transition_to(next) {
        return Err(reject(
            operation,
            InventoryError::invalid_state(format!("reservation {id} cannot move to {next}")),
        ));
    }

    if let Some(finished) = ReservationRepository::finish(conn, id, next, now).await? {
        return Ok(finished);
    }

    let err = match ReservationRepository::find(conn, id).await? {
        None => InventoryError::not_found("Reservation", id),
        Some(mut existing) => match existing.transition(next, now) {
            Err(err) => err,
            Ok(()) => InventoryError::invalid_state(format!("reservation {id} could not be finished")),
        },
    };
    Err(reject(operation, err))
}

/// Reverses a reservation's bucket increment and logs ORDER_DEALLOCATE.
pub(crate) async fn credit_back(
    conn: &mut SqliteConnection,
    reservation: &Reservation,
    note: Option<&str>,
    actor: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let record = StockRepository::find(conn, &reservation.unit_id, &reservation.location_id)
        .await?
        .ok_or_else(|| {
            InventoryError::invalid_state(format!(
                "no stock record for {}@{}",
                reservation.unit_id, reservation.location_id
            ))
        })?;

    let delta = match reservation.kind {
        ReservationKind::OnHand => StockDelta::reserved_on_hand(-reservation.qty),
        ReservationKind::Incoming => StockDelta::reserved_incoming(-reservation.qty),
    };
    StockRepository::apply(conn, &record, delta, now).await?;

    let draft = LedgerDraft::new(
        &reservation.unit_id,
        &reservation.location_id,
        MovementType::OrderDeallocate,
        reservation.qty,
    )
    .reference(ReferenceType::Order, &reservation.order_id)
    .note(note)
    .actor(actor);
    LedgerRepository::append(conn, draft, now).await?;

    Ok(())
}
