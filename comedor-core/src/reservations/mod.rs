//! ReservationScheduler - future occupancy windows and conflict detection
//!
//! Books half-open intervals [start, start+duration) on tables and keeps
//! them from colliding: two windows conflict iff s1 < s2+d2 && s2 < s1+d1.
//! Cancelled, no-show and completed reservations are historical and never
//! participate in conflict detection. Conflict checks and inserts happen
//! under one write lock so two bookings cannot race into the same slot.

use crate::clock::Clock;
use crate::services::CustomerDirectory;
use crate::tables::TableRegistry;
use parking_lot::RwLock;
use shared::error::{CoreError, CoreResult, Violation};
use shared::models::reservation::MINUTE_MILLIS;
use shared::models::{
    DiningTable, Reservation, ReservationRequest, ReservationStatus, TableState,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Probe offsets for alternative-slot suggestions, in minutes
const ALTERNATIVE_OFFSETS: [i64; 4] = [-120, -60, 60, 120];
/// Maximum number of alternative tables suggested
const MAX_ALTERNATIVES: usize = 5;

pub struct ReservationScheduler {
    reservations: RwLock<HashMap<String, Reservation>>,
    registry: Arc<TableRegistry>,
    directory: Arc<dyn CustomerDirectory>,
    clock: Arc<dyn Clock>,
    /// Minutes past start before a no-show may be declared
    no_show_tolerance_minutes: i64,
    /// Window length when the request omits one
    default_duration_minutes: i64,
}

impl std::fmt::Debug for ReservationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservationScheduler")
            .field("reservations", &self.reservations.read().len())
            .finish()
    }
}

impl ReservationScheduler {
    pub fn new(
        registry: Arc<TableRegistry>,
        directory: Arc<dyn CustomerDirectory>,
        clock: Arc<dyn Clock>,
        no_show_tolerance_minutes: i64,
        default_duration_minutes: i64,
    ) -> Self {
        Self {
            reservations: RwLock::new(HashMap::new()),
            registry,
            directory,
            clock,
            no_show_tolerance_minutes,
            default_duration_minutes,
        }
    }

    pub fn default_duration_minutes(&self) -> i64 {
        self.default_duration_minutes
    }

    fn conflict_in(
        reservations: &HashMap<String, Reservation>,
        table_id: i64,
        start_time: i64,
        duration_minutes: i64,
    ) -> bool {
        let end = start_time + duration_minutes * MINUTE_MILLIS;
        reservations
            .values()
            .any(|r| r.table_id == table_id && r.status.blocks_table() && r.overlaps(start_time, end))
    }

    /// Whether the window collides with any blocking reservation on the table
    pub fn check_conflict(&self, table_id: i64, start_time: i64, duration_minutes: i64) -> bool {
        Self::conflict_in(&self.reservations.read(), table_id, start_time, duration_minutes)
    }

    /// Tables that can host the party in the window: capacity >= party
    /// size, not under maintenance, zero conflicting reservations.
    /// Ordered by capacity ascending then id ascending (closest fit first,
    /// deterministic tie-break).
    pub fn find_available_tables(
        &self,
        start_time: i64,
        party_size: i32,
        duration_minutes: i64,
    ) -> Vec<DiningTable> {
        let reservations = self.reservations.read();
        let mut tables: Vec<DiningTable> = self
            .registry
            .list()
            .into_iter()
            .filter(|t| {
                t.capacity >= party_size
                    && t.state != TableState::Maintenance
                    && !Self::conflict_in(&reservations, t.id, start_time, duration_minutes)
            })
            .collect();
        tables.sort_by_key(|t| (t.capacity, t.id));
        tables
    }

    /// Up to 5 distinct available tables around the requested time
    /// (±1h, ±2h), for when the primary search comes up empty
    pub fn suggest_alternatives(&self, start_time: i64, party_size: i32) -> Vec<DiningTable> {
        let mut suggestions: Vec<DiningTable> = Vec::new();
        for offset in ALTERNATIVE_OFFSETS {
            let probe = start_time + offset * MINUTE_MILLIS;
            if probe <= self.clock.now_millis() {
                continue;
            }
            for table in self.find_available_tables(probe, party_size, self.default_duration_minutes)
            {
                if suggestions.len() >= MAX_ALTERNATIVES {
                    return suggestions;
                }
                if !suggestions.iter().any(|t| t.id == table.id) {
                    suggestions.push(table);
                }
            }
        }
        suggestions
    }

    /// Book a window. With no table given, the closest-fit available table
    /// is chosen; a Conflict is returned when none exists. The conflict
    /// check and the insert share one write lock, so the booking is
    /// evaluated against the latest committed state.
    pub fn create_reservation(&self, request: ReservationRequest) -> CoreResult<Reservation> {
        let now = self.clock.now_millis();
        let duration_minutes = request
            .duration_minutes
            .unwrap_or(self.default_duration_minutes);

        let mut violations = Vec::new();
        if request.party_size <= 0 {
            violations.push(Violation::new("party_size", "must be positive"));
        }
        if request.start_time <= now {
            violations.push(Violation::new(
                "start_time",
                "must be strictly in the future",
            ));
        }
        if duration_minutes <= 0 {
            violations.push(Violation::new("duration_minutes", "must be positive"));
        }
        if !self.directory.exists(&request.customer_id) {
            violations.push(Violation::new(
                "customer_id",
                format!("unknown customer {}", request.customer_id),
            ));
        }
        if !violations.is_empty() {
            return Err(CoreError::violations(violations));
        }

        let table = match request.table_id {
            Some(table_id) => {
                let table = self.registry.get(table_id)?;
                if table.state == TableState::Maintenance {
                    return Err(CoreError::conflict(
                        "reservation",
                        format!("table {table_id} is under maintenance"),
                    ));
                }
                if table.capacity < request.party_size {
                    return Err(CoreError::validation(
                        "party_size",
                        format!(
                            "party of {} exceeds table {} capacity {}",
                            request.party_size, table_id, table.capacity
                        ),
                    ));
                }
                table
            }
            None => self
                .find_available_tables(request.start_time, request.party_size, duration_minutes)
                .into_iter()
                .next()
                .ok_or_else(|| {
                    CoreError::conflict(
                        "reservation",
                        format!(
                            "no table available for party of {} at the requested time",
                            request.party_size
                        ),
                    )
                })?,
        };

        // Conflict check against latest committed state, atomic with insert
        let mut reservations = self.reservations.write();
        if Self::conflict_in(&reservations, table.id, request.start_time, duration_minutes) {
            return Err(CoreError::conflict(
                "reservation",
                format!("table {} is already booked in the requested window", table.id),
            ));
        }

        let reservation = Reservation {
            id: Uuid::new_v4().to_string(),
            table_id: table.id,
            customer_id: request.customer_id,
            start_time: request.start_time,
            duration_minutes,
            party_size: request.party_size,
            status: ReservationStatus::Pending,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };
        reservations.insert(reservation.id.clone(), reservation.clone());
        tracing::info!(
            reservation_id = %reservation.id,
            table_id = reservation.table_id,
            start_time = reservation.start_time,
            party_size = reservation.party_size,
            "reservation created"
        );
        Ok(reservation)
    }

    fn mutate(
        &self,
        reservation_id: &str,
        f: impl FnOnce(&mut Reservation) -> CoreResult<()>,
    ) -> CoreResult<Reservation> {
        let mut reservations = self.reservations.write();
        let reservation = reservations
            .get_mut(reservation_id)
            .ok_or_else(|| CoreError::not_found("reservation", reservation_id))?;
        f(reservation)?;
        reservation.updated_at = self.clock.now_millis();
        Ok(reservation.clone())
    }

    /// Pending -> Confirmed
    pub fn confirm(&self, reservation_id: &str) -> CoreResult<Reservation> {
        let reservation = self.mutate(reservation_id, |r| {
            if r.status != ReservationStatus::Pending {
                return Err(CoreError::invalid_transition(
                    format!("reservation {}", r.id),
                    r.status,
                    ReservationStatus::Confirmed,
                ));
            }
            r.status = ReservationStatus::Confirmed;
            Ok(())
        })?;
        tracing::info!(reservation_id, "reservation confirmed");
        Ok(reservation)
    }

    /// Pending/Confirmed -> ClientArrived; seats the party, flipping the
    /// table Reserved -> Occupied (or Free -> Occupied for an early arrival)
    pub fn client_arrives(&self, reservation_id: &str) -> CoreResult<Reservation> {
        // Validate both entities before touching either, so a rejected
        // seat never leaves the reservation half-transitioned
        let current = self.get(reservation_id)?;
        if !matches!(
            current.status,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        ) {
            return Err(CoreError::invalid_transition(
                format!("reservation {reservation_id}"),
                current.status,
                ReservationStatus::ClientArrived,
            ));
        }
        match self.registry.state_of(current.table_id)? {
            TableState::Reserved | TableState::Free => {}
            state => {
                return Err(CoreError::conflict(
                    "reservation",
                    format!(
                        "table {} is {state:?}, cannot seat reservation {reservation_id}",
                        current.table_id
                    ),
                ));
            }
        }

        self.registry
            .set_state(current.table_id, TableState::Occupied, "client arrived")?;
        self.mutate(reservation_id, |r| {
            r.status = ReservationStatus::ClientArrived;
            Ok(())
        })
    }

    /// Pending/Confirmed -> NoShow, allowed only once the tolerance window
    /// past start time has elapsed; releases the table if it was Reserved
    pub fn mark_no_show(&self, reservation_id: &str) -> CoreResult<Reservation> {
        let now = self.clock.now_millis();
        let tolerance = self.no_show_tolerance_minutes * MINUTE_MILLIS;
        let reservation = self.mutate(reservation_id, |r| {
            if !matches!(
                r.status,
                ReservationStatus::Pending | ReservationStatus::Confirmed
            ) {
                return Err(CoreError::invalid_transition(
                    format!("reservation {}", r.id),
                    r.status,
                    ReservationStatus::NoShow,
                ));
            }
            if now < r.start_time + tolerance {
                return Err(CoreError::conflict(
                    "reservation",
                    format!(
                        "no-show tolerance of {} minutes has not elapsed",
                        self.no_show_tolerance_minutes
                    ),
                ));
            }
            r.status = ReservationStatus::NoShow;
            Ok(())
        })?;

        self.release_if_reserved(&reservation, "no show")?;
        tracing::info!(reservation_id, table_id = reservation.table_id, "reservation marked no-show");
        Ok(reservation)
    }

    /// Any non-terminal -> Cancelled; releases the table if this window
    /// held it Reserved
    pub fn cancel(&self, reservation_id: &str) -> CoreResult<Reservation> {
        let reservation = self.mutate(reservation_id, |r| {
            if r.status.is_terminal() {
                return Err(CoreError::invalid_transition(
                    format!("reservation {}", r.id),
                    r.status,
                    ReservationStatus::Cancelled,
                ));
            }
            r.status = ReservationStatus::Cancelled;
            Ok(())
        })?;

        self.release_if_reserved(&reservation, "reservation cancelled")?;
        tracing::info!(reservation_id, table_id = reservation.table_id, "reservation cancelled");
        Ok(reservation)
    }

    /// ClientArrived -> Completed. The table stays Occupied; settlement
    /// frees it through the invoice flow.
    pub fn complete(&self, reservation_id: &str) -> CoreResult<Reservation> {
        self.mutate(reservation_id, |r| {
            if r.status != ReservationStatus::ClientArrived {
                return Err(CoreError::invalid_transition(
                    format!("reservation {}", r.id),
                    r.status,
                    ReservationStatus::Completed,
                ));
            }
            r.status = ReservationStatus::Completed;
            Ok(())
        })
    }

    /// Flip Free -> Reserved for every reservation whose window has opened.
    /// Driven by a caller-side ticker; booking itself never touches table
    /// state. Returns the reservations that claimed their table.
    pub fn activate_due(&self) -> Vec<Reservation> {
        let now = self.clock.now_millis();
        let due: Vec<Reservation> = self
            .reservations
            .read()
            .values()
            .filter(|r| {
                matches!(
                    r.status,
                    ReservationStatus::Pending | ReservationStatus::Confirmed
                ) && r.start_time <= now
                    && now < r.end_time()
            })
            .cloned()
            .collect();

        let mut activated = Vec::new();
        for reservation in due {
            match self.registry.state_of(reservation.table_id) {
                Ok(TableState::Free) => {
                    if self
                        .registry
                        .set_state(reservation.table_id, TableState::Reserved, "reservation due")
                        .is_ok()
                    {
                        activated.push(reservation);
                    }
                }
                _ => continue,
            }
        }
        activated
    }

    /// Release the table back to Free when this reservation's window was
    /// the active claim. The window is only considered active once open.
    fn release_if_reserved(&self, reservation: &Reservation, reason: &str) -> CoreResult<()> {
        let now = self.clock.now_millis();
        if now < reservation.start_time {
            return Ok(());
        }
        if self.registry.state_of(reservation.table_id)? == TableState::Reserved {
            self.registry
                .set_state(reservation.table_id, TableState::Free, reason)?;
        }
        Ok(())
    }

    pub fn get(&self, reservation_id: &str) -> CoreResult<Reservation> {
        self.reservations
            .read()
            .get(reservation_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("reservation", reservation_id))
    }

    /// Reservations starting inside [from, to), earliest first
    pub fn in_range(&self, from: i64, to: i64) -> Vec<Reservation> {
        let mut reservations: Vec<Reservation> = self
            .reservations
            .read()
            .values()
            .filter(|r| r.start_time >= from && r.start_time < to)
            .cloned()
            .collect();
        reservations.sort_by_key(|r| r.start_time);
        reservations
    }

    /// Blocking reservations for a table, earliest first
    pub fn active_for_table(&self, table_id: i64) -> Vec<Reservation> {
        let mut reservations: Vec<Reservation> = self
            .reservations
            .read()
            .values()
            .filter(|r| r.table_id == table_id && r.status.blocks_table())
            .cloned()
            .collect();
        reservations.sort_by_key(|r| r.start_time);
        reservations
    }
}
