//! Reservation Model

use serde::{Deserialize, Serialize};

/// Milliseconds per minute, used for reservation window math
pub const MINUTE_MILLIS: i64 = 60_000;

/// Reservation lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    ClientArrived,
    NoShow,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    /// Terminal states retained only for history
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReservationStatus::NoShow
                | ReservationStatus::Cancelled
                | ReservationStatus::Completed
        )
    }

    /// Whether this reservation's window still claims the table.
    /// Cancelled, NoShow and Completed reservations are historical and
    /// never participate in conflict detection.
    pub fn blocks_table(self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending
                | ReservationStatus::Confirmed
                | ReservationStatus::ClientArrived
        )
    }
}

/// Reservation entity
///
/// `start_time` is stored in UTC millis; timezone normalization happens at
/// the boundary that parses wall-clock input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub table_id: i64,
    pub customer_id: String,
    pub start_time: i64,
    pub duration_minutes: i64,
    pub party_size: i32,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Reservation {
    /// Exclusive end of the occupied interval [start, start + duration)
    pub fn end_time(&self) -> i64 {
        self.start_time + self.duration_minutes * MINUTE_MILLIS
    }

    /// Half-open interval overlap: back-to-back windows never conflict
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        self.start_time < end && start < self.end_time()
    }
}

/// Create reservation payload
///
/// `table_id` absent delegates table selection to the availability search;
/// `duration_minutes` absent falls back to the configured default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub table_id: Option<i64>,
    pub customer_id: String,
    pub start_time: i64,
    pub party_size: i32,
    pub duration_minutes: Option<i64>,
    pub notes: Option<String>,
}
