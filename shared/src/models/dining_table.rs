//! Dining Table Model

use serde::{Deserialize, Serialize};

/// Table occupancy state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableState {
    Free,
    Occupied,
    Reserved,
    Maintenance,
}

impl TableState {
    /// Occupancy transition table
    ///
    /// Free -> Occupied | Reserved | Maintenance
    /// Occupied -> Free | Maintenance
    /// Reserved -> Occupied (client arrives) | Free (reservation dropped) | Maintenance
    /// Maintenance -> Free
    pub fn can_transition_to(self, next: TableState) -> bool {
        use TableState::*;
        matches!(
            (self, next),
            (Free, Occupied)
                | (Free, Reserved)
                | (Free, Maintenance)
                | (Occupied, Free)
                | (Occupied, Maintenance)
                | (Reserved, Occupied)
                | (Reserved, Free)
                | (Reserved, Maintenance)
                | (Maintenance, Free)
        )
    }
}

/// Dining table entity
///
/// Tables are created once at floor setup and never destroyed, only
/// re-stated. `state_changed_at` is stamped on every accepted transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: i64,
    pub name: String,
    pub capacity: i32,
    pub state: TableState,
    /// Unix millis of the last accepted state transition
    pub state_changed_at: i64,
}

/// Create dining table payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTableSpec {
    pub id: i64,
    pub name: String,
    pub capacity: i32,
}
