//! TableRegistry - occupancy state machine for the physical floor
//!
//! Owns each table's occupancy state and enforces the transition table.
//! Whether an Occupied table may be released depends on the OrderLedger
//! and InvoiceEngine and is decided by the Coordinator; the registry only
//! guards transitions.

use crate::clock::Clock;
use parking_lot::RwLock;
use shared::error::{CoreError, CoreResult, Violation};
use shared::models::{DiningTable, DiningTableSpec, TableState};
use std::collections::HashMap;
use std::sync::Arc;

pub struct TableRegistry {
    tables: RwLock<HashMap<i64, DiningTable>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRegistry")
            .field("tables", &self.tables.read().len())
            .finish()
    }
}

impl TableRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Register a table at floor setup. Tables start Free and are never
    /// destroyed afterwards, only re-stated.
    pub fn register(&self, spec: DiningTableSpec) -> CoreResult<DiningTable> {
        let mut violations = Vec::new();
        if spec.name.trim().is_empty() {
            violations.push(Violation::new("name", "must not be empty"));
        }
        if spec.capacity <= 0 {
            violations.push(Violation::new("capacity", "must be positive"));
        }
        if !violations.is_empty() {
            return Err(CoreError::violations(violations));
        }

        let mut tables = self.tables.write();
        if tables.contains_key(&spec.id) {
            return Err(CoreError::conflict(
                "table",
                format!("table {} already registered", spec.id),
            ));
        }
        let table = DiningTable {
            id: spec.id,
            name: spec.name,
            capacity: spec.capacity,
            state: TableState::Free,
            state_changed_at: self.clock.now_millis(),
        };
        tables.insert(table.id, table.clone());
        tracing::info!(table_id = table.id, capacity = table.capacity, "table registered");
        Ok(table)
    }

    /// Apply an occupancy transition, stamping the change time.
    ///
    /// Rejected transitions name both the current and the requested state;
    /// no transition is ever silently dropped.
    pub fn set_state(
        &self,
        table_id: i64,
        new_state: TableState,
        reason: &str,
    ) -> CoreResult<DiningTable> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(&table_id)
            .ok_or_else(|| CoreError::not_found("table", table_id))?;

        if !table.state.can_transition_to(new_state) {
            return Err(CoreError::invalid_transition(
                format!("table {table_id}"),
                table.state,
                new_state,
            ));
        }

        let from = table.state;
        table.state = new_state;
        table.state_changed_at = self.clock.now_millis();
        tracing::info!(
            table_id,
            from = ?from,
            to = ?new_state,
            reason,
            "table state changed"
        );
        Ok(table.clone())
    }

    pub fn get(&self, table_id: i64) -> CoreResult<DiningTable> {
        self.tables
            .read()
            .get(&table_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("table", table_id))
    }

    pub fn state_of(&self, table_id: i64) -> CoreResult<TableState> {
        self.get(table_id).map(|t| t.state)
    }

    pub fn capacity_of(&self, table_id: i64) -> CoreResult<i32> {
        self.get(table_id).map(|t| t.capacity)
    }

    /// All tables ordered by id
    pub fn list(&self) -> Vec<DiningTable> {
        let mut tables: Vec<DiningTable> = self.tables.read().values().cloned().collect();
        tables.sort_by_key(|t| t.id);
        tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    fn create_test_registry() -> (Arc<FixedClock>, TableRegistry) {
        let clock = Arc::new(FixedClock::new(1_000_000));
        let registry = TableRegistry::new(clock.clone());
        registry
            .register(DiningTableSpec {
                id: 1,
                name: "Mesa 1".to_string(),
                capacity: 4,
            })
            .unwrap();
        (clock, registry)
    }

    #[test]
    fn test_register_rejects_bad_spec() {
        let (_, registry) = create_test_registry();
        let err = registry
            .register(DiningTableSpec {
                id: 2,
                name: "".to_string(),
                capacity: 0,
            })
            .unwrap_err();
        match err {
            CoreError::Validation(violations) => assert_eq!(violations.len(), 2),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_register_duplicate_id_conflicts() {
        let (_, registry) = create_test_registry();
        let err = registry
            .register(DiningTableSpec {
                id: 1,
                name: "Mesa 1 bis".to_string(),
                capacity: 2,
            })
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_accepted_transition_stamps_time() {
        let (clock, registry) = create_test_registry();
        clock.set(2_000_000);
        let table = registry
            .set_state(1, TableState::Occupied, "order opened")
            .unwrap();
        assert_eq!(table.state, TableState::Occupied);
        assert_eq!(table.state_changed_at, 2_000_000);
    }

    #[test]
    fn test_rejected_transition_names_both_states() {
        let (_, registry) = create_test_registry();
        registry
            .set_state(1, TableState::Occupied, "order opened")
            .unwrap();
        let err = registry
            .set_state(1, TableState::Reserved, "booking")
            .unwrap_err();
        match err {
            CoreError::Conflict {
                current, requested, ..
            } => {
                assert_eq!(current, "Occupied");
                assert_eq!(requested, "Reserved");
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_maintenance_cycle() {
        let (_, registry) = create_test_registry();
        registry
            .set_state(1, TableState::Maintenance, "spilled")
            .unwrap();
        let err = registry
            .set_state(1, TableState::Occupied, "order opened")
            .unwrap_err();
        assert!(err.is_conflict());
        registry.set_state(1, TableState::Free, "cleaned").unwrap();
        assert_eq!(registry.state_of(1).unwrap(), TableState::Free);
    }

    #[test]
    fn test_unknown_table_not_found() {
        let (_, registry) = create_test_registry();
        assert!(registry
            .set_state(99, TableState::Occupied, "x")
            .unwrap_err()
            .is_not_found());
        assert!(registry.capacity_of(99).unwrap_err().is_not_found());
        assert_eq!(registry.capacity_of(1).unwrap(), 4);
    }
}
