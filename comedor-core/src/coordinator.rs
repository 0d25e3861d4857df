//! Coordinator - cross-entity sequencing
//!
//! A thin policy layer with no state of its own beyond the per-table lock
//! map. Every operation that mutates more than one of {table, order,
//! invoice, reservation} for the same table runs under that table's mutex
//! (the consistency unit), so a concurrent reader can never observe an
//! order settled while its table is wrongly held, or two orders racing a
//! table's Free slot. Single-entity reads stay lock-free.

use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::invoices::InvoiceEngine;
use crate::orders::OrderLedger;
use crate::reservations::ReservationScheduler;
use crate::services::{
    CustomerDirectory, NotificationGateway, NotificationKind, ProductCatalog,
};
use crate::tables::TableRegistry;
use dashmap::DashMap;
use parking_lot::Mutex;
use shared::error::{CoreError, CoreResult};
use shared::models::{
    DiningTable, Invoice, Order, OrderDraft, OrderLineInput, OrderStatus, OrderTotals,
    Reservation, ReservationRequest, TableState,
};
use std::sync::Arc;

pub struct Coordinator {
    registry: Arc<TableRegistry>,
    ledger: Arc<OrderLedger>,
    invoices: Arc<InvoiceEngine>,
    scheduler: Arc<ReservationScheduler>,
    gateway: Arc<dyn NotificationGateway>,
    table_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("registry", &self.registry)
            .field("ledger", &self.ledger)
            .finish()
    }
}

impl Coordinator {
    pub fn new(
        config: &CoreConfig,
        catalog: Arc<dyn ProductCatalog>,
        directory: Arc<dyn CustomerDirectory>,
        gateway: Arc<dyn NotificationGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let registry = Arc::new(TableRegistry::new(clock.clone()));
        let ledger = Arc::new(OrderLedger::new(catalog, directory.clone(), clock.clone()));
        let invoices = Arc::new(InvoiceEngine::new(
            clock.clone(),
            config.timezone,
            config.invoice_prefix.clone(),
        ));
        let scheduler = Arc::new(ReservationScheduler::new(
            registry.clone(),
            directory,
            clock,
            config.no_show_tolerance_minutes,
            config.default_reservation_minutes,
        ));
        Self {
            registry,
            ledger,
            invoices,
            scheduler,
            gateway,
            table_locks: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &OrderLedger {
        &self.ledger
    }

    pub fn invoices(&self) -> &InvoiceEngine {
        &self.invoices
    }

    pub fn scheduler(&self) -> &ReservationScheduler {
        &self.scheduler
    }

    /// One mutex per table, lazily created and never removed (the floor
    /// is a small fixed set)
    fn table_lock(&self, table_id: i64) -> Arc<Mutex<()>> {
        self.table_locks
            .entry(table_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `f` while holding the table's write lock. Take-out operations
    /// touch a single entity and need no cross-entity lock.
    fn with_table_lock<T>(
        &self,
        table_id: Option<i64>,
        f: impl FnOnce() -> CoreResult<T>,
    ) -> CoreResult<T> {
        match table_id {
            Some(table_id) => {
                let lock = self.table_lock(table_id);
                let _guard = lock.lock();
                f()
            }
            None => f(),
        }
    }

    // ==================== orders ====================

    /// Open a ticket. A dine-in order occupies its table (Free ->
    /// Occupied); an already-Occupied table accepts further rounds.
    /// Reserved and Maintenance tables reject walk-ins: arrivals flow
    /// through the scheduler.
    pub fn open_order(&self, draft: OrderDraft) -> CoreResult<Order> {
        self.with_table_lock(draft.table_id, || {
            if let Some(table_id) = draft.table_id {
                match self.registry.state_of(table_id)? {
                    TableState::Free => {
                        let order = self.ledger.create_order(draft.clone())?;
                        self.registry
                            .set_state(table_id, TableState::Occupied, "order opened")?;
                        return Ok(order);
                    }
                    TableState::Occupied => return self.ledger.create_order(draft.clone()),
                    state => {
                        return Err(CoreError::conflict(
                            "order",
                            format!("table {table_id} is {state:?}, cannot open an order"),
                        ));
                    }
                }
            }
            self.ledger.create_order(draft.clone())
        })
    }

    /// Replace an order's requested lines (diff-based, see OrderLedger)
    pub fn update_order(&self, order_id: &str, new_lines: &[OrderLineInput]) -> CoreResult<Order> {
        let order = self.ledger.get(order_id)?;
        self.with_table_lock(order.table_id, || self.ledger.update_order(order_id, new_lines))
    }

    /// Walk the kitchen flow. Cancelling an order releases the table only
    /// when nothing else on it remains active or unpaid.
    pub fn transition_order(&self, order_id: &str, new_status: OrderStatus) -> CoreResult<Order> {
        let order = self.ledger.get(order_id)?;
        self.with_table_lock(order.table_id, || {
            let order = self.ledger.transition(order_id, new_status)?;
            if new_status == OrderStatus::Cancelled
                && let Some(table_id) = order.table_id
                && self.release_eligible(table_id)
                && self.registry.state_of(table_id)? == TableState::Occupied
            {
                self.registry
                    .set_state(table_id, TableState::Free, "last order cancelled")?;
            }
            Ok(order)
        })
    }

    // ==================== invoices ====================

    /// Invoice a single order and mark it Invoiced. The table is not
    /// released: it only becomes eligible once every order on it is
    /// settled and paid.
    pub fn invoice_order(
        &self,
        order_id: &str,
        discount: f64,
        tip: f64,
        payment_method: Option<String>,
    ) -> CoreResult<Invoice> {
        let order = self.ledger.get(order_id)?;
        self.with_table_lock(order.table_id, || {
            let order = self.ledger.get(order_id)?;
            let invoice = self
                .invoices
                .create_invoice(&order, discount, tip, payment_method.clone())?;
            self.ledger.mark_invoiced(order_id)?;
            Ok(invoice)
        })
    }

    /// Consolidate every Delivered/Pending order on an Occupied table
    /// into one group invoice and mark them all Invoiced
    pub fn invoice_table(
        &self,
        table_id: i64,
        discount: f64,
        tip: f64,
        payment_method: Option<String>,
    ) -> CoreResult<Invoice> {
        self.with_table_lock(Some(table_id), || {
            let state = self.registry.state_of(table_id)?;
            if state != TableState::Occupied {
                return Err(CoreError::conflict(
                    "invoice",
                    format!("table {table_id} is {state:?}, group invoicing requires Occupied"),
                ));
            }
            let orders: Vec<Order> = self
                .ledger
                .active_for_table(table_id)
                .into_iter()
                .filter(|o| {
                    matches!(o.status, OrderStatus::Delivered | OrderStatus::Pending)
                })
                .collect();
            if orders.is_empty() {
                return Err(CoreError::conflict(
                    "invoice",
                    format!("table {table_id} has no orders ready for invoicing"),
                ));
            }

            let invoice =
                self.invoices
                    .create_group_invoice(&orders, discount, tip, payment_method.clone())?;
            for order in &orders {
                self.ledger.mark_invoiced(&order.id)?;
            }
            Ok(invoice)
        })
    }

    /// Settle an invoice and free the table once nothing on it remains
    /// unsettled. The notification goes out after the mutation commits
    /// and never fails the payment.
    pub fn pay_invoice(&self, invoice_id: &str, payment_method: &str) -> CoreResult<Invoice> {
        let invoice = self.invoices.get(invoice_id)?;
        let table_id = self.ledger.get(&invoice.order_id).ok().and_then(|o| o.table_id);

        let paid = self.with_table_lock(table_id, || {
            let paid = self.invoices.mark_paid(invoice_id, payment_method)?;
            if let Some(table_id) = table_id
                && self.release_eligible(table_id)
                && self.registry.state_of(table_id)? == TableState::Occupied
            {
                self.registry
                    .set_state(table_id, TableState::Free, "all orders settled")?;
            }
            Ok(paid)
        })?;

        if let Some(customer_id) = self
            .ledger
            .get(&paid.order_id)
            .ok()
            .and_then(|o| o.customer_id)
        {
            let payload = serde_json::json!({
                "invoice_number": paid.number,
                "total": paid.total,
            });
            if !self
                .gateway
                .send(NotificationKind::InvoicePaid, &customer_id, &payload)
            {
                tracing::warn!(invoice_id, customer_id, "invoice notification failed, will retry out-of-band");
            }
        }
        Ok(paid)
    }

    /// Void a Pending invoice. Orders keep their Invoiced status and the
    /// table stays Occupied: a voided invoice settles nothing.
    pub fn void_invoice(&self, invoice_id: &str, reason: &str) -> CoreResult<Invoice> {
        let invoice = self.invoices.get(invoice_id)?;
        let table_id = self.ledger.get(&invoice.order_id).ok().and_then(|o| o.table_id);
        self.with_table_lock(table_id, || self.invoices.void(invoice_id, reason))
    }

    /// A table may be freed when no order is still running and every
    /// Invoiced order carries a Paid invoice
    pub fn can_release(&self, table_id: i64) -> bool {
        let lock = self.table_lock(table_id);
        let _guard = lock.lock();
        self.release_eligible(table_id)
    }

    fn release_eligible(&self, table_id: i64) -> bool {
        if self.ledger.has_active_for_table(table_id) {
            return false;
        }
        self.ledger
            .invoiced_for_table(table_id)
            .iter()
            .all(|order| self.invoices.paid_invoice_exists(&order.id))
    }

    // ==================== reservations ====================

    /// Book a window. With an explicit table the booking runs under that
    /// table's lock; auto-selection re-checks the chosen slot under the
    /// lock and falls through to the next candidate if it was raced away.
    pub fn create_reservation(&self, request: ReservationRequest) -> CoreResult<Reservation> {
        if request.table_id.is_some() {
            return self.with_table_lock(request.table_id, || {
                self.scheduler.create_reservation(request.clone())
            });
        }

        let duration = request
            .duration_minutes
            .unwrap_or(self.scheduler_default_duration());
        let candidates =
            self.scheduler
                .find_available_tables(request.start_time, request.party_size, duration);
        for table in candidates {
            let mut attempt = request.clone();
            attempt.table_id = Some(table.id);
            match self.with_table_lock(Some(table.id), || {
                self.scheduler.create_reservation(attempt.clone())
            }) {
                Ok(reservation) => return Ok(reservation),
                Err(err) if err.is_conflict() => continue,
                Err(err) => return Err(err),
            }
        }
        // No candidates at all, or every candidate was raced away:
        // delegate once more for the canonical error
        self.scheduler.create_reservation(request)
    }

    fn scheduler_default_duration(&self) -> i64 {
        // The scheduler owns the configured default; requests without a
        // duration search with the same value the booking will use
        self.scheduler.default_duration_minutes()
    }

    pub fn confirm_reservation(&self, reservation_id: &str) -> CoreResult<Reservation> {
        let reservation = self.scheduler.confirm(reservation_id)?;
        let payload = serde_json::json!({
            "table_id": reservation.table_id,
            "start_time": reservation.start_time,
        });
        if !self.gateway.send(
            NotificationKind::ReservationConfirmed,
            &reservation.customer_id,
            &payload,
        ) {
            tracing::warn!(reservation_id, "confirmation notification failed, will retry out-of-band");
        }
        Ok(reservation)
    }

    /// Seat an arriving party (Reserved/Free -> Occupied)
    pub fn client_arrives(&self, reservation_id: &str) -> CoreResult<Reservation> {
        let reservation = self.scheduler.get(reservation_id)?;
        self.with_table_lock(Some(reservation.table_id), || {
            self.scheduler.client_arrives(reservation_id)
        })
    }

    pub fn mark_no_show(&self, reservation_id: &str) -> CoreResult<Reservation> {
        let reservation = self.scheduler.get(reservation_id)?;
        let marked = self.with_table_lock(Some(reservation.table_id), || {
            self.scheduler.mark_no_show(reservation_id)
        })?;
        let payload = serde_json::json!({ "table_id": marked.table_id });
        self.gateway.send(
            NotificationKind::ReservationNoShow,
            &marked.customer_id,
            &payload,
        );
        Ok(marked)
    }

    pub fn cancel_reservation(&self, reservation_id: &str) -> CoreResult<Reservation> {
        let reservation = self.scheduler.get(reservation_id)?;
        let cancelled = self.with_table_lock(Some(reservation.table_id), || {
            self.scheduler.cancel(reservation_id)
        })?;
        let payload = serde_json::json!({ "table_id": cancelled.table_id });
        self.gateway.send(
            NotificationKind::ReservationCancelled,
            &cancelled.customer_id,
            &payload,
        );
        Ok(cancelled)
    }

    pub fn complete_reservation(&self, reservation_id: &str) -> CoreResult<Reservation> {
        self.scheduler.complete(reservation_id)
    }

    /// Claim tables for reservations whose window has opened; meant to be
    /// driven by a periodic caller-side ticker
    pub fn activate_due_reservations(&self) -> Vec<Reservation> {
        self.scheduler.activate_due()
    }

    // ==================== query surface ====================

    pub fn list_tables(&self) -> Vec<DiningTable> {
        self.registry.list()
    }

    pub fn get_order(&self, order_id: &str) -> CoreResult<Order> {
        self.ledger.get(order_id)
    }

    pub fn order_totals(&self, order_id: &str) -> CoreResult<OrderTotals> {
        self.ledger.compute_totals(order_id)
    }

    pub fn get_invoice(&self, invoice_id: &str) -> CoreResult<Invoice> {
        self.invoices.get(invoice_id)
    }

    pub fn get_reservation(&self, reservation_id: &str) -> CoreResult<Reservation> {
        self.scheduler.get(reservation_id)
    }

    pub fn active_orders_for_table(&self, table_id: i64) -> Vec<Order> {
        self.ledger.active_for_table(table_id)
    }

    pub fn reservations_in_range(&self, from: i64, to: i64) -> Vec<Reservation> {
        self.scheduler.in_range(from, to)
    }
}
