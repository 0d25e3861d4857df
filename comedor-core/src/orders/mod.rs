//! OrderLedger - order lifecycle and line-item totals
//!
//! Owns every order (dine-in and take-out) and its money math. Prices and
//! display names are captured from the ProductCatalog at line-insertion
//! time; the ledger never trusts client-supplied amounts. Table occupation
//! and release are sequenced by the Coordinator.

use crate::clock::Clock;
use crate::money;
use crate::services::{CustomerDirectory, ProductCatalog};
use parking_lot::RwLock;
use shared::error::{CoreError, CoreResult, Violation};
use shared::models::{Order, OrderDraft, OrderLine, OrderLineInput, OrderStatus, OrderTotals};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub struct OrderLedger {
    orders: RwLock<HashMap<String, Order>>,
    catalog: Arc<dyn ProductCatalog>,
    directory: Arc<dyn CustomerDirectory>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for OrderLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderLedger")
            .field("orders", &self.orders.read().len())
            .finish()
    }
}

impl OrderLedger {
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        directory: Arc<dyn CustomerDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            catalog,
            directory,
            clock,
        }
    }

    /// Validate one requested line against the catalog.
    ///
    /// Quantity bounds, product existence, availability and stock are all
    /// checked here, at insertion time. Returns the line with captured
    /// price on success, otherwise pushes every failure onto `violations`.
    fn build_line(
        &self,
        index: usize,
        input: &OrderLineInput,
        violations: &mut Vec<Violation>,
    ) -> Option<OrderLine> {
        let field = format!("lines[{index}]");
        if input.quantity <= 0 {
            violations.push(Violation::new(
                format!("{field}.quantity"),
                format!("must be positive, got {}", input.quantity),
            ));
            return None;
        }
        if input.quantity > money::MAX_QUANTITY {
            violations.push(Violation::new(
                format!("{field}.quantity"),
                format!("exceeds maximum allowed ({})", money::MAX_QUANTITY),
            ));
            return None;
        }

        let Some(product) = self.catalog.get_product(input.product_id) else {
            violations.push(Violation::new(
                format!("{field}.product_id"),
                format!("unknown product {}", input.product_id),
            ));
            return None;
        };
        if !product.is_available {
            violations.push(Violation::new(
                format!("{field}.product_id"),
                format!("product {} is not available", product.name),
            ));
            return None;
        }
        if !(0.0..=money::MAX_PRICE).contains(&product.price) {
            violations.push(Violation::new(
                format!("{field}.product_id"),
                format!(
                    "product {} has an out-of-range price {}",
                    product.name, product.price
                ),
            ));
            return None;
        }
        if product.stock_quantity < input.quantity {
            violations.push(Violation::new(
                format!("{field}.quantity"),
                format!(
                    "insufficient stock for {}: requested {}, available {}",
                    product.name, input.quantity, product.stock_quantity
                ),
            ));
            return None;
        }

        Some(OrderLine {
            product_id: product.id,
            name: product.name,
            unit_price: product.price,
            quantity: input.quantity,
            subtotal: money::line_subtotal(product.price, input.quantity),
        })
    }

    /// Open a new order. All violations are collected and rejected before
    /// any state change. Lines requesting the same product are merged.
    pub fn create_order(&self, draft: OrderDraft) -> CoreResult<Order> {
        let mut violations = Vec::new();

        if draft.lines.is_empty() {
            violations.push(Violation::new("lines", "line list must not be empty"));
        }
        if let Some(customer_id) = &draft.customer_id
            && !self.directory.exists(customer_id)
        {
            violations.push(Violation::new(
                "customer_id",
                format!("unknown customer {customer_id}"),
            ));
        }

        // Merge duplicate product requests before catalog validation so
        // stock is checked against the combined quantity
        let mut merged: Vec<OrderLineInput> = Vec::new();
        for input in &draft.lines {
            match merged.iter_mut().find(|l| l.product_id == input.product_id) {
                Some(existing) => existing.quantity += input.quantity,
                None => merged.push(input.clone()),
            }
        }

        let mut lines = Vec::with_capacity(merged.len());
        for (index, input) in merged.iter().enumerate() {
            if let Some(line) = self.build_line(index, input, &mut violations) {
                lines.push(line);
            }
        }

        if !violations.is_empty() {
            return Err(CoreError::violations(violations));
        }

        let now = self.clock.now_millis();
        let mut order = Order {
            id: Uuid::new_v4().to_string(),
            table_id: draft.table_id,
            customer_id: draft.customer_id,
            status: OrderStatus::Pending,
            lines,
            note: draft.note,
            subtotal: 0.0,
            tax: 0.0,
            total: 0.0,
            created_at: now,
            updated_at: now,
        };
        money::recalculate_order(&mut order);

        self.orders.write().insert(order.id.clone(), order.clone());
        tracing::info!(
            order_id = %order.id,
            table_id = ?order.table_id,
            total = order.total,
            "order created"
        );
        Ok(order)
    }

    /// Diff-based line edit, allowed only while the order is editable.
    ///
    /// Lines absent from the new set are removed, lines present in both
    /// keep their identity and captured unit price with the quantity
    /// updated in place, and new lines are inserted with a fresh price
    /// capture. Totals are recomputed after the merge.
    pub fn update_order(&self, order_id: &str, new_lines: &[OrderLineInput]) -> CoreResult<Order> {
        let mut violations = Vec::new();
        if new_lines.is_empty() {
            violations.push(Violation::new("lines", "line list must not be empty"));
        }

        let mut merged: Vec<OrderLineInput> = Vec::new();
        for input in new_lines {
            match merged.iter_mut().find(|l| l.product_id == input.product_id) {
                Some(existing) => existing.quantity += input.quantity,
                None => merged.push(input.clone()),
            }
        }

        let mut orders = self.orders.write();
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| CoreError::not_found("order", order_id))?;

        if !order.status.is_editable() {
            return Err(CoreError::conflict(
                "order",
                format!(
                    "lines are only editable in Pending/Preparing, order {} is {:?}",
                    order_id, order.status
                ),
            ));
        }

        // Build the insert set first so a validation failure leaves the
        // order untouched
        let mut inserts = Vec::new();
        for (index, input) in merged.iter().enumerate() {
            let existing = order.lines.iter().any(|l| l.product_id == input.product_id);
            if existing {
                // Quantity-only update, still bounds-checked
                if input.quantity <= 0 {
                    violations.push(Violation::new(
                        format!("lines[{index}].quantity"),
                        format!("must be positive, got {}", input.quantity),
                    ));
                } else if input.quantity > money::MAX_QUANTITY {
                    violations.push(Violation::new(
                        format!("lines[{index}].quantity"),
                        format!("exceeds maximum allowed ({})", money::MAX_QUANTITY),
                    ));
                }
            } else if let Some(line) = self.build_line(index, input, &mut violations) {
                inserts.push(line);
            }
        }
        if !violations.is_empty() {
            return Err(CoreError::violations(violations));
        }

        // Remove lines absent from the new set
        order
            .lines
            .retain(|line| merged.iter().any(|input| input.product_id == line.product_id));
        // Update quantities in place, preserving captured prices
        for line in &mut order.lines {
            if let Some(input) = merged.iter().find(|i| i.product_id == line.product_id) {
                line.quantity = input.quantity;
            }
        }
        order.lines.extend(inserts);

        money::recalculate_order(order);
        order.updated_at = self.clock.now_millis();
        tracing::info!(order_id, line_count = order.lines.len(), total = order.total, "order lines updated");
        Ok(order.clone())
    }

    /// Kitchen-flow transition. The Coordinator decides whether a
    /// cancellation also releases the table.
    pub fn transition(&self, order_id: &str, new_status: OrderStatus) -> CoreResult<Order> {
        let mut orders = self.orders.write();
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| CoreError::not_found("order", order_id))?;

        if !order.status.can_transition_to(new_status) {
            return Err(CoreError::invalid_transition(
                format!("order {order_id}"),
                order.status,
                new_status,
            ));
        }

        let from = order.status;
        order.status = new_status;
        order.updated_at = self.clock.now_millis();
        tracing::info!(order_id, from = ?from, to = ?new_status, "order transitioned");
        Ok(order.clone())
    }

    /// Settle an order into an invoice. Unlike `transition`, this accepts
    /// any invoiceable status (a Pending counter-service order never walks
    /// the kitchen flow) and is idempotent for already-Invoiced orders.
    pub fn mark_invoiced(&self, order_id: &str) -> CoreResult<Order> {
        let mut orders = self.orders.write();
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| CoreError::not_found("order", order_id))?;

        if order.status == OrderStatus::Invoiced {
            return Ok(order.clone());
        }
        if !order.status.is_invoiceable() {
            return Err(CoreError::invalid_transition(
                format!("order {order_id}"),
                order.status,
                OrderStatus::Invoiced,
            ));
        }
        order.status = OrderStatus::Invoiced;
        order.updated_at = self.clock.now_millis();
        tracing::info!(order_id, "order invoiced");
        Ok(order.clone())
    }

    /// Attach a free-text note while the order is still editable
    pub fn add_note(&self, order_id: &str, note: &str) -> CoreResult<Order> {
        let mut orders = self.orders.write();
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| CoreError::not_found("order", order_id))?;
        if !order.status.is_editable() {
            return Err(CoreError::conflict(
                "order",
                format!("cannot annotate order in {:?} status", order.status),
            ));
        }
        order.note = Some(note.to_string());
        order.updated_at = self.clock.now_millis();
        Ok(order.clone())
    }

    /// Pure, idempotent totals snapshot recomputed from current lines
    pub fn compute_totals(&self, order_id: &str) -> CoreResult<OrderTotals> {
        let orders = self.orders.read();
        let order = orders
            .get(order_id)
            .ok_or_else(|| CoreError::not_found("order", order_id))?;
        let mut probe = order.clone();
        money::recalculate_order(&mut probe);
        Ok(OrderTotals {
            subtotal: probe.subtotal,
            tax: probe.tax,
            total: probe.total,
            item_count: money::item_count(&probe.lines),
        })
    }

    pub fn get(&self, order_id: &str) -> CoreResult<Order> {
        self.orders
            .read()
            .get(order_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("order", order_id))
    }

    /// Orders still claiming the table (not Invoiced, not Cancelled),
    /// oldest first
    pub fn active_for_table(&self, table_id: i64) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .values()
            .filter(|o| o.table_id == Some(table_id) && o.status.is_active())
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }

    pub fn has_active_for_table(&self, table_id: i64) -> bool {
        self.orders
            .read()
            .values()
            .any(|o| o.table_id == Some(table_id) && o.status.is_active())
    }

    /// Invoiced orders for the table (kept for settlement checks)
    pub fn invoiced_for_table(&self, table_id: i64) -> Vec<Order> {
        self.orders
            .read()
            .values()
            .filter(|o| o.table_id == Some(table_id) && o.status == OrderStatus::Invoiced)
            .cloned()
            .collect()
    }

    /// All active orders, oldest first
    pub fn list_active(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .values()
            .filter(|o| o.status.is_active())
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }
}

#[cfg(test)]
mod tests;
