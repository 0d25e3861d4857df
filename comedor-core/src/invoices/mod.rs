//! InvoiceEngine - consolidation, ITBIS math and settlement
//!
//! Builds invoices from one or more orders, applies discount before tax
//! and tip untaxed, and owns the invoice state machine
//! (Pending -> Paid | Voided). Invoice numbers come from a per-day
//! monotonic sequence guarded by the engine's lock, so concurrent issuance
//! yields distinct numbers by construction instead of a generate-check-retry
//! loop.

use crate::clock::{business_date, Clock};
use crate::money;
use chrono::NaiveDate;
use chrono_tz::Tz;
use parking_lot::{Mutex, RwLock};
use shared::error::{CoreError, CoreResult, Violation};
use shared::models::{Invoice, InvoiceStatus, Order};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Per-business-day invoice counter
struct DaySequence {
    date: NaiveDate,
    next: u32,
}

pub struct InvoiceEngine {
    invoices: RwLock<HashMap<String, Invoice>>,
    sequence: Mutex<Option<DaySequence>>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    prefix: String,
}

impl std::fmt::Debug for InvoiceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvoiceEngine")
            .field("invoices", &self.invoices.read().len())
            .field("tz", &self.tz)
            .finish()
    }
}

impl InvoiceEngine {
    pub fn new(clock: Arc<dyn Clock>, tz: Tz, prefix: impl Into<String>) -> Self {
        Self {
            invoices: RwLock::new(HashMap::new()),
            sequence: Mutex::new(None),
            clock,
            tz,
            prefix: prefix.into(),
        }
    }

    /// Next invoice number: {prefix}{YYYYMMDD}{10000+seq}, date in the
    /// business timezone, sequence restarting each business day.
    fn next_number(&self) -> String {
        let today = business_date(self.clock.now_millis(), self.tz);
        let mut guard = self.sequence.lock();
        let seq = match guard.as_mut() {
            Some(seq) if seq.date == today => {
                seq.next += 1;
                seq.next
            }
            _ => {
                *guard = Some(DaySequence {
                    date: today,
                    next: 1,
                });
                1
            }
        };
        format!("{}{}{}", self.prefix, today.format("%Y%m%d"), 10_000 + seq)
    }

    fn validate_adjustments(subtotal: f64, discount: f64, tip: f64) -> CoreResult<()> {
        let mut violations = Vec::new();
        if !discount.is_finite() || discount < 0.0 {
            violations.push(Violation::new("discount", "must be a non-negative amount"));
        } else if discount > subtotal {
            violations.push(Violation::new(
                "discount",
                format!("must not exceed subtotal {subtotal:.2}, got {discount:.2}"),
            ));
        }
        if !tip.is_finite() || tip < 0.0 {
            violations.push(Violation::new("tip", "must be a non-negative amount"));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(CoreError::violations(violations))
        }
    }

    fn build(
        &self,
        principal: &str,
        consolidated: Vec<String>,
        subtotal: f64,
        discount: f64,
        tip: f64,
        payment_method: Option<String>,
    ) -> Invoice {
        let (tax, total) = money::invoice_amounts(subtotal, discount, tip);
        Invoice {
            id: Uuid::new_v4().to_string(),
            number: self.next_number(),
            order_id: principal.to_string(),
            consolidated_order_ids: consolidated,
            subtotal,
            discount,
            tax,
            tip,
            total,
            status: InvoiceStatus::Pending,
            payment_method,
            created_at: self.clock.now_millis(),
            paid_at: None,
            void_reason: None,
        }
    }

    /// Invoice a single order.
    ///
    /// The order must be in an invoiceable status (Delivered, Pending, or
    /// already Invoiced for idempotent retries) and must not already carry
    /// a Paid invoice. Marking the order Invoiced is the Coordinator's job.
    pub fn create_invoice(
        &self,
        order: &Order,
        discount: f64,
        tip: f64,
        payment_method: Option<String>,
    ) -> CoreResult<Invoice> {
        if !order.status.is_invoiceable() {
            return Err(CoreError::conflict(
                "invoice",
                format!("order {} in {:?} status cannot be invoiced", order.id, order.status),
            ));
        }
        if self.paid_invoice_exists(&order.id) {
            return Err(CoreError::conflict(
                "invoice",
                format!("order {} already carries a paid invoice", order.id),
            ));
        }
        Self::validate_adjustments(order.subtotal, discount, tip)?;

        let invoice = self.build(&order.id, Vec::new(), order.subtotal, discount, tip, payment_method);
        self.invoices.write().insert(invoice.id.clone(), invoice.clone());
        tracing::info!(
            invoice_id = %invoice.id,
            number = %invoice.number,
            order_id = %order.id,
            total = invoice.total,
            "invoice created"
        );
        Ok(invoice)
    }

    /// Consolidate several orders from one table into a single invoice.
    ///
    /// Subtotals are summed per order; discount and tax apply once to the
    /// combined subtotal, never per order. The first order is the
    /// principal reference.
    pub fn create_group_invoice(
        &self,
        orders: &[Order],
        discount: f64,
        tip: f64,
        payment_method: Option<String>,
    ) -> CoreResult<Invoice> {
        let Some(principal) = orders.first() else {
            return Err(CoreError::conflict(
                "invoice",
                "group invoice requires at least one order",
            ));
        };
        for order in orders {
            if !order.status.is_invoiceable() {
                return Err(CoreError::conflict(
                    "invoice",
                    format!("order {} in {:?} status cannot be consolidated", order.id, order.status),
                ));
            }
            if self.paid_invoice_exists(&order.id) {
                return Err(CoreError::conflict(
                    "invoice",
                    format!("order {} already carries a paid invoice", order.id),
                ));
            }
        }

        let subtotal = money::to_f64(
            orders
                .iter()
                .map(|o| money::to_decimal(o.subtotal))
                .sum::<rust_decimal::Decimal>(),
        );
        Self::validate_adjustments(subtotal, discount, tip)?;

        let consolidated = orders.iter().map(|o| o.id.clone()).collect();
        let invoice = self.build(&principal.id, consolidated, subtotal, discount, tip, payment_method);
        self.invoices.write().insert(invoice.id.clone(), invoice.clone());
        tracing::info!(
            invoice_id = %invoice.id,
            number = %invoice.number,
            order_count = orders.len(),
            total = invoice.total,
            "group invoice created"
        );
        Ok(invoice)
    }

    /// Pending -> Paid, stamping payment time. Table release is attempted
    /// by the Coordinator afterwards.
    pub fn mark_paid(&self, invoice_id: &str, payment_method: &str) -> CoreResult<Invoice> {
        let mut invoices = self.invoices.write();
        let invoice = invoices
            .get_mut(invoice_id)
            .ok_or_else(|| CoreError::not_found("invoice", invoice_id))?;
        if invoice.status != InvoiceStatus::Pending {
            return Err(CoreError::invalid_transition(
                format!("invoice {invoice_id}"),
                invoice.status,
                InvoiceStatus::Paid,
            ));
        }
        invoice.status = InvoiceStatus::Paid;
        invoice.payment_method = Some(payment_method.to_string());
        invoice.paid_at = Some(self.clock.now_millis());
        tracing::info!(invoice_id, number = %invoice.number, payment_method, "invoice paid");
        Ok(invoice.clone())
    }

    /// Pending -> Voided, never from Paid. The underlying orders keep
    /// their Invoiced status.
    pub fn void(&self, invoice_id: &str, reason: &str) -> CoreResult<Invoice> {
        let mut invoices = self.invoices.write();
        let invoice = invoices
            .get_mut(invoice_id)
            .ok_or_else(|| CoreError::not_found("invoice", invoice_id))?;
        if invoice.status != InvoiceStatus::Pending {
            return Err(CoreError::invalid_transition(
                format!("invoice {invoice_id}"),
                invoice.status,
                InvoiceStatus::Voided,
            ));
        }
        invoice.status = InvoiceStatus::Voided;
        invoice.void_reason = Some(reason.to_string());
        tracing::info!(invoice_id, number = %invoice.number, reason, "invoice voided");
        Ok(invoice.clone())
    }

    pub fn get(&self, invoice_id: &str) -> CoreResult<Invoice> {
        self.invoices
            .read()
            .get(invoice_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("invoice", invoice_id))
    }

    /// Whether a Paid invoice already settles this order
    pub fn paid_invoice_exists(&self, order_id: &str) -> bool {
        self.invoices
            .read()
            .values()
            .any(|inv| inv.status == InvoiceStatus::Paid && inv.covers_order(order_id))
    }

    /// Pending invoices covering any of the given orders, for settlement
    /// screens that show what a table still owes
    pub fn pending_for_orders(&self, order_ids: &[String]) -> Vec<Invoice> {
        let mut pending: Vec<Invoice> = self
            .invoices
            .read()
            .values()
            .filter(|inv| {
                inv.status == InvoiceStatus::Pending
                    && order_ids.iter().any(|id| inv.covers_order(id))
            })
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        pending
    }

    /// Whether any Pending invoice still references this order
    pub fn pending_invoice_exists(&self, order_id: &str) -> bool {
        self.invoices
            .read()
            .values()
            .any(|inv| inv.status == InvoiceStatus::Pending && inv.covers_order(order_id))
    }

    /// All invoices, newest first
    pub fn list(&self) -> Vec<Invoice> {
        let mut invoices: Vec<Invoice> = self.invoices.read().values().cloned().collect();
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        invoices
    }
}
