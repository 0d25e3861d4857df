//! Invoice Model

use serde::{Deserialize, Serialize};

/// Invoice state
///
/// Pending --mark_paid--> Paid (terminal)
/// Pending --void--> Voided (terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Voided,
}

/// Invoice entity
///
/// `order_id` is the principal order; `consolidated_order_ids` lists every
/// order covered by a group invoice (empty for single-order invoices).
///
/// Amount invariant: total = (subtotal - discount)
///                         + ITBIS(subtotal - discount)
///                         + tip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    /// Globally unique human-readable number, e.g. FAC2026083110001
    pub number: String,
    pub order_id: String,
    pub consolidated_order_ids: Vec<String>,
    /// Amounts in currency unit
    pub subtotal: f64,
    pub discount: f64,
    pub tax: f64,
    pub tip: f64,
    pub total: f64,
    pub status: InvoiceStatus,
    pub payment_method: Option<String>,
    pub created_at: i64,
    pub paid_at: Option<i64>,
    pub void_reason: Option<String>,
}

impl Invoice {
    /// Whether this invoice settles the given order (principal or consolidated)
    pub fn covers_order(&self, order_id: &str) -> bool {
        self.order_id == order_id || self.consolidated_order_ids.iter().any(|id| id == order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers_order() {
        let invoice = Invoice {
            id: "inv-1".to_string(),
            number: "FAC2026083110001".to_string(),
            order_id: "ord-1".to_string(),
            consolidated_order_ids: vec!["ord-1".to_string(), "ord-2".to_string()],
            subtotal: 350.50,
            discount: 0.0,
            tax: 63.09,
            tip: 0.0,
            total: 413.59,
            status: InvoiceStatus::Pending,
            payment_method: None,
            created_at: 0,
            paid_at: None,
            void_reason: None,
        };
        assert!(invoice.covers_order("ord-1"));
        assert!(invoice.covers_order("ord-2"));
        assert!(!invoice.covers_order("ord-3"));
    }
}
