//! Order Model

use serde::{Deserialize, Serialize};

/// Order lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Delivered,
    Invoiced,
    Cancelled,
}

impl OrderStatus {
    /// Kitchen-flow transition table
    ///
    /// Pending -> Preparing | Cancelled
    /// Preparing -> Ready | Cancelled
    /// Ready -> Delivered
    /// Delivered -> Invoiced
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Preparing)
                | (Pending, Cancelled)
                | (Preparing, Ready)
                | (Preparing, Cancelled)
                | (Ready, Delivered)
                | (Delivered, Invoiced)
        )
    }

    /// Still counts against the table (not yet settled or cancelled)
    pub fn is_active(self) -> bool {
        !matches!(self, OrderStatus::Invoiced | OrderStatus::Cancelled)
    }

    /// Line items may still be edited
    pub fn is_editable(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Preparing)
    }

    /// Accepted by the invoice engine. Pending is deliberately included:
    /// counter service invoices before the kitchen flow finishes, and
    /// Invoiced is tolerated for idempotent retries.
    pub fn is_invoiceable(self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Delivered | OrderStatus::Invoiced
        )
    }
}

/// Order line item
///
/// `unit_price` and `name` are captured from the catalog when the line is
/// inserted and never change afterwards, so later catalog price edits do
/// not retroactively alter existing orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i64,
    pub name: String,
    /// Price in currency unit, captured at insertion
    pub unit_price: f64,
    pub quantity: i32,
    /// quantity x unit_price, rounded to 2 decimals
    pub subtotal: f64,
}

/// Order entity
///
/// `table_id` absent means a take-out ticket. Totals are always recomputed
/// from the current lines, never hand-edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub table_id: Option<i64>,
    pub customer_id: Option<String>,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub note: Option<String>,
    /// Amounts in currency unit
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Requested line (client side); price is looked up server-side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub product_id: i64,
    pub quantity: i32,
}

/// Create order payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderDraft {
    pub table_id: Option<i64>,
    pub customer_id: Option<String>,
    pub lines: Vec<OrderLineInput>,
    pub note: Option<String>,
}

/// Pure totals snapshot for an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub item_count: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kitchen_flow_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Preparing));
        assert!(Preparing.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Delivered));
        assert!(Delivered.can_transition_to(Invoiced));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Preparing.can_transition_to(Cancelled));

        // No shortcuts past the kitchen
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Ready.can_transition_to(Cancelled));
        assert!(!Invoiced.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Pending));
    }

    #[test]
    fn test_status_predicates() {
        use OrderStatus::*;
        assert!(Pending.is_editable());
        assert!(Preparing.is_editable());
        assert!(!Ready.is_editable());

        assert!(Delivered.is_active());
        assert!(!Invoiced.is_active());
        assert!(!Cancelled.is_active());

        assert!(Pending.is_invoiceable());
        assert!(Delivered.is_invoiceable());
        assert!(Invoiced.is_invoiceable());
        assert!(!Preparing.is_invoiceable());
        assert!(!Cancelled.is_invoiceable());
    }
}
