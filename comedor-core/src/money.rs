//! Money calculation utilities using rust_decimal for precision
//!
//! All calculations are done using `Decimal` internally, then converted to
//! `f64` for storage/serialization. Rounding is always 2 decimal places,
//! half away from zero, which is how ITBIS amounts are rounded on Dominican
//! fiscal receipts.

use rust_decimal::prelude::*;
use shared::models::{Order, OrderLine};

/// Rounding precision for monetary values
const DECIMAL_PLACES: u32 = 2;

/// ITBIS — Dominican 18% consumption tax
pub const ITBIS_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2);

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed unit price per line (RD$1,000,000)
pub const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per line
pub const MAX_QUANTITY: i32 = 9999;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// ITBIS on a taxable amount, rounded half away from zero
#[inline]
pub fn itbis(taxable: Decimal) -> Decimal {
    (taxable * ITBIS_RATE).round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// quantity x unit_price, rounded to 2 decimals
pub fn line_subtotal(unit_price: f64, quantity: i32) -> f64 {
    to_f64(to_decimal(unit_price) * Decimal::from(quantity))
}

/// Compare two amounts within MONEY_TOLERANCE
pub fn money_eq(a: f64, b: f64) -> bool {
    (to_decimal(a) - to_decimal(b)).abs() <= MONEY_TOLERANCE
}

/// Recompute an order's line subtotals and order-level totals in place.
///
/// subtotal = sum of line subtotals; tax = ITBIS(subtotal);
/// total = subtotal + tax. Discounts and tips only exist at invoicing.
pub fn recalculate_order(order: &mut Order) {
    let mut subtotal = Decimal::ZERO;
    for line in &mut order.lines {
        let amount = to_decimal(line.unit_price) * Decimal::from(line.quantity);
        line.subtotal = to_f64(amount);
        subtotal += amount;
    }
    let tax = itbis(subtotal);
    order.subtotal = to_f64(subtotal);
    order.tax = to_f64(tax);
    order.total = to_f64(subtotal + tax);
}

/// Item count across lines (sum of quantities)
pub fn item_count(lines: &[OrderLine]) -> i32 {
    lines.iter().map(|l| l.quantity).sum()
}

/// Invoice amount breakdown: discount applied before tax, tax on the
/// discounted subtotal, tip added untaxed.
///
/// Returns (tax, total) rounded to 2 decimals.
pub fn invoice_amounts(subtotal: f64, discount: f64, tip: f64) -> (f64, f64) {
    let taxable = to_decimal(subtotal) - to_decimal(discount);
    let tax = itbis(taxable);
    let total = taxable + tax + to_decimal(tip);
    (to_f64(tax), to_f64(total))
}
