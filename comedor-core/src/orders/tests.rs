use super::*;
use crate::clock::FixedClock;
use crate::services::{StaticCatalog, StaticDirectory};
use shared::models::{Customer, Product};

fn create_test_ledger() -> (Arc<FixedClock>, Arc<StaticCatalog>, OrderLedger) {
    let clock = Arc::new(FixedClock::new(1_000_000));
    let catalog = Arc::new(StaticCatalog::new());
    catalog.upsert(Product {
        id: 1,
        name: "Mofongo".to_string(),
        price: 350.0,
        is_available: true,
        stock_quantity: 20,
    });
    catalog.upsert(Product {
        id: 2,
        name: "Morir Soñando".to_string(),
        price: 120.0,
        is_available: true,
        stock_quantity: 8,
    });
    catalog.upsert(Product {
        id: 3,
        name: "Tres Leches".to_string(),
        price: 180.0,
        is_available: false,
        stock_quantity: 5,
    });
    let directory = Arc::new(StaticDirectory::new());
    directory.upsert(Customer {
        id: "cust-1".to_string(),
        name: "Ana".to_string(),
        phone: None,
    });
    let ledger = OrderLedger::new(catalog.clone(), directory, clock.clone());
    (clock, catalog, ledger)
}

fn draft(lines: Vec<(i64, i32)>) -> OrderDraft {
    OrderDraft {
        table_id: Some(1),
        customer_id: None,
        lines: lines
            .into_iter()
            .map(|(product_id, quantity)| OrderLineInput {
                product_id,
                quantity,
            })
            .collect(),
        note: None,
    }
}

#[test]
fn test_create_order_captures_prices_and_totals() {
    let (_, _, ledger) = create_test_ledger();
    let order = ledger.create_order(draft(vec![(1, 2), (2, 1)])).unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.lines.len(), 2);
    assert_eq!(order.lines[0].unit_price, 350.0);
    // 2*350 + 120 = 820; ITBIS 147.60
    assert_eq!(order.subtotal, 820.0);
    assert_eq!(order.tax, 147.60);
    assert_eq!(order.total, 967.60);
}

#[test]
fn test_create_order_collects_all_violations() {
    let (_, _, ledger) = create_test_ledger();
    let mut bad = draft(vec![(99, 1), (2, 0), (3, 1)]);
    bad.customer_id = Some("ghost".to_string());
    let err = ledger.create_order(bad).unwrap_err();
    match err {
        CoreError::Validation(violations) => {
            // unknown product, non-positive quantity, unavailable product, unknown customer
            assert_eq!(violations.len(), 4);
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[test]
fn test_create_order_rejects_empty_lines_and_stock_shortage() {
    let (_, _, ledger) = create_test_ledger();
    assert!(ledger.create_order(draft(vec![])).unwrap_err().is_validation());

    // 9 units requested, 8 in stock
    let err = ledger.create_order(draft(vec![(2, 9)])).unwrap_err();
    match err {
        CoreError::Validation(violations) => {
            assert!(violations[0].message.contains("insufficient stock"));
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[test]
fn test_catalog_price_change_does_not_touch_existing_lines() {
    let (_, catalog, ledger) = create_test_ledger();
    let order = ledger.create_order(draft(vec![(1, 1)])).unwrap();

    catalog.upsert(Product {
        id: 1,
        name: "Mofongo".to_string(),
        price: 999.0,
        is_available: true,
        stock_quantity: 20,
    });

    let totals = ledger.compute_totals(&order.id).unwrap();
    assert_eq!(totals.subtotal, 350.0);
}

#[test]
fn test_update_order_diffs_lines() {
    let (_, catalog, ledger) = create_test_ledger();
    let order = ledger.create_order(draft(vec![(1, 2), (2, 1)])).unwrap();

    // Catalog price changes between create and update; the kept line must
    // preserve its captured price, only the inserted line sees the new one
    catalog.upsert(Product {
        id: 2,
        name: "Morir Soñando".to_string(),
        price: 150.0,
        is_available: true,
        stock_quantity: 8,
    });

    // Drop product 1, change product 2 quantity, nothing new
    let updated = ledger
        .update_order(&order.id, &[OrderLineInput { product_id: 2, quantity: 3 }])
        .unwrap();
    assert_eq!(updated.lines.len(), 1);
    assert_eq!(updated.lines[0].product_id, 2);
    assert_eq!(updated.lines[0].quantity, 3);
    // Captured at create time, not the new 150.0
    assert_eq!(updated.lines[0].unit_price, 120.0);
    assert_eq!(updated.subtotal, 360.0);
}

#[test]
fn test_update_order_only_while_editable() {
    let (_, _, ledger) = create_test_ledger();
    let order = ledger.create_order(draft(vec![(1, 1)])).unwrap();
    ledger.transition(&order.id, OrderStatus::Preparing).unwrap();
    ledger
        .update_order(&order.id, &[OrderLineInput { product_id: 1, quantity: 2 }])
        .unwrap();
    ledger.transition(&order.id, OrderStatus::Ready).unwrap();

    let err = ledger
        .update_order(&order.id, &[OrderLineInput { product_id: 1, quantity: 3 }])
        .unwrap_err();
    assert!(err.is_conflict());
}

#[test]
fn test_update_failure_leaves_order_untouched() {
    let (_, _, ledger) = create_test_ledger();
    let order = ledger.create_order(draft(vec![(1, 2)])).unwrap();
    let err = ledger
        .update_order(
            &order.id,
            &[
                OrderLineInput { product_id: 1, quantity: 1 },
                OrderLineInput { product_id: 99, quantity: 1 },
            ],
        )
        .unwrap_err();
    assert!(err.is_validation());
    let reread = ledger.get(&order.id).unwrap();
    assert_eq!(reread.lines[0].quantity, 2);
    assert_eq!(reread.subtotal, 700.0);
}

#[test]
fn test_full_kitchen_flow_succeeds() {
    let (_, _, ledger) = create_test_ledger();
    let order = ledger.create_order(draft(vec![(1, 1)])).unwrap();
    for status in [
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Invoiced,
    ] {
        ledger.transition(&order.id, status).unwrap();
    }
    assert_eq!(ledger.get(&order.id).unwrap().status, OrderStatus::Invoiced);
}

#[test]
fn test_pending_to_delivered_shortcut_rejected() {
    let (_, _, ledger) = create_test_ledger();
    let order = ledger.create_order(draft(vec![(1, 1)])).unwrap();
    let err = ledger
        .transition(&order.id, OrderStatus::Delivered)
        .unwrap_err();
    match err {
        CoreError::Conflict {
            current, requested, ..
        } => {
            assert_eq!(current, "Pending");
            assert_eq!(requested, "Delivered");
        }
        other => panic!("expected Conflict, got {other:?}"),
    }
}

#[test]
fn test_mark_invoiced_from_pending_and_idempotent() {
    let (_, _, ledger) = create_test_ledger();
    let order = ledger.create_order(draft(vec![(1, 1)])).unwrap();
    ledger.mark_invoiced(&order.id).unwrap();
    // Idempotent retry
    let again = ledger.mark_invoiced(&order.id).unwrap();
    assert_eq!(again.status, OrderStatus::Invoiced);

    // But a cancelled order can never be invoiced
    let other = ledger.create_order(draft(vec![(2, 1)])).unwrap();
    ledger.transition(&other.id, OrderStatus::Cancelled).unwrap();
    assert!(ledger.mark_invoiced(&other.id).unwrap_err().is_conflict());
}

#[test]
fn test_compute_totals_is_idempotent() {
    let (_, _, ledger) = create_test_ledger();
    let order = ledger.create_order(draft(vec![(1, 2), (2, 2)])).unwrap();
    let first = ledger.compute_totals(&order.id).unwrap();
    let second = ledger.compute_totals(&order.id).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.item_count, 4);
    assert_eq!(first.subtotal, 940.0);
}

#[test]
fn test_active_for_table_excludes_settled() {
    let (_, _, ledger) = create_test_ledger();
    let a = ledger.create_order(draft(vec![(1, 1)])).unwrap();
    let b = ledger.create_order(draft(vec![(2, 1)])).unwrap();
    assert_eq!(ledger.active_for_table(1).len(), 2);

    ledger.mark_invoiced(&a.id).unwrap();
    assert_eq!(ledger.active_for_table(1).len(), 1);
    ledger.transition(&b.id, OrderStatus::Cancelled).unwrap();
    assert!(!ledger.has_active_for_table(1));
}

#[test]
fn test_takeout_order_has_no_table() {
    let (_, _, ledger) = create_test_ledger();
    let mut takeout = draft(vec![(1, 1)]);
    takeout.table_id = None;
    let order = ledger.create_order(takeout).unwrap();
    assert!(order.table_id.is_none());
    assert!(ledger.active_for_table(1).is_empty());
}

#[test]
fn test_duplicate_product_lines_merge() {
    let (_, _, ledger) = create_test_ledger();
    let order = ledger.create_order(draft(vec![(1, 1), (1, 2)])).unwrap();
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.lines[0].quantity, 3);
}

#[test]
fn test_price_out_of_bounds_rejected() {
    let (_, catalog, ledger) = create_test_ledger();
    catalog.upsert(Product {
        id: 4,
        name: "Botella rara".to_string(),
        price: 2_000_000.0,
        is_available: true,
        stock_quantity: 3,
    });

    let err = ledger.create_order(draft(vec![(4, 1)])).unwrap_err();
    match err {
        CoreError::Validation(violations) => {
            assert_eq!(violations.len(), 1);
            assert!(violations[0].message.contains("out-of-range price"));
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}
