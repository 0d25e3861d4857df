//! Full dinner-service flow against a freshly wired Coordinator
//!
//! Exercises the whole floor lifecycle end to end: floor setup, a booking
//! that is confirmed and seated, concurrent walk-in tables, a group
//! invoice, and settlement that releases each table exactly when its last
//! order is paid.

use comedor_core::clock::FixedClock;
use comedor_core::config::CoreConfig;
use comedor_core::money::money_eq;
use comedor_core::services::{LogOnlyGateway, StaticCatalog, StaticDirectory};
use comedor_core::{logger, Coordinator};
use shared::models::{
    Customer, DiningTableSpec, OrderDraft, OrderLineInput, OrderStatus, Product,
    ReservationRequest, TableState,
};
use std::sync::Arc;

const OPENING: i64 = 1_700_000_000_000;
const HOUR: i64 = 3_600_000;

fn wire_floor() -> (Arc<FixedClock>, Coordinator) {
    logger::init_logger();
    let clock = Arc::new(FixedClock::new(OPENING));

    let catalog = Arc::new(StaticCatalog::new());
    for (id, name, price) in [
        (1, "La Bandera", 350.50),
        (2, "Tostones", 150.00),
        (3, "Jugo de Chinola", 95.00),
    ] {
        catalog.upsert(Product {
            id,
            name: name.to_string(),
            price,
            is_available: true,
            stock_quantity: 100,
        });
    }

    let directory = Arc::new(StaticDirectory::new());
    directory.upsert(Customer {
        id: "cust-perez".to_string(),
        name: "Familia Perez".to_string(),
        phone: Some("809-555-0101".to_string()),
    });

    let coordinator = Coordinator::new(
        &CoreConfig::default(),
        catalog,
        directory,
        Arc::new(LogOnlyGateway),
        clock.clone(),
    );

    for (id, capacity) in [(1, 2), (2, 4), (3, 4), (4, 8)] {
        coordinator
            .registry()
            .register(DiningTableSpec {
                id,
                name: format!("Mesa {id}"),
                capacity,
            })
            .unwrap();
    }

    (clock, coordinator)
}

fn line(product_id: i64, quantity: i32) -> OrderLineInput {
    OrderLineInput {
        product_id,
        quantity,
    }
}

#[test]
fn test_full_dinner_service() {
    let (clock, c) = wire_floor();

    // 1. A booking comes in for later tonight; the scheduler picks the
    //    tightest table that fits the party
    let reservation = c
        .create_reservation(ReservationRequest {
            table_id: None,
            customer_id: "cust-perez".to_string(),
            start_time: OPENING + 3 * HOUR,
            party_size: 4,
            duration_minutes: Some(120),
            notes: Some("window seat".to_string()),
        })
        .unwrap();
    assert_eq!(reservation.table_id, 2);
    c.confirm_reservation(&reservation.id).unwrap();

    // 2. Meanwhile a walk-in couple takes table 1
    let walk_in = c
        .open_order(OrderDraft {
            table_id: Some(1),
            customer_id: None,
            lines: vec![line(1, 2), line(3, 2)],
            note: None,
        })
        .unwrap();
    assert_eq!(c.registry().state_of(1).unwrap(), TableState::Occupied);

    // subtotal 2 x 350.50 + 2 x 95.00 = 891.00, ITBIS 18% = 160.38
    assert!(money_eq(walk_in.subtotal, 891.00));
    assert!(money_eq(walk_in.tax, 160.38));
    assert!(money_eq(walk_in.total, 1051.38));

    // 3. The booking window opens; the sweep claims the table and the
    //    party is seated on arrival
    clock.set(OPENING + 3 * HOUR);
    assert_eq!(c.activate_due_reservations().len(), 1);
    assert_eq!(c.registry().state_of(2).unwrap(), TableState::Reserved);

    c.client_arrives(&reservation.id).unwrap();
    assert_eq!(c.registry().state_of(2).unwrap(), TableState::Occupied);

    // 4. The seated party runs two rounds, then asks for one bill
    let round_one = c
        .open_order(OrderDraft {
            table_id: Some(2),
            customer_id: Some("cust-perez".to_string()),
            lines: vec![line(1, 4)],
            note: None,
        })
        .unwrap();
    let round_two = c
        .open_order(OrderDraft {
            table_id: Some(2),
            customer_id: Some("cust-perez".to_string()),
            lines: vec![line(2, 2)],
            note: None,
        })
        .unwrap();
    for id in [&round_one.id, &round_two.id] {
        c.transition_order(id, OrderStatus::Preparing).unwrap();
        c.transition_order(id, OrderStatus::Ready).unwrap();
        c.transition_order(id, OrderStatus::Delivered).unwrap();
    }

    let group = c.invoice_table(2, 0.0, 200.0, None).unwrap();
    assert!(group.covers_order(&round_one.id));
    assert!(group.covers_order(&round_two.id));
    // combined subtotal 1402.00 + 300.00 = 1702.00, tax 306.36, tip 200
    assert!(money_eq(group.subtotal, 1702.00));
    assert!(money_eq(group.tax, 306.36));
    assert!(money_eq(group.total, 2208.36));

    // the table stays held until the bill is actually paid
    assert_eq!(c.registry().state_of(2).unwrap(), TableState::Occupied);
    c.pay_invoice(&group.id, "CARD").unwrap();
    assert_eq!(c.registry().state_of(2).unwrap(), TableState::Free);
    c.complete_reservation(&reservation.id).unwrap();

    // 5. The walk-in settles too, discount before tax:
    //    (891.00 - 91.00) x 1.18 = 944.00
    let bill = c.invoice_order(&walk_in.id, 91.00, 0.0, None).unwrap();
    assert!(money_eq(bill.total, 944.00));
    c.pay_invoice(&bill.id, "CASH").unwrap();
    assert_eq!(c.registry().state_of(1).unwrap(), TableState::Free);

    // every table ends the night Free
    assert!(c
        .list_tables()
        .iter()
        .all(|t| t.state == TableState::Free));
}

#[test]
fn test_no_show_releases_table_for_walk_ins() {
    let (clock, c) = wire_floor();

    let reservation = c
        .create_reservation(ReservationRequest {
            table_id: Some(4),
            customer_id: "cust-perez".to_string(),
            start_time: OPENING + HOUR,
            party_size: 6,
            duration_minutes: None,
            notes: None,
        })
        .unwrap();
    c.confirm_reservation(&reservation.id).unwrap();

    clock.set(OPENING + HOUR);
    c.activate_due_reservations();
    assert_eq!(c.registry().state_of(4).unwrap(), TableState::Reserved);

    // inside the tolerance window the staff cannot write the party off
    clock.advance_minutes(10);
    assert!(c.mark_no_show(&reservation.id).unwrap_err().is_conflict());

    clock.advance_minutes(10);
    c.mark_no_show(&reservation.id).unwrap();
    assert_eq!(c.registry().state_of(4).unwrap(), TableState::Free);

    // the slot is free again for a walk-in party
    let order = c
        .open_order(OrderDraft {
            table_id: Some(4),
            customer_id: None,
            lines: vec![line(2, 1)],
            note: None,
        })
        .unwrap();
    assert_eq!(order.table_id, Some(4));
    assert_eq!(c.registry().state_of(4).unwrap(), TableState::Occupied);
}

#[test]
fn test_double_booking_rejected_with_alternatives() {
    let (_, c) = wire_floor();

    c.create_reservation(ReservationRequest {
        table_id: Some(4),
        customer_id: "cust-perez".to_string(),
        start_time: OPENING + 2 * HOUR,
        party_size: 8,
        duration_minutes: Some(120),
        notes: None,
    })
    .unwrap();

    // same table, overlapping window
    let err = c
        .create_reservation(ReservationRequest {
            table_id: Some(4),
            customer_id: "cust-perez".to_string(),
            start_time: OPENING + 3 * HOUR,
            party_size: 8,
            duration_minutes: Some(120),
            notes: None,
        })
        .unwrap_err();
    assert!(err.is_conflict());

    // only table 4 can host 8, so alternatives shift the time instead
    let suggestions = c
        .scheduler()
        .suggest_alternatives(OPENING + 3 * HOUR, 8);
    assert!(!suggestions.is_empty());
    assert!(suggestions.iter().all(|t| t.capacity >= 8));
}