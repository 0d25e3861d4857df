//! Comedor floor coordination core
//!
//! Coordinates one restaurant's physical floor: table occupancy, order
//! lifecycle, invoice consolidation and settlement (Dominican 18% ITBIS),
//! and reservation booking with time-range conflict detection.
//!
//! # Architecture
//!
//! ```text
//! ReservationScheduler ──┐
//!                        ├──> TableRegistry (occupancy state machine)
//! OrderLedger ───────────┘
//!      │
//!      └──> InvoiceEngine (consolidation, ITBIS, settlement)
//!
//! Coordinator: sequences cross-entity operations under one lock per
//! table (the consistency unit), so partial application is never
//! observable by concurrent readers.
//! ```
//!
//! Transport, persistence technology, notification delivery and auth are
//! external collaborators; the core talks to them through the traits in
//! [`services`].

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod invoices;
pub mod logger;
pub mod money;
pub mod orders;
pub mod reservations;
pub mod services;
pub mod tables;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CoreConfig;
pub use coordinator::Coordinator;
pub use invoices::InvoiceEngine;
pub use orders::OrderLedger;
pub use reservations::ReservationScheduler;
pub use tables::TableRegistry;

// Re-export shared types for convenience
pub use shared::error::{CoreError, CoreResult, Violation};
pub use shared::models::{
    Customer, DiningTable, DiningTableSpec, Invoice, InvoiceStatus, Order, OrderDraft, OrderLine,
    OrderLineInput, OrderStatus, OrderTotals, Product, Reservation, ReservationRequest,
    ReservationStatus, TableState,
};
