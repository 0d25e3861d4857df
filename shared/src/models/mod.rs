//! Entity models
//!
//! Cross-entity relations are plain ID references resolved through the
//! owning component's lookup table, never embedded object pointers.

pub mod customer;
pub mod dining_table;
pub mod invoice;
pub mod order;
pub mod product;
pub mod reservation;

pub use customer::Customer;
pub use dining_table::{DiningTable, DiningTableSpec, TableState};
pub use invoice::{Invoice, InvoiceStatus};
pub use order::{Order, OrderDraft, OrderLine, OrderLineInput, OrderStatus, OrderTotals};
pub use product::Product;
pub use reservation::{Reservation, ReservationRequest, ReservationStatus};
