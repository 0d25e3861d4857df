//! Service ports consumed by the core
//!
//! Catalog, customer directory and notification delivery live outside the
//! core; these traits define the boundary. The in-memory implementations
//! cover floor setup and tests.

mod catalog;
mod notify;

pub use catalog::{CustomerDirectory, ProductCatalog, StaticCatalog, StaticDirectory};
pub use notify::{LogOnlyGateway, NotificationGateway, NotificationKind};
