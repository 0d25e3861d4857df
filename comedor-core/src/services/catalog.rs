//! Product catalog and customer directory ports

use parking_lot::RwLock;
use shared::models::{Customer, Product};
use std::collections::HashMap;

/// Product lookup consumed by the OrderLedger.
///
/// Availability and stock are re-checked through this port at
/// line-insertion time; cached client values are never trusted.
pub trait ProductCatalog: Send + Sync {
    fn get_product(&self, product_id: i64) -> Option<Product>;
}

/// Customer existence check consumed by the OrderLedger and the
/// ReservationScheduler
pub trait CustomerDirectory: Send + Sync {
    fn exists(&self, customer_id: &str) -> bool;
}

/// In-memory catalog with interior mutability, used for floor setup and tests
#[derive(Debug, Default)]
pub struct StaticCatalog {
    products: RwLock<HashMap<i64, Product>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, product: Product) {
        self.products.write().insert(product.id, product);
    }

    pub fn set_available(&self, product_id: i64, is_available: bool) {
        if let Some(p) = self.products.write().get_mut(&product_id) {
            p.is_available = is_available;
        }
    }

    pub fn set_stock(&self, product_id: i64, stock_quantity: i32) {
        if let Some(p) = self.products.write().get_mut(&product_id) {
            p.stock_quantity = stock_quantity;
        }
    }
}

impl ProductCatalog for StaticCatalog {
    fn get_product(&self, product_id: i64) -> Option<Product> {
        self.products.read().get(&product_id).cloned()
    }
}

/// In-memory customer directory
#[derive(Debug, Default)]
pub struct StaticDirectory {
    customers: RwLock<HashMap<String, Customer>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, customer: Customer) {
        self.customers.write().insert(customer.id.clone(), customer);
    }
}

impl CustomerDirectory for StaticDirectory {
    fn exists(&self, customer_id: &str) -> bool {
        self.customers.read().contains_key(customer_id)
    }
}
