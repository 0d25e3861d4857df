//! Product catalog DTO
//!
//! The catalog itself lives outside the core; this is the shape the
//! OrderLedger reads at line-insertion time.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Price in currency unit
    pub price: f64,
    pub is_available: bool,
    pub stock_quantity: i32,
}
