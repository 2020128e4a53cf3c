//! Inventory data types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::InventoryError;

/// Column order of the CSV format and the products table
pub const FIELDS: [&str; 3] = ["sku", "name", "quantity"];

/// One CSV row: field name -> raw string value
pub type Record = BTreeMap<String, String>;

/// A product row as stored in the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub sku: String,
    pub name: String,
    pub quantity: u64,
}

impl Product {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, quantity: u64) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            quantity,
        }
    }
}

impl From<&Product> for Record {
    fn from(product: &Product) -> Self {
        let mut record = Record::new();
        record.insert("sku".to_string(), product.sku.clone());
        record.insert("name".to_string(), product.name.clone());
        record.insert("quantity".to_string(), product.quantity.to_string());
        record
    }
}

/// How `update_quantity` combines the stored quantity with a count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityOp {
    /// quantity + count
    Add,
    /// max(0, quantity - count)
    Subtract,
    /// count
    Set,
}

impl QuantityOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuantityOp::Add => "add",
            QuantityOp::Subtract => "subtract",
            QuantityOp::Set => "set",
        }
    }
}

impl fmt::Display for QuantityOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuantityOp {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(QuantityOp::Add),
            "subtract" => Ok(QuantityOp::Subtract),
            "set" => Ok(QuantityOp::Set),
            other => Err(InventoryError::Validation(format!(
                "Unknown quantity operation '{}' (expected add, subtract or set)",
                other
            ))),
        }
    }
}

/// Outcome of a conflict-tolerant bulk insert
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    /// Rows written to the table
    pub inserted: usize,
    /// Rows dropped because their sku already existed
    pub skipped: usize,
}
