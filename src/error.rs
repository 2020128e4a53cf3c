//! Error types for inventory_manager

use std::time::Duration;
use thiserror::Error;

/// Unified error type for inventory operations
#[derive(Debug, Error)]
pub enum InventoryError {
    /// CSV text could not be parsed or serialized
    #[error("Format error: {0}")]
    Format(String),

    /// SQLite rejected or failed a statement
    #[error("Database error while {operation} (table: {table}{}): {source}", key_suffix(.key))]
    Storage {
        operation: &'static str,
        table: String,
        key: Option<String>,
        #[source]
        source: rusqlite::Error,
    },

    /// Explicit add collided with an existing primary key
    #[error("Product with sku '{sku}' already exists in table {table}")]
    Conflict { table: String, sku: String },

    /// Caller input failed a precondition before reaching the database
    #[error("Invalid input: {0}")]
    Validation(String),

    /// No pooled connection became available in time
    #[error("No database connection available after {waited:?}")]
    PoolExhausted { waited: Duration },

    /// File I/O failed (upload temp files, seed data)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn key_suffix(key: &Option<String>) -> String {
    match key {
        Some(key) => format!(", key: {}", key),
        None => String::new(),
    }
}

impl From<csv::Error> for InventoryError {
    fn from(err: csv::Error) -> Self {
        InventoryError::Format(err.to_string())
    }
}

impl InventoryError {
    /// True for failures caused by the caller rather than the server
    pub fn is_validation(&self) -> bool {
        matches!(self, InventoryError::Validation(_))
    }
}

/// Result alias for inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;
