//! Inventory Manager - product stock tracking over HTTP
//!
//! Keeps products (sku, name, quantity) in a SQLite table and exposes
//! add/rename/delete, quantity updates and CSV import/export as web
//! endpoints.

pub mod config;
pub mod csv_codec;
pub mod database;
pub mod error;
pub mod models;
pub mod pool;
pub mod services;
pub mod upload;
pub mod web;

pub use config::Config;
pub use database::Inventory;
pub use error::{InventoryError, Result};
pub use models::{ImportStats, Product, QuantityOp, Record};
pub use pool::ConnectionPool;
pub use services::{InventoryService, Outcome, Payload, ServiceResponse};
pub use web::{create_router, serve};
