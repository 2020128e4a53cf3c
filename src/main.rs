//! Inventory Manager - product stock tracking over HTTP
//!
//! Opens (or creates) the SQLite inventory, optionally seeds it from a CSV
//! file and serves the inventory endpoints until Ctrl-C.

use clap::Parser;
use inventory_manager::pool::MEMORY_PATH;
use inventory_manager::{Config, Inventory, InventoryService};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    log::info!("Starting inventory_manager...");
    log::info!("Database path: {}", config.database.display());

    // Ensure parent directory exists
    if config.database != Path::new(MEMORY_PATH) {
        if let Some(parent) = config.database.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    log::error!("Failed to create database directory: {}", e);
                    std::process::exit(1);
                }
                log::info!("Created directory: {}", parent.display());
            }
        }
    }

    if let Err(e) = std::fs::create_dir_all(&config.upload_dir) {
        log::error!(
            "Failed to create upload directory {}: {}",
            config.upload_dir.display(),
            e
        );
        std::process::exit(1);
    }

    // Open database, create table, import seed data
    let inventory = match Inventory::init(&config) {
        Ok(inventory) => inventory,
        Err(e) => {
            log::error!("Failed to initialize inventory: {}", e);
            std::process::exit(1);
        }
    };

    match inventory.count() {
        Ok(count) => log::info!("Inventory holds {} products", count),
        Err(e) => log::warn!("Could not count products: {}", e),
    }

    let service = Arc::new(InventoryService::new(
        Arc::new(inventory),
        config.upload_dir.clone(),
    ));

    if let Err(e) = inventory_manager::serve(service, &config).await {
        log::error!("Web server error: {}", e);
        std::process::exit(1);
    }

    log::info!("Server stopped.");
}
