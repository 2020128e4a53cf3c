//! Database operations for the product inventory
//!
//! Uses parameterized queries for every value. The table name is trusted
//! configuration and is formatted into the SQL text.
//! Multi-row writes run inside a single transaction.

use rusqlite::{params, params_from_iter};
use std::collections::BTreeSet;
use std::path::Path;

use crate::config::Config;
use crate::csv_codec;
use crate::error::{InventoryError, Result};
use crate::models::{ImportStats, Product, QuantityOp, Record};
use crate::pool::ConnectionPool;

/// Default name of the products table
pub const DEFAULT_TABLE: &str = "products";

/// Product inventory backed by a SQLite table
pub struct Inventory {
    pool: ConnectionPool,
    table: String,
}

impl Inventory {
    pub fn new(pool: ConnectionPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// Fresh in-memory inventory with the schema already created
    pub fn open_in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory().map_err(|source| InventoryError::Storage {
            operation: "opening in-memory database",
            table: DEFAULT_TABLE.to_string(),
            key: None,
            source,
        })?;
        let inventory = Self::new(pool, DEFAULT_TABLE);
        inventory.ensure_schema()?;
        Ok(inventory)
    }

    /// Open the configured database, create the table and import seed data
    pub fn init(config: &Config) -> Result<Self> {
        let pool = ConnectionPool::open(&config.database, config.pool_size, config.pool_timeout())
            .map_err(|source| InventoryError::Storage {
                operation: "opening database",
                table: config.table.clone(),
                key: Some(config.database.display().to_string()),
                source,
            })?;

        let inventory = Self::new(pool, config.table.clone());
        inventory.ensure_schema()?;

        if let Some(seed) = &config.seed_csv {
            let stats = inventory.import_file(seed)?;
            log::info!(
                "Seeded inventory from {}: {} inserted, {} already present",
                seed.display(),
                stats.inserted,
                stats.skipped
            );
        }

        Ok(inventory)
    }

    /// Name of the backing table
    pub fn table(&self) -> &str {
        &self.table
    }

    fn storage_error(
        &self,
        operation: &'static str,
        key: Option<String>,
    ) -> impl FnOnce(rusqlite::Error) -> InventoryError + '_ {
        move |source| InventoryError::Storage {
            operation,
            table: self.table.clone(),
            key,
            source,
        }
    }

    /// Create the products table if it does not exist
    ///
    /// Columns: `sku` (primary key), `name`, `quantity` (defaults to 0,
    /// CHECK >= 0). Safe to call on every startup.
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                sku         TEXT PRIMARY KEY NOT NULL,
                name        TEXT NOT NULL,
                quantity    INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0)
            );",
            self.table
        ))
        .map_err(self.storage_error("creating table", None))?;

        log::info!("Database schema initialized (table: {})", self.table);
        Ok(())
    }

    /// Insert records, silently skipping skus that already exist
    ///
    /// Existing rows are never overwritten. Any other failure (missing
    /// field, non-integer or negative quantity, engine error) rolls back the
    /// whole batch.
    pub fn bulk_insert(&self, records: &[Record]) -> Result<ImportStats> {
        let mut conn = self.pool.get()?;
        let tx = conn
            .transaction()
            .map_err(self.storage_error("importing data", None))?;

        let mut stats = ImportStats::default();
        {
            let mut stmt = tx
                .prepare_cached(&format!(
                    "INSERT INTO {} (sku, name, quantity)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(sku) DO NOTHING",
                    self.table
                ))
                .map_err(self.storage_error("importing data", None))?;

            for (index, record) in records.iter().enumerate() {
                let row_key = || {
                    record
                        .get("sku")
                        .map(|sku| format!("sku {}", sku))
                        .unwrap_or_else(|| format!("row {}", index + 1))
                };

                let (sku, name, quantity) = import_values(record)
                    .map_err(self.storage_error("importing data", Some(row_key())))?;

                let changed = stmt
                    .execute(params![sku, name, quantity])
                    .map_err(self.storage_error("importing data", Some(row_key())))?;

                if changed == 0 {
                    log::debug!("Skipping existing sku {} during import", sku);
                    stats.skipped += 1;
                } else {
                    stats.inserted += 1;
                }
            }
        }

        tx.commit()
            .map_err(self.storage_error("importing data", None))?;

        log::info!(
            "Imported {} products into {} ({} skipped as already present)",
            stats.inserted,
            self.table,
            stats.skipped
        );
        Ok(stats)
    }

    /// Decode a CSV file and bulk insert its rows
    pub fn import_file(&self, path: &Path) -> Result<ImportStats> {
        let records = csv_codec::decode_file(path)?;
        self.bulk_insert(&records)
    }

    /// Every product, in table order
    pub fn fetch_all(&self) -> Result<Vec<Product>> {
        let conn = self.pool.get()?;
        let on_err = || self.storage_error("getting all products", None);

        let mut stmt = conn
            .prepare(&format!("SELECT sku, name, quantity FROM {}", self.table))
            .map_err(on_err())?;

        let products: rusqlite::Result<Vec<Product>> =
            stmt.query_map([], product_from_row).map_err(on_err())?.collect();
        products.map_err(on_err())
    }

    /// Products whose sku is in `skus`; unknown skus are left out
    pub fn fetch_by_skus(&self, skus: &[String]) -> Result<Vec<Product>> {
        let unique = unique_skus(skus);
        if unique.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.pool.get()?;
        let on_err = || self.storage_error("getting specific products", Some(format!("{:?}", skus)));

        let mut stmt = conn
            .prepare(&format!(
                "SELECT sku, name, quantity FROM {} WHERE sku IN ({})",
                self.table,
                placeholders(unique.len())
            ))
            .map_err(on_err())?;

        let products: rusqlite::Result<Vec<Product>> = stmt
            .query_map(params_from_iter(unique.iter()), product_from_row)
            .map_err(on_err())?
            .collect();
        products.map_err(on_err())
    }

    /// Insert a single new product
    ///
    /// Fails with [`InventoryError::Conflict`] if the sku already exists.
    pub fn add(&self, sku: &str, name: &str, quantity: u64) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (sku, name, quantity) VALUES (?1, ?2, ?3)",
                self.table
            ),
            params![sku, name, quantity],
        )
        .map_err(|source| {
            if is_primary_key_conflict(&source) {
                InventoryError::Conflict {
                    table: self.table.clone(),
                    sku: sku.to_string(),
                }
            } else {
                InventoryError::Storage {
                    operation: "adding new product",
                    table: self.table.clone(),
                    key: Some(sku.to_string()),
                    source,
                }
            }
        })?;

        log::info!("Added product {} ({}) with quantity {}", sku, name, quantity);
        Ok(())
    }

    /// Delete products by sku, returning how many rows were removed
    pub fn delete(&self, skus: &[String]) -> Result<usize> {
        let unique = unique_skus(skus);
        if unique.is_empty() {
            return Ok(0);
        }

        let conn = self.pool.get()?;
        let removed = conn
            .execute(
                &format!(
                    "DELETE FROM {} WHERE sku IN ({})",
                    self.table,
                    placeholders(unique.len())
                ),
                params_from_iter(unique.iter()),
            )
            .map_err(self.storage_error("deleting specific products", Some(format!("{:?}", skus))))?;

        log::info!("Deleted {} of {} requested products", removed, unique.len());
        Ok(removed)
    }

    /// Change a product's name; no-op if the sku is unknown
    pub fn rename(&self, sku: &str, new_name: &str) -> Result<usize> {
        let conn = self.pool.get()?;
        let changed = conn
            .execute(
                &format!("UPDATE {} SET name = ?1 WHERE sku = ?2", self.table),
                params![new_name, sku],
            )
            .map_err(self.storage_error("changing product name", Some(sku.to_string())))?;

        log::debug!("Renamed {} to {} ({} rows)", sku, new_name, changed);
        Ok(changed)
    }

    /// Add to, subtract from, or set a product's quantity
    ///
    /// Subtraction floors at zero inside the UPDATE statement itself, so
    /// concurrent subtracts cannot interleave a read and a write. An add that
    /// would push the quantity past `i64::MAX` changes nothing and fails with
    /// [`InventoryError::Validation`].
    pub fn update_quantity(&self, sku: &str, op: QuantityOp, count: u64) -> Result<usize> {
        let count = i64::try_from(count).map_err(|_| {
            InventoryError::Validation(format!("count {} is larger than {}", count, i64::MAX))
        })?;
        let (assignment, guard) = match op {
            QuantityOp::Set => ("?1", ""),
            QuantityOp::Add => ("quantity + ?1", " AND quantity <= 9223372036854775807 - ?1"),
            QuantityOp::Subtract => ("MAX(0, quantity - ?1)", ""),
        };
        let on_err = || {
            self.storage_error("updating product quantity", Some(format!("{} ({})", sku, op)))
        };

        let conn = self.pool.get()?;
        let changed = conn
            .execute(
                &format!(
                    "UPDATE {} SET quantity = {} WHERE sku = ?2{}",
                    self.table, assignment, guard
                ),
                params![count, sku],
            )
            .map_err(on_err())?;

        if changed == 0 && op == QuantityOp::Add {
            let exists = conn
                .query_row(
                    &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE sku = ?1)", self.table),
                    [sku],
                    |row| row.get::<_, bool>(0),
                )
                .map_err(on_err())?;
            if exists {
                return Err(InventoryError::Validation(format!(
                    "adding {} to {} would overflow its quantity",
                    count, sku
                )));
            }
        }

        log::debug!("Quantity {} {} for {} ({} rows)", op, count, sku, changed);
        Ok(changed)
    }

    /// Total number of products
    pub fn count(&self) -> Result<u64> {
        let conn = self.pool.get()?;
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| {
            row.get(0)
        })
        .map_err(self.storage_error("counting products", None))
    }
}

fn product_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        sku: row.get(0)?,
        name: row.get(1)?,
        quantity: row.get(2)?,
    })
}

/// Pull the three columns out of an import record
///
/// Quantity is parsed as a signed integer so negative values reach the
/// table's CHECK constraint and fail there.
fn import_values(record: &Record) -> rusqlite::Result<(&str, &str, i64)> {
    let field = |name: &str| {
        record
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| rusqlite::Error::InvalidParameterName(name.to_string()))
    };

    let sku = field("sku")?;
    let name = field("name")?;
    let quantity = field("quantity")?
        .trim()
        .parse::<i64>()
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    Ok((sku, name, quantity))
}

fn unique_skus(skus: &[String]) -> BTreeSet<&str> {
    skus.iter().map(String::as_str).collect()
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

fn is_primary_key_conflict(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
