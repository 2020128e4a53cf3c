//! Command-line configuration

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::database::DEFAULT_TABLE;

/// Product inventory server - tracks SKU stock in SQLite with CSV import/export
#[derive(Parser, Debug, Clone)]
#[command(name = "inventory_manager")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Path to the SQLite database file (":memory:" for a throwaway database)
    #[arg(short, long, default_value_os_t = default_db_path())]
    pub database: PathBuf,

    /// Name of the products table
    #[arg(long, default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Address to bind the web server to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the web server
    #[arg(short, long, default_value_t = 5000)]
    pub port: u16,

    /// CSV file imported on startup (existing skus are left untouched)
    #[arg(long)]
    pub seed_csv: Option<PathBuf>,

    /// Directory for temporary upload files during CSV import
    #[arg(long, default_value_os_t = std::env::temp_dir())]
    pub upload_dir: PathBuf,

    /// Number of pooled database connections
    #[arg(long, default_value_t = 4)]
    pub pool_size: usize,

    /// Seconds to wait for a free database connection
    #[arg(long, default_value_t = 30)]
    pub pool_timeout_secs: u64,

    /// Directory of static assets served for unmatched paths
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
}

/// Returns the default database path: ~/.local/share/inventory_manager/inventory.db
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("inventory_manager")
        .join("inventory.db")
}

impl Config {
    pub fn pool_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_timeout_secs)
    }

    /// `host:port` string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configuration for an in-memory database, used by tests and demos
    pub fn in_memory(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            database: PathBuf::from(crate::pool::MEMORY_PATH),
            table: DEFAULT_TABLE.to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            seed_csv: None,
            upload_dir: upload_dir.into(),
            pool_size: 1,
            pool_timeout_secs: 30,
            static_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let config = Config::parse_from(["inventory_manager"]);

        assert_eq!(config.table, "products");
        assert_eq!(config.port, 5000);
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.pool_timeout(), Duration::from_secs(30));
        assert!(config.database.ends_with("inventory_manager/inventory.db"));
        assert!(config.seed_csv.is_none());
        assert!(config.static_dir.is_none());
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::parse_from([
            "inventory_manager",
            "--database",
            ":memory:",
            "--table",
            "stock",
            "--port",
            "8080",
            "--host",
            "127.0.0.1",
            "--seed-csv",
            "products_init.csv",
            "--pool-size",
            "2",
        ]);

        assert_eq!(config.database, PathBuf::from(":memory:"));
        assert_eq!(config.table, "stock");
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.seed_csv, Some(PathBuf::from("products_init.csv")));
        assert_eq!(config.pool_size, 2);
    }

    #[test]
    fn default_db_path_ends_with_expected_file() {
        let path = default_db_path();
        assert!(path.ends_with("inventory_manager/inventory.db"));
    }
}
