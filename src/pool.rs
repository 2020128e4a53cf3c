//! Fixed-size SQLite connection pool
//!
//! Idle connections live in a bounded channel. Checking one out removes it
//! from the channel; dropping the guard sends it back.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::time::Duration;

use crate::error::{InventoryError, Result};

/// How long SQLite waits on a locked database before returning SQLITE_BUSY
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Path value that selects an in-memory database
pub const MEMORY_PATH: &str = ":memory:";

pub struct ConnectionPool {
    idle_tx: Sender<Connection>,
    idle_rx: Receiver<Connection>,
    size: usize,
    checkout_timeout: Duration,
}

impl ConnectionPool {
    /// Open `size` connections to the database at `path`
    ///
    /// `:memory:` always gets a single connection, since every in-memory
    /// connection is its own database.
    pub fn open(path: &Path, size: usize, checkout_timeout: Duration) -> rusqlite::Result<Self> {
        if path == Path::new(MEMORY_PATH) {
            let conn = Connection::open_in_memory()?;
            return Ok(Self::from_connections(vec![conn], checkout_timeout));
        }

        let size = size.max(1);
        let mut connections = Vec::with_capacity(size);
        for _ in 0..size {
            let conn = Connection::open(path)?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            connections.push(conn);
        }

        log::info!("Opened {} connection(s) to {}", size, path.display());
        Ok(Self::from_connections(connections, checkout_timeout))
    }

    /// Single-connection pool over a fresh in-memory database
    pub fn in_memory() -> rusqlite::Result<Self> {
        Self::open(Path::new(MEMORY_PATH), 1, Duration::from_secs(30))
    }

    fn from_connections(connections: Vec<Connection>, checkout_timeout: Duration) -> Self {
        let size = connections.len();
        let (idle_tx, idle_rx) = bounded(size);
        for conn in connections {
            // Capacity equals the number of connections, so this never blocks
            let _ = idle_tx.send(conn);
        }

        Self {
            idle_tx,
            idle_rx,
            size,
            checkout_timeout,
        }
    }

    /// Check out a connection, waiting up to the configured timeout
    pub fn get(&self) -> Result<PooledConnection<'_>> {
        match self.idle_rx.recv_timeout(self.checkout_timeout) {
            Ok(conn) => Ok(PooledConnection {
                conn: Some(conn),
                pool: self,
            }),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                log::warn!(
                    "Connection pool exhausted ({} connections) after {:?}",
                    self.size,
                    self.checkout_timeout
                );
                Err(InventoryError::PoolExhausted {
                    waited: self.checkout_timeout,
                })
            }
        }
    }

    /// Total number of connections owned by the pool
    pub fn size(&self) -> usize {
        self.size
    }

    /// Connections currently idle
    pub fn idle(&self) -> usize {
        self.idle_rx.len()
    }
}

/// A checked-out connection; returned to the pool on drop
pub struct PooledConnection<'a> {
    conn: Option<Connection>,
    pool: &'a ConnectionPool,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection is only taken on drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection is only taken on drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if self.pool.idle_tx.send(conn).is_err() {
                log::warn!("Connection pool closed, dropping connection");
            }
        }
    }
}
