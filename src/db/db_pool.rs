use duckdb::{AccessMode, Config, Connection};
use r2d2::{ManageConnection, Pool};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DatabaseConfig;

pub const IN_MEMORY: &str = ":memory:";

/// Hands out connections to a single DuckDB database instance.
///
/// DuckDB only allows one database instance per file, so the first successful
/// connect opens a root connection and every connection after that is a clone
/// of it. Cloned connections share the catalog and data of the root.
#[derive(Clone)]
pub struct DuckDBConnectionManager {
    connection_string: String,
    read_only: bool,
    root: Arc<Mutex<Option<Connection>>>,
}

impl DuckDBConnectionManager {
    pub fn new(connection_string: String, read_only: bool) -> Self {
        Self {
            connection_string,
            read_only,
            root: Arc::new(Mutex::new(None)),
        }
    }

    fn open_root(&self) -> Result<Connection, duckdb::Error> {
        info!("Opening DuckDB database: {}", self.connection_string);
        let config = if self.read_only {
            Config::default().access_mode(AccessMode::ReadOnly)?
        } else {
            Config::default()
        };

        if self.connection_string == IN_MEMORY {
            Connection::open_in_memory_with_flags(config)
        } else {
            Connection::open_with_flags(&self.connection_string, config)
        }
    }

    /// Opens a connection outside of any pool and checks it with `SELECT 1`.
    /// The connection is dropped when this returns.
    pub fn ping(&self) -> Result<(), duckdb::Error> {
        let mut conn = self.connect()?;
        self.is_valid(&mut conn)
    }
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let mut root = self.root.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(conn) = root.as_ref() {
            return conn.try_clone();
        }

        let conn = self.open_root()?;
        let clone = conn.try_clone()?;
        *root = Some(conn);
        debug!("Root DuckDB connection established");
        Ok(clone)
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute_batch("SELECT 1")
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Builds the bounded connection pool.
///
/// The pool is built unchecked so an unreachable database does not prevent
/// the service from starting; checkouts report the failure instead.
pub fn build_pool(
    manager: DuckDBConnectionManager,
    config: &DatabaseConfig,
) -> Pool<DuckDBConnectionManager> {
    let pool = Pool::builder()
        .max_size(config.pool_size)
        .min_idle(Some(1))
        .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
        .build_unchecked(manager);

    info!("Connection pool created with max size {}", config.pool_size);
    pool
}
