//! Connection pool and transaction helpers.

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::migrations;

/// A pooled connection.
pub type PooledSqlite = PooledConnection<SqliteConnectionManager>;

/// Process-scoped handle to the certificate database.
///
/// Cloning is cheap; clones share the same pool.
///
/// # Example
///
/// ```rust
/// use idir_store::{Store, StoreConfig};
///
/// let store = Store::open(&StoreConfig::in_memory())?;
/// let count = store.read(|conn| idir_store::queries::certificates::count(conn))?;
/// assert_eq!(count, 0);
/// store.shutdown();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct Store {
    pool: r2d2::Pool<SqliteConnectionManager>,
    config: StoreConfig,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("database_path", &self.config.database_path)
            .field("max_connections", &self.config.max_connections)
            .finish()
    }
}

impl Store {
    /// Opens the pool and runs pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Pool`] if connections cannot be established and
    /// [`StoreError::Migration`] if the schema is newer than this build.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let pragmas = format!(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = {};
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
            config.busy_timeout_ms
        );
        let manager = if config.is_in_memory() {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(&config.database_path)
        };
        let manager = manager.with_init(move |conn| conn.execute_batch(&pragmas));

        let mut builder = r2d2::Pool::builder()
            .max_size(config.max_connections.max(1))
            .connection_timeout(config.acquire_timeout());
        if config.is_in_memory() {
            // Each in-memory connection is its own database: keep exactly one alive.
            builder = builder.max_size(1).idle_timeout(None).max_lifetime(None);
        }
        let pool = builder
            .build(manager)
            .map_err(|e| StoreError::Pool(e.to_string()))?;

        let store = Self {
            pool,
            config: config.clone(),
        };
        {
            let conn = store.connection()?;
            migrations::run(&conn)?;
        }
        tracing::info!(
            database = %config.database_path.display(),
            max_connections = config.max_connections,
            "certificate store opened"
        );
        Ok(store)
    }

    /// Configuration the store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Acquires a connection, waiting at most the configured acquisition timeout.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PoolTimeout`] when the pool stays exhausted.
    pub fn connection(&self) -> Result<PooledSqlite, StoreError> {
        self.pool
            .get_timeout(self.config.acquire_timeout())
            .map_err(|e| {
                tracing::warn!(error = %e, "connection pool exhausted");
                StoreError::PoolTimeout {
                    waited_ms: self.config.acquire_timeout_ms,
                }
            })
    }

    /// Runs `f` inside one write transaction on one dedicated connection.
    ///
    /// The transaction commits only if `f` succeeds; any error rolls it back
    /// entirely.
    pub fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.connection()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        // Dropping an uncommitted transaction rolls it back.
        let value = f(&tx)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }

    /// Runs `f` against a pooled connection without opening a transaction.
    pub fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<StoreError>,
    {
        let conn = self.connection()?;
        f(&conn)
    }

    /// Number of connections currently idle in the pool.
    pub fn idle_connections(&self) -> u32 {
        self.pool.state().idle_connections
    }

    /// Closes the pool. Outstanding clones keep their connections until dropped.
    pub fn shutdown(self) {
        let state = self.pool.state();
        tracing::info!(
            connections = state.connections,
            idle = state.idle_connections,
            "certificate store shut down"
        );
        drop(self.pool);
    }
}
