use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// In-memory database marker accepted as `database_path`.
pub const IN_MEMORY: &str = ":memory:";

/// Connection and pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long a caller waits for a pooled connection before giving up.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// SQLite busy timeout applied to every connection.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("idir.db")
}

fn default_max_connections() -> u32 {
    4
}

fn default_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            max_connections: default_max_connections(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// Configuration for a database file at `path` with default pool settings.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: path.into(),
            ..Self::default()
        }
    }

    /// Single-connection in-memory database, mainly for tests.
    pub fn in_memory() -> Self {
        Self {
            database_path: PathBuf::from(IN_MEMORY),
            max_connections: 1,
            ..Self::default()
        }
    }

    /// Returns true when the configuration targets an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    /// Pool acquisition timeout.
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}
