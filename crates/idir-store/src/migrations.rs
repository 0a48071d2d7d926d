//! Forward-only schema migrations.
//!
//! The schema version lives in `PRAGMA user_version`.

use rusqlite::Connection;

use crate::{schema, Result, StoreError};

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Runs all pending migrations.
pub fn run(conn: &Connection) -> Result<()> {
    let current_version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if current_version == 0 {
        tracing::info!(version = SCHEMA_VERSION, "initializing certificate schema");
        conn.execute_batch(schema::SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(StoreError::Migration(format!(
            "database version {current_version} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    Ok(())
}

/// Current schema version of an open database.
pub fn current_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
