//! Query functions for certificates and audit events.
//!
//! Every function takes an explicit [`rusqlite::Connection`]; a
//! [`rusqlite::Transaction`] derefs to one, so the same calls compose inside
//! [`crate::Store::write`].

/// Certificate rows.
pub mod certificates;
/// Audit log rows.
pub mod events;

use std::str::FromStr;

use crate::StoreError;

pub(crate) fn decode<T>(column: &'static str, raw: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| StoreError::corrupt(column, e))
}
