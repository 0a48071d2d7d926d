//! Transactional persistence for IDIR certificates.
//!
//! This crate provides:
//! - A SQLite schema for `certificates` and the append-only `certificate_events` log
//! - A process-scoped connection pool with bounded acquisition ([`Store`])
//! - Transaction-scoped write helpers: every mutation and its audit event commit together
//! - Query functions that take an explicit connection or transaction handle
//!
//! The store never reaches for ambient state; callers open a [`Store`] once,
//! pass it where it is needed, and shut it down explicitly.

#![deny(missing_docs)]

/// Store configuration.
pub mod config;
/// Error types for store operations.
pub mod error;
/// Forward-only schema migrations.
pub mod migrations;
/// Connection pool and transaction helpers.
pub mod pool;
/// Query functions for certificates and audit events.
pub mod queries;
/// SQL schema definitions.
pub mod schema;

pub use config::StoreConfig;
pub use error::StoreError;
pub use pool::Store;
pub use rusqlite::{Connection, Transaction};

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
