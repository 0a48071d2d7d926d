//! Certificate issuance service for IDIR.
//!
//! This crate provides:
//! - [`IssuanceService`]: issue, revoke, reissue, verify and audit history
//! - The public verification answer handed to untrusted third parties
//! - The two-phase bulk import driver (validate everything, then issue row by row)
//!
//! Every write goes through one transaction on one pooled connection; the
//! certificate row and its audit event commit together or not at all.

#![deny(missing_docs)]

/// Two-phase bulk import.
pub mod bulk;
/// Time source used for issuance timestamps and ID years.
pub mod clock;
/// Error taxonomy.
pub mod error;
/// Issuance inputs and results.
pub mod input;
/// Certificate-ID source used by the service.
pub mod minter;
/// The issuance service.
pub mod service;
/// Verification results.
pub mod verification;

pub use bulk::{
    BulkError, ImportOptions, ImportPlan, ImportReport, ImportRow, PlanEntry, PlannedRow, RowError,
    RowOutcome, RowResult, ValidatedBatch,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ErrorCategory, IssuanceError};
pub use input::{CourseCompletion, IssueInput, IssuedCertificate, Revocation};
pub use minter::{IdMinter, RandomMinter};
pub use service::IssuanceService;
pub use verification::{PublicCertificate, PublicVerification, Verification};
