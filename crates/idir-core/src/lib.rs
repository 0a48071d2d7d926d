//! Certificate domain model for IDIR.
//!
//! This crate provides:
//! - The canonical `CertificateSnapshot` and the builder that normalizes raw issuance input
//! - Certificate-ID minting and format validation
//! - Persisted record types (`Certificate`, `CertificateEvent`) and the status state machine
//! - Offline integrity checks that recompute a payload hash from a stored snapshot
//!
//! Core invariants:
//! - A snapshot's hash is `sha256(canonicalize(snapshot))` and nothing else
//! - A certificate's status only moves out of `valid`, never back
//! - This crate performs no I/O
//!
#![deny(missing_docs)]

/// Persisted certificate and audit event types, plus the status state machine.
pub mod certificate;
/// Certificate-ID minting and validation.
pub mod certificate_id;
/// Date normalization to canonical ISO-8601.
pub mod dates;
/// Error types for core operations.
pub mod errors;
/// Snapshot construction.
pub mod snapshot;
/// Input validation helpers.
pub mod validation;
/// Offline integrity verification.
pub mod verification;

pub use certificate::{
    Actor, ActorType, Certificate, CertificateEvent, CertificateStatus, EventType, Transition,
    TransitionError,
};
pub use certificate_id::{
    course_to_slug, generate_certificate_id, generate_certificate_id_with, id_prefix,
    is_valid_certificate_id, to_segment, CertificateId,
};
pub use dates::{normalize_date, to_iso, DateInput};
pub use errors::CoreError;
pub use snapshot::{create_certificate_snapshot, external_course_id, CertificateSnapshot, SnapshotParams};
pub use validation::{require_text, validate_email};
pub use verification::{check_integrity, IntegrityCheck, IntegrityStatus};
