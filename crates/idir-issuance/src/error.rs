//! Error taxonomy for issuance operations.
//!
//! Callers branch on [`IssuanceError::category`]: "your input was wrong",
//! "the record's state forbids this", "no such certificate", "the stored
//! snapshot no longer matches its hash" and "try again later" are all distinct.

use idir_canonical::{HexDigest, ValidationError};
use idir_core::{CertificateId, CertificateStatus, CoreError, Transition};
use idir_store::StoreError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Coarse classification of an [`IssuanceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed input.
    Validation,
    /// Illegal transition for the record's current status.
    StateConflict,
    /// Unknown certificate.
    NotFound,
    /// Stored snapshot disagrees with its stored hash.
    IntegrityMismatch,
    /// Pool or lock contention; retry later.
    ResourceExhausted,
    /// Anything else.
    Internal,
}

impl ErrorCategory {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::StateConflict => "state_conflict",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::IntegrityMismatch => "integrity_mismatch",
            ErrorCategory::ResourceExhausted => "resource_exhausted",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by [`crate::IssuanceService`].
#[derive(Error, Debug)]
pub enum IssuanceError {
    /// Input failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),
    /// The certificate's status forbids the requested transition.
    #[error("certificate {certificate_id} is {current}; cannot {attempted} it")]
    StateConflict {
        /// Certificate the transition targeted.
        certificate_id: CertificateId,
        /// Status found in storage.
        current: CertificateStatus,
        /// Requested transition.
        attempted: Transition,
    },
    /// No certificate with this ID exists.
    #[error("certificate not found: {0}")]
    NotFound(String),
    /// The stored snapshot no longer hashes to the stored payload hash.
    #[error("certificate {certificate_id} failed its integrity check (stored {stored_hash}, computed {computed_hash})")]
    IntegrityMismatch {
        /// Affected certificate.
        certificate_id: CertificateId,
        /// Hash stored at issuance.
        stored_hash: HexDigest,
        /// Hash recomputed from the stored snapshot.
        computed_hash: HexDigest,
    },
    /// A freshly minted ID collided with an existing certificate.
    #[error("certificate id {0} already exists")]
    DuplicateCertificateId(CertificateId),
    /// No connection or lock became available in time.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(StoreError),
    /// A stored snapshot could not be processed.
    #[error("snapshot error: {0}")]
    Snapshot(CoreError),
    /// Other storage failure.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl IssuanceError {
    /// Classifies the error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            IssuanceError::Validation(_) => ErrorCategory::Validation,
            IssuanceError::StateConflict { .. } => ErrorCategory::StateConflict,
            IssuanceError::NotFound(_) => ErrorCategory::NotFound,
            IssuanceError::IntegrityMismatch { .. } => ErrorCategory::IntegrityMismatch,
            IssuanceError::ResourceExhausted(_) => ErrorCategory::ResourceExhausted,
            IssuanceError::DuplicateCertificateId(_)
            | IssuanceError::Snapshot(_)
            | IssuanceError::Store(_) => ErrorCategory::Internal,
        }
    }

    /// Returns true if repeating the same call may succeed.
    ///
    /// A duplicate ID is retryable because a new call mints a new random suffix.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IssuanceError::ResourceExhausted(_) | IssuanceError::DuplicateCertificateId(_)
        )
    }
}

impl From<StoreError> for IssuanceError {
    fn from(err: StoreError) -> Self {
        if err.is_retryable() {
            IssuanceError::ResourceExhausted(err)
        } else {
            IssuanceError::Store(err)
        }
    }
}

impl From<CoreError> for IssuanceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => IssuanceError::Validation(e),
            other => IssuanceError::Snapshot(other),
        }
    }
}
