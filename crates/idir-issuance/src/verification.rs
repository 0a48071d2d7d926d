//! Verification results.
//!
//! [`Verification`] is the operator view: the full stored row plus the outcome
//! of recomputing its hash. [`PublicVerification`] is what an untrusted third
//! party sees; it carries no email, hashed or raw, and no internal error detail.

use idir_canonical::IsoTimestamp;
use idir_core::{Certificate, CertificateId, CertificateSnapshot, CertificateStatus, IntegrityCheck, IntegrityStatus};
use serde::Serialize;

/// Operator-facing verification of one stored certificate.
#[derive(Debug, Clone, Serialize)]
pub struct Verification {
    /// The stored row.
    pub certificate: Certificate,
    /// Decoded snapshot; `None` when the stored payload no longer decodes.
    pub snapshot: Option<CertificateSnapshot>,
    /// Outcome of recomputing the payload hash.
    pub integrity: IntegrityCheck,
}

impl Verification {
    /// Current status of the certificate.
    pub fn status(&self) -> CertificateStatus {
        self.certificate.status
    }

    /// Returns true when the stored snapshot still matches its hash.
    pub fn is_intact(&self) -> bool {
        self.integrity.is_intact()
    }
}

/// Facts shown to anyone holding a certificate ID.
///
/// The snapshot-derived fields are absent when the stored snapshot no longer
/// decodes; `integrity` is then always `mismatch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicCertificate {
    /// The certificate ID that was looked up.
    pub certificate_id: CertificateId,
    /// Student name from the snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_full_name: Option<String>,
    /// Course title from the snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_title: Option<String>,
    /// Completion time from the snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<IsoTimestamp>,
    /// Issuance time.
    pub issued_at: IsoTimestamp,
    /// Whether the snapshot still matches its hash.
    pub integrity: IntegrityStatus,
}

impl PublicCertificate {
    fn new(certificate: &Certificate, snapshot: Option<&CertificateSnapshot>, integrity: IntegrityStatus) -> Self {
        match snapshot {
            Some(snapshot) => Self {
                certificate_id: certificate.certificate_id.clone(),
                student_full_name: Some(snapshot.student_full_name.clone()),
                course_title: Some(snapshot.course_title.clone()),
                completed_at: Some(snapshot.completed_at.clone()),
                issued_at: snapshot.issued_at.clone(),
                integrity,
            },
            None => Self {
                certificate_id: certificate.certificate_id.clone(),
                student_full_name: None,
                course_title: None,
                completed_at: None,
                issued_at: certificate.issued_at.clone(),
                integrity: IntegrityStatus::Mismatch,
            },
        }
    }
}

/// Answer to a public verification query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PublicVerification {
    /// The certificate is in force.
    Valid {
        /// Displayed facts.
        certificate: PublicCertificate,
    },
    /// The certificate was revoked.
    Revoked {
        /// Displayed facts.
        certificate: PublicCertificate,
        /// Revocation time.
        revoked_at: Option<IsoTimestamp>,
        /// Revocation reason.
        revoked_reason: Option<String>,
    },
    /// The certificate was superseded; the holder should obtain the new one.
    Reissued {
        /// Displayed facts.
        certificate: PublicCertificate,
        /// Superseding certificate ID.
        superseded_by: Option<CertificateId>,
    },
    /// No such certificate.
    NotFound,
    /// The lookup could not be completed because of a backend failure.
    Unavailable,
}

impl PublicVerification {
    /// Builds the public answer for a stored certificate and, when it still
    /// decodes, its snapshot.
    pub(crate) fn from_parts(
        certificate: &Certificate,
        snapshot: Option<&CertificateSnapshot>,
        integrity: IntegrityStatus,
    ) -> Self {
        let shown = PublicCertificate::new(certificate, snapshot, integrity);
        match certificate.status {
            CertificateStatus::Valid => PublicVerification::Valid { certificate: shown },
            CertificateStatus::Revoked => PublicVerification::Revoked {
                certificate: shown,
                revoked_at: certificate.revoked_at.clone(),
                revoked_reason: certificate.revoked_reason.clone(),
            },
            CertificateStatus::Reissued => PublicVerification::Reissued {
                certificate: shown,
                superseded_by: certificate.superseded_by.clone(),
            },
        }
    }

    /// Snake-case outcome name.
    pub fn outcome(&self) -> &'static str {
        match self {
            PublicVerification::Valid { .. } => "valid",
            PublicVerification::Revoked { .. } => "revoked",
            PublicVerification::Reissued { .. } => "reissued",
            PublicVerification::NotFound => "not_found",
            PublicVerification::Unavailable => "unavailable",
        }
    }

    /// Displayed facts, when a certificate was found.
    pub fn certificate(&self) -> Option<&PublicCertificate> {
        match self {
            PublicVerification::Valid { certificate }
            | PublicVerification::Revoked { certificate, .. }
            | PublicVerification::Reissued { certificate, .. } => Some(certificate),
            PublicVerification::NotFound | PublicVerification::Unavailable => None,
        }
    }
}
