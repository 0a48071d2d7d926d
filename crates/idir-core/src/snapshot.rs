//! Snapshot construction.
//!
//! A [`CertificateSnapshot`] is the immutable set of facts a certificate's
//! payload hash is computed over. It never contains the raw student email.

use idir_canonical::{
    canonicalize_serialize, sha256_hex, HashAlgorithm, HexDigest,
    IdentityHasher, IsoTimestamp,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::certificate_id::CertificateId;
use crate::dates::{normalize_date, DateInput};
use crate::errors::CoreError;
use crate::validation::{require_text, validate_email};

/// Prefix of synthesized course IDs for externally tracked completions.
pub const EXTERNAL_COURSE_PREFIX: &str = "EXTERNAL-";
const EXTERNAL_COURSE_HEX_LEN: usize = 12;

/// The canonical, hashed certificate payload.
///
/// Every field is required; there are no optional members, so the canonical
/// form never depends on whether a field was omitted or set to null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CertificateSnapshot {
    /// Minted certificate ID.
    pub certificate_id: CertificateId,
    /// Trimmed student name, case preserved.
    pub student_full_name: String,
    /// One-way digest of the normalized student email.
    pub student_email_hash: HexDigest,
    /// Stable course identifier.
    pub course_id: String,
    /// Trimmed course title.
    pub course_title: String,
    /// Course content revision at issuance.
    pub course_version: IsoTimestamp,
    /// When the student completed the course.
    pub completed_at: IsoTimestamp,
    /// When the certificate was issued.
    pub issued_at: IsoTimestamp,
}

impl CertificateSnapshot {
    /// Returns the canonical bytes of this snapshot.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, CoreError> {
        Ok(canonicalize_serialize(self)?)
    }

    /// Computes `algorithm(canonicalize(self))`.
    pub fn payload_hash(&self, algorithm: HashAlgorithm) -> Result<HexDigest, CoreError> {
        Ok(algorithm.digest(&self.to_canonical_bytes()?))
    }

    /// Converts the snapshot into the JSON value stored alongside the certificate.
    pub fn to_value(&self) -> Result<Value, CoreError> {
        serde_json::to_value(self).map_err(|e| CoreError::MalformedSnapshot(e.to_string()))
    }

    /// Decodes a stored snapshot payload.
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        serde_json::from_value(value.clone()).map_err(|e| CoreError::MalformedSnapshot(e.to_string()))
    }

    /// Builds the snapshot of a superseding certificate: same student and course
    /// facts, new ID, fresh issuance time.
    pub fn reissue(&self, certificate_id: CertificateId, issued_at: IsoTimestamp) -> Self {
        Self {
            certificate_id,
            issued_at,
            ..self.clone()
        }
    }
}

/// Raw inputs for [`create_certificate_snapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotParams {
    /// Already-minted certificate ID.
    pub certificate_id: CertificateId,
    /// Student name as entered.
    pub student_full_name: String,
    /// Student email as entered; only its digest is kept.
    pub student_email: String,
    /// Course identifier.
    pub course_id: String,
    /// Course title as entered.
    pub course_title: String,
    /// Course last-modified time (or issuance time for external courses).
    pub course_version: DateInput,
    /// Completion time.
    pub completed_at: DateInput,
    /// Issuance time.
    pub issued_at: DateInput,
}

/// Assembles a snapshot from raw issuance inputs.
///
/// Names and titles are trimmed, the email is validated, normalized and hashed,
/// and all three dates are normalized to canonical ISO form. Logically-equal
/// inputs produce byte-identical canonical snapshots regardless of which date
/// representation they arrived in.
pub fn create_certificate_snapshot(
    params: &SnapshotParams,
    hasher: &dyn IdentityHasher,
) -> Result<CertificateSnapshot, CoreError> {
    let student_full_name = require_text(&params.student_full_name, "student_full_name")?;
    let email = validate_email(&params.student_email)?;
    let course_id = require_text(&params.course_id, "course_id")?;
    let course_title = require_text(&params.course_title, "course_title")?;

    Ok(CertificateSnapshot {
        certificate_id: params.certificate_id.clone(),
        student_full_name,
        student_email_hash: HexDigest::new(hasher.hash_email(&email)),
        course_id,
        course_title,
        course_version: normalize_date(&params.course_version, "course_version")?,
        completed_at: normalize_date(&params.completed_at, "completed_at")?,
        issued_at: normalize_date(&params.issued_at, "issued_at")?,
    })
}

/// Synthesizes a stable `EXTERNAL-<hex>` course ID from a course title.
///
/// The same title (ignoring case and surrounding whitespace) always yields the
/// same ID.
pub fn external_course_id(course_title: &str) -> String {
    let digest = sha256_hex(course_title.trim().to_lowercase().as_bytes());
    format!(
        "{}{}",
        EXTERNAL_COURSE_PREFIX,
        &digest[..EXTERNAL_COURSE_HEX_LEN]
    )
}
