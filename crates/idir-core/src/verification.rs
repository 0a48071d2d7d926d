//! Offline integrity verification.
//!
//! The stored `payload_hash` is never trusted on its own: the hash is recomputed
//! from the stored snapshot and compared. A snapshot whose embedded certificate ID
//! differs from the row it is stored on is also a mismatch, which catches
//! payloads copied between rows together with their hashes. A payload that
//! cannot be canonicalized at all is a mismatch too; the check itself never fails.

use idir_canonical::{hash_canonical, HashAlgorithm, HexDigest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::certificate::Certificate;
use crate::certificate_id::CertificateId;
use crate::errors::CoreError;
use crate::snapshot::CertificateSnapshot;

/// Outcome of an integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityStatus {
    /// Recomputed hash equals the stored hash.
    Intact,
    /// The stored snapshot no longer matches its hash or its row.
    Mismatch,
}

/// Details of an integrity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityCheck {
    /// Overall verdict.
    pub status: IntegrityStatus,
    /// Hash stored with the certificate.
    pub stored_hash: HexDigest,
    /// Hash recomputed from the stored snapshot.
    pub computed_hash: HexDigest,
    /// Whether the snapshot names the certificate it is stored on.
    pub id_bound: bool,
}

impl IntegrityCheck {
    /// Returns true when the snapshot can be trusted.
    pub fn is_intact(&self) -> bool {
        self.status == IntegrityStatus::Intact
    }
}

/// Recomputes the hash of `payload` and compares it with `stored_hash`.
///
/// If `payload` has no canonical form, the hash is taken over its compact JSON
/// text instead and the verdict is [`IntegrityStatus::Mismatch`].
pub fn check_integrity(
    certificate_id: &CertificateId,
    payload: &Value,
    stored_hash: &HexDigest,
    algorithm: HashAlgorithm,
) -> IntegrityCheck {
    let (computed_hash, canonical) = match hash_canonical(payload, algorithm) {
        Ok(hash) => (hash, true),
        Err(_) => (algorithm.digest(payload.to_string().as_bytes()), false),
    };
    let id_bound = payload
        .get("certificate_id")
        .and_then(Value::as_str)
        .is_some_and(|id| id == certificate_id.as_str());
    let status = if canonical && id_bound && &computed_hash == stored_hash {
        IntegrityStatus::Intact
    } else {
        IntegrityStatus::Mismatch
    };
    IntegrityCheck {
        status,
        stored_hash: stored_hash.clone(),
        computed_hash,
        id_bound,
    }
}

impl Certificate {
    /// Verifies the stored snapshot against the stored hash.
    pub fn check_integrity(&self) -> IntegrityCheck {
        check_integrity(
            &self.certificate_id,
            &self.snapshot_payload,
            &self.payload_hash,
            self.hash_algorithm,
        )
    }

    /// Decodes the stored snapshot.
    pub fn snapshot(&self) -> Result<CertificateSnapshot, CoreError> {
        CertificateSnapshot::from_value(&self.snapshot_payload)
    }
}
