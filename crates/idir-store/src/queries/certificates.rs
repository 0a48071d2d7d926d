use idir_canonical::{HexDigest, IsoTimestamp};
use idir_core::{Certificate, CertificateId, CertificateStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use uuid::Uuid;

use super::decode;
use crate::{Result, StoreError};

const COLUMNS: &str = "id, certificate_id, course_signup_id, issued_at, status, hash_algorithm, \
                       payload_hash, snapshot_payload, pdf_url, jpg_url, revoked_at, \
                       revoked_reason, superseded_by";

struct RawCertificate {
    id: String,
    certificate_id: String,
    course_signup_id: Option<String>,
    issued_at: String,
    status: String,
    hash_algorithm: String,
    payload_hash: String,
    snapshot_payload: String,
    pdf_url: Option<String>,
    jpg_url: Option<String>,
    revoked_at: Option<String>,
    revoked_reason: Option<String>,
    superseded_by: Option<String>,
}

impl RawCertificate {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            certificate_id: row.get(1)?,
            course_signup_id: row.get(2)?,
            issued_at: row.get(3)?,
            status: row.get(4)?,
            hash_algorithm: row.get(5)?,
            payload_hash: row.get(6)?,
            snapshot_payload: row.get(7)?,
            pdf_url: row.get(8)?,
            jpg_url: row.get(9)?,
            revoked_at: row.get(10)?,
            revoked_reason: row.get(11)?,
            superseded_by: row.get(12)?,
        })
    }

    fn into_certificate(self) -> Result<Certificate> {
        let snapshot_payload = decode_snapshot(&self.certificate_id, self.snapshot_payload);
        Ok(Certificate {
            id: decode::<Uuid>("id", &self.id)?,
            certificate_id: CertificateId::parse(self.certificate_id)
                .map_err(|e| StoreError::corrupt("certificate_id", e))?,
            course_signup_id: self.course_signup_id,
            issued_at: IsoTimestamp::parse(self.issued_at)
                .map_err(|e| StoreError::corrupt("issued_at", e))?,
            status: decode("status", &self.status)?,
            hash_algorithm: decode("hash_algorithm", &self.hash_algorithm)?,
            payload_hash: HexDigest::parse(self.payload_hash)
                .map_err(|e| StoreError::corrupt("payload_hash", e))?,
            snapshot_payload,
            pdf_url: self.pdf_url,
            jpg_url: self.jpg_url,
            revoked_at: self
                .revoked_at
                .map(IsoTimestamp::parse)
                .transpose()
                .map_err(|e| StoreError::corrupt("revoked_at", e))?,
            revoked_reason: self.revoked_reason,
            superseded_by: self
                .superseded_by
                .map(CertificateId::parse)
                .transpose()
                .map_err(|e| StoreError::corrupt("superseded_by", e))?,
        })
    }
}

/// Text that is not JSON is kept as a JSON string holding it; it never verifies.
fn decode_snapshot(certificate_id: &str, raw: String) -> Value {
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(certificate_id, error = %err, "stored snapshot is not JSON");
            Value::String(raw)
        }
    }
}

/// Inserts a new certificate row.
///
/// # Errors
///
/// Returns [`StoreError::UniqueViolation`] if the certificate ID or row ID
/// already exists.
pub fn insert(conn: &Connection, certificate: &Certificate, created_at: &IsoTimestamp) -> Result<()> {
    let snapshot = serde_json::to_string(&certificate.snapshot_payload)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    conn.execute(
        "INSERT INTO certificates (
             id, certificate_id, course_signup_id, issued_at, status, hash_algorithm,
             payload_hash, snapshot_payload, pdf_url, jpg_url, revoked_at, revoked_reason,
             superseded_by, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            certificate.id.to_string(),
            certificate.certificate_id.as_str(),
            certificate.course_signup_id,
            certificate.issued_at.as_str(),
            certificate.status.as_str(),
            certificate.hash_algorithm.as_str(),
            certificate.payload_hash.as_str(),
            snapshot,
            certificate.pdf_url,
            certificate.jpg_url,
            certificate.revoked_at.as_ref().map(IsoTimestamp::as_str),
            certificate.revoked_reason,
            certificate.superseded_by.as_ref().map(CertificateId::as_str),
            created_at.as_str(),
        ],
    )?;
    Ok(())
}

/// Looks up a certificate by its public ID.
pub fn get_by_certificate_id(conn: &Connection, certificate_id: &CertificateId) -> Result<Option<Certificate>> {
    let sql = format!("SELECT {COLUMNS} FROM certificates WHERE certificate_id = ?1");
    conn.query_row(&sql, params![certificate_id.as_str()], RawCertificate::from_row)
        .optional()?
        .map(RawCertificate::into_certificate)
        .transpose()
}

/// Looks up a certificate by its row ID.
pub fn get_by_id(conn: &Connection, id: &Uuid) -> Result<Option<Certificate>> {
    let sql = format!("SELECT {COLUMNS} FROM certificates WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], RawCertificate::from_row)
        .optional()?
        .map(RawCertificate::into_certificate)
        .transpose()
}

/// Certificates issued for a course signup, oldest first.
pub fn list_for_course_signup(conn: &Connection, course_signup_id: &str) -> Result<Vec<Certificate>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM certificates WHERE course_signup_id = ?1 ORDER BY issued_at, rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let raw = stmt
        .query_map(params![course_signup_id], RawCertificate::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    raw.into_iter().map(RawCertificate::into_certificate).collect()
}

/// Moves a `valid` certificate to `revoked`.
///
/// Returns false if no `valid` row matched, leaving the row untouched.
pub fn mark_revoked(
    conn: &Connection,
    certificate_id: &CertificateId,
    revoked_at: &IsoTimestamp,
    reason: &str,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE certificates
         SET status = ?1, revoked_at = ?2, revoked_reason = ?3
         WHERE certificate_id = ?4 AND status = ?5",
        params![
            CertificateStatus::Revoked.as_str(),
            revoked_at.as_str(),
            reason,
            certificate_id.as_str(),
            CertificateStatus::Valid.as_str(),
        ],
    )?;
    Ok(changed == 1)
}

/// Moves a `valid` certificate to `reissued`, pointing it at its replacement.
///
/// Returns false if no `valid` row matched, leaving the row untouched.
pub fn mark_reissued(
    conn: &Connection,
    certificate_id: &CertificateId,
    superseded_by: &CertificateId,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE certificates
         SET status = ?1, superseded_by = ?2
         WHERE certificate_id = ?3 AND status = ?4",
        params![
            CertificateStatus::Reissued.as_str(),
            superseded_by.as_str(),
            certificate_id.as_str(),
            CertificateStatus::Valid.as_str(),
        ],
    )?;
    Ok(changed == 1)
}

/// Total number of certificate rows.
pub fn count(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM certificates", [], |row| row.get(0))?;
    Ok(n as u64)
}
