//! The issuance service.
//!
//! Each write method opens one immediate transaction on one pooled connection
//! and performs every statement of the operation inside it, audit event
//! included. Reads run as single queries without a transaction.

use chrono::{DateTime, Datelike, Utc};
use idir_canonical::{normalize_email, HashAlgorithm, IdentityHasher, IsoTimestamp, Sha256IdentityHasher};
use idir_core::{
    create_certificate_snapshot, external_course_id, is_valid_certificate_id,
    require_text, to_iso, Actor, Certificate, CertificateEvent, CertificateId, CertificateSnapshot,
    CertificateStatus, DateInput, EventType, SnapshotParams, Transition, TransitionError,
};
use idir_store::queries::{certificates, events};
use idir_store::{Connection, Store, StoreError, Transaction};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::IssuanceError;
use crate::input::{CourseCompletion, IssueInput, IssuedCertificate, Revocation};
use crate::minter::{IdMinter, RandomMinter};
use crate::verification::{PublicVerification, Verification};

type Result<T> = std::result::Result<T, IssuanceError>;

/// Hash algorithm for new certificates.
pub const HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

/// Issues, transitions and verifies certificates.
///
/// Holds the process-scoped [`Store`] and the identity hasher; both are passed
/// in explicitly.
#[derive(Clone)]
pub struct IssuanceService {
    store: Store,
    hasher: Arc<dyn IdentityHasher>,
    clock: Arc<dyn Clock>,
    minter: Arc<dyn IdMinter>,
}

impl std::fmt::Debug for IssuanceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuanceService")
            .field("store", &self.store)
            .field("hasher", &self.hasher.name())
            .finish()
    }
}

struct NewRecord<'a> {
    snapshot: CertificateSnapshot,
    actor: &'a Actor,
    course_signup_id: Option<String>,
    pdf_url: Option<String>,
    jpg_url: Option<String>,
    metadata: Map<String, Value>,
}

impl IssuanceService {
    /// Service with unsalted SHA-256 email hashing and the system clock.
    pub fn new(store: Store) -> Self {
        Self {
            store,
            hasher: Arc::new(Sha256IdentityHasher),
            clock: Arc::new(SystemClock),
            minter: Arc::new(RandomMinter),
        }
    }

    /// Replaces the identity hasher.
    pub fn with_hasher(mut self, hasher: Arc<dyn IdentityHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the certificate-ID minter.
    pub fn with_minter(mut self, minter: Arc<dyn IdMinter>) -> Self {
        self.minter = minter;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Issues a certificate.
    ///
    /// Mints an ID, builds and hashes the snapshot, inserts the certificate as
    /// `valid` and records an `issued` event, all in one transaction.
    ///
    /// # Errors
    ///
    /// - [`IssuanceError::Validation`] for malformed input
    /// - [`IssuanceError::DuplicateCertificateId`] if the minted ID already exists
    /// - [`IssuanceError::ResourceExhausted`] if no connection became available
    pub fn issue(&self, input: &IssueInput) -> Result<IssuedCertificate> {
        let issued = self.store.write(|tx| self.issue_in(tx, input))?;
        tracing::info!(
            certificate_id = %issued.certificate_id,
            actor = %input.actor,
            "certificate issued"
        );
        Ok(issued)
    }

    /// Issues a certificate inside a caller-owned transaction.
    pub fn issue_in(&self, tx: &Transaction<'_>, input: &IssueInput) -> Result<IssuedCertificate> {
        let now = self.clock.now();
        let snapshot = self.build_snapshot(input, now)?;
        let mut metadata = Map::new();
        metadata.insert("student_full_name".into(), json!(snapshot.student_full_name));
        metadata.insert(
            "student_email".into(),
            json!(normalize_email(&input.student_email)),
        );
        metadata.insert("course_title".into(), json!(snapshot.course_title));
        metadata.insert("course_id".into(), json!(snapshot.course_id));
        self.record_issued(
            tx,
            NewRecord {
                snapshot,
                actor: &input.actor,
                course_signup_id: input.course_signup_id.clone(),
                pdf_url: input.pdf_url.clone(),
                jpg_url: input.jpg_url.clone(),
                metadata,
            },
        )
    }

    /// Issues the certificate for a completed platform course.
    pub fn complete_course(&self, completion: CourseCompletion) -> Result<IssuedCertificate> {
        self.issue(&IssueInput::from(completion))
    }

    /// Revokes a `valid` certificate.
    ///
    /// # Errors
    ///
    /// - [`IssuanceError::NotFound`] for an unknown ID
    /// - [`IssuanceError::StateConflict`] if the certificate is not `valid`
    pub fn revoke(&self, certificate_id: &str, reason: &str, actor: &Actor) -> Result<Revocation> {
        let id = CertificateId::parse(certificate_id.trim())?;
        let reason = require_text(reason, "reason")?;
        let revoked_at = to_iso(self.clock.now());

        let revocation = self.store.write(|tx| {
            let certificate = load(tx, &id)?;
            certificate
                .status
                .apply(Transition::Revoke)
                .map_err(|e| conflict(&id, e))?;
            if !certificates::mark_revoked(tx, &id, &revoked_at, &reason)? {
                return Err(lost_race(tx, &id, Transition::Revoke));
            }
            let mut metadata = Map::new();
            metadata.insert("reason".into(), json!(reason));
            events::insert(
                tx,
                &new_event(&certificate, EventType::Revoked, actor, metadata, revoked_at.clone()),
            )?;
            Ok(Revocation {
                certificate_id: id.clone(),
                revoked_at: revoked_at.clone(),
                reason: reason.clone(),
            })
        })?;

        tracing::info!(certificate_id = %id, actor = %actor, "certificate revoked");
        Ok(revocation)
    }

    /// Supersedes a `valid` certificate with a freshly issued one.
    ///
    /// The new certificate carries the same student and course facts with a new
    /// ID and issuance time. The old row becomes `reissued` and points at it.
    ///
    /// # Errors
    ///
    /// - [`IssuanceError::NotFound`] for an unknown ID
    /// - [`IssuanceError::StateConflict`] if the certificate is not `valid`
    /// - [`IssuanceError::IntegrityMismatch`] if the stored snapshot was tampered with
    pub fn reissue(&self, certificate_id: &str, actor: &Actor) -> Result<IssuedCertificate> {
        let id = CertificateId::parse(certificate_id.trim())?;
        let now = self.clock.now();

        let issued = self.store.write(|tx| {
            let old = load(tx, &id)?;
            old.status
                .apply(Transition::Reissue)
                .map_err(|e| conflict(&id, e))?;
            let integrity = old.check_integrity();
            if !integrity.is_intact() {
                return Err(IssuanceError::IntegrityMismatch {
                    certificate_id: id.clone(),
                    stored_hash: integrity.stored_hash,
                    computed_hash: integrity.computed_hash,
                });
            }
            let snapshot = old.snapshot()?;
            let new_id = self.minter.mint(&snapshot.course_title, &id.segments(), now.year())?;
            let new_snapshot = snapshot.reissue(new_id.clone(), to_iso(now));

            if !certificates::mark_reissued(tx, &id, &new_id)? {
                return Err(lost_race(tx, &id, Transition::Reissue));
            }
            let mut superseded = Map::new();
            superseded.insert("superseded_by".into(), json!(new_id.as_str()));
            events::insert(
                tx,
                &new_event(&old, EventType::Reissued, actor, superseded, to_iso(now)),
            )?;

            let original = events::latest_of_type(tx, &old.id, EventType::Issued)?;
            let mut metadata = Map::new();
            metadata.insert("student_full_name".into(), json!(new_snapshot.student_full_name));
            if let Some(email) = original
                .as_ref()
                .and_then(|event| event.metadata.get("student_email"))
            {
                metadata.insert("student_email".into(), email.clone());
            }
            metadata.insert("course_title".into(), json!(new_snapshot.course_title));
            metadata.insert("course_id".into(), json!(new_snapshot.course_id));
            metadata.insert("reissue_of".into(), json!(id.as_str()));

            self.record_issued(
                tx,
                NewRecord {
                    snapshot: new_snapshot,
                    actor,
                    course_signup_id: old.course_signup_id.clone(),
                    pdf_url: None,
                    jpg_url: None,
                    metadata,
                },
            )
        })?;

        tracing::info!(
            certificate_id = %id,
            superseded_by = %issued.certificate_id,
            actor = %actor,
            "certificate reissued"
        );
        Ok(issued)
    }

    /// Fetches a certificate and recomputes its payload hash.
    ///
    /// A malformed ID is reported as not found without querying storage. A
    /// tampered snapshot is not an error, even one that no longer decodes: it is
    /// reported through [`Verification::integrity`].
    pub fn verify(&self, certificate_id: &str) -> Result<Verification> {
        let trimmed = certificate_id.trim();
        let id = CertificateId::parse(trimmed)
            .map_err(|_| IssuanceError::NotFound(trimmed.to_string()))?;
        let certificate = self.store.read(|conn| load(conn, &id))?;
        let integrity = certificate.check_integrity();
        if !integrity.is_intact() {
            tracing::warn!(certificate_id = %id, "stored snapshot does not match its payload hash");
        }
        let snapshot = certificate.snapshot().ok();
        Ok(Verification {
            certificate,
            snapshot,
            integrity,
        })
    }

    /// Answers a verification query from an untrusted party.
    ///
    /// Never fails: backend problems become [`PublicVerification::Unavailable`].
    /// A found certificate whose snapshot no longer decodes is answered by its
    /// status with only the ID and issuance time shown, flagged as a mismatch.
    pub fn public_verification(&self, certificate_id: &str) -> PublicVerification {
        let trimmed = certificate_id.trim();
        if !is_valid_certificate_id(trimmed) {
            return PublicVerification::NotFound;
        }
        match self.verify(trimmed) {
            Ok(verification) => {
                if verification.snapshot.is_none() {
                    tracing::warn!(certificate_id = trimmed, "stored snapshot does not decode");
                }
                PublicVerification::from_parts(
                    &verification.certificate,
                    verification.snapshot.as_ref(),
                    verification.integrity.status,
                )
            }
            Err(IssuanceError::NotFound(_)) => PublicVerification::NotFound,
            Err(err) => {
                tracing::warn!(
                    certificate_id = trimmed,
                    category = %err.category(),
                    error = %err,
                    "public verification unavailable"
                );
                PublicVerification::Unavailable
            }
        }
    }

    /// Audit events of a certificate, oldest first.
    pub fn history(&self, certificate_id: &str) -> Result<Vec<CertificateEvent>> {
        let id = CertificateId::parse(certificate_id.trim())?;
        self.store.read(|conn| {
            let certificate = load(conn, &id)?;
            Ok(events::list_for_certificate(conn, &certificate.id)?)
        })
    }

    fn build_snapshot(&self, input: &IssueInput, now: DateTime<Utc>) -> Result<CertificateSnapshot> {
        let issued_at = match &input.issued_at {
            Some(date) => date.resolve("issued_at")?,
            None => now,
        };
        let course_title = require_text(&input.course_title, "course_title")?;
        let course_id = match input.course_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => external_course_id(&course_title),
        };
        let course_version = input
            .course_version
            .clone()
            .unwrap_or(DateInput::Timestamp(issued_at));
        let certificate_id = self.minter.mint(&course_title, &input.segments, now.year())?;

        let params = SnapshotParams {
            certificate_id,
            student_full_name: input.student_full_name.clone(),
            student_email: input.student_email.clone(),
            course_id,
            course_title,
            course_version,
            completed_at: input.completed_at.clone(),
            issued_at: DateInput::Timestamp(issued_at),
        };
        Ok(create_certificate_snapshot(&params, self.hasher.as_ref())?)
    }

    fn record_issued(&self, tx: &Transaction<'_>, record: NewRecord<'_>) -> Result<IssuedCertificate> {
        let payload_hash = record.snapshot.payload_hash(HASH_ALGORITHM)?;
        let certificate = Certificate {
            id: Uuid::new_v4(),
            certificate_id: record.snapshot.certificate_id.clone(),
            course_signup_id: record.course_signup_id,
            issued_at: record.snapshot.issued_at.clone(),
            status: CertificateStatus::Valid,
            hash_algorithm: HASH_ALGORITHM,
            payload_hash: payload_hash.clone(),
            snapshot_payload: record.snapshot.to_value()?,
            pdf_url: record.pdf_url,
            jpg_url: record.jpg_url,
            revoked_at: None,
            revoked_reason: None,
            superseded_by: None,
        };
        let created_at = to_iso(self.clock.now());

        certificates::insert(tx, &certificate, &created_at).map_err(|err| match err {
            StoreError::UniqueViolation(_) => {
                tracing::warn!(certificate_id = %certificate.certificate_id, "certificate id collision");
                IssuanceError::DuplicateCertificateId(certificate.certificate_id.clone())
            }
            other => other.into(),
        })?;

        let mut metadata = record.metadata;
        metadata.insert("payload_hash".into(), json!(payload_hash.as_str()));
        events::insert(
            tx,
            &new_event(&certificate, EventType::Issued, record.actor, metadata, created_at),
        )?;

        Ok(IssuedCertificate {
            certificate_uuid: certificate.id,
            certificate_id: certificate.certificate_id,
            payload_hash,
            issued_at: certificate.issued_at,
        })
    }
}

fn load(conn: &Connection, id: &CertificateId) -> Result<Certificate> {
    certificates::get_by_certificate_id(conn, id)?
        .ok_or_else(|| IssuanceError::NotFound(id.to_string()))
}

fn conflict(id: &CertificateId, err: TransitionError) -> IssuanceError {
    IssuanceError::StateConflict {
        certificate_id: id.clone(),
        current: err.current,
        attempted: err.attempted,
    }
}

/// The conditional update matched no `valid` row: report what is there now.
fn lost_race(conn: &Connection, id: &CertificateId, attempted: Transition) -> IssuanceError {
    match certificates::get_by_certificate_id(conn, id) {
        Ok(Some(current)) => IssuanceError::StateConflict {
            certificate_id: id.clone(),
            current: current.status,
            attempted,
        },
        Ok(None) => IssuanceError::NotFound(id.to_string()),
        Err(err) => err.into(),
    }
}

fn new_event(
    certificate: &Certificate,
    event_type: EventType,
    actor: &Actor,
    metadata: Map<String, Value>,
    created_at: IsoTimestamp,
) -> CertificateEvent {
    CertificateEvent {
        id: Uuid::new_v4(),
        certificate_id: certificate.certificate_id.clone(),
        certificate_uuid: certificate.id,
        event_type,
        actor_type: actor.actor_type,
        actor_email: actor.email.clone(),
        metadata: Value::Object(metadata),
        created_at,
    }
}
