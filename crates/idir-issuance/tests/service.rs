use chrono::{TimeZone, Utc};
use idir_canonical::{hash_email, KeyedIdentityHasher};
use idir_canonical::ValidationError;
use idir_core::{
    id_prefix, Actor, ActorType, CertificateId, CertificateStatus, EventType, IntegrityStatus,
    Transition,
};
use idir_issuance::{
    CourseCompletion, ErrorCategory, FixedClock, IdMinter, IssuanceError, IssuanceService,
    IssueInput, PublicVerification,
};
use idir_store::queries::{certificates, events};
use idir_store::{Store, StoreConfig, StoreError};
use regex::Regex;
use std::sync::Arc;
use tempfile::TempDir;

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 2, 1, 9, 30, 0).unwrap()))
}

fn service() -> IssuanceService {
    let store = Store::open(&StoreConfig::in_memory()).unwrap();
    IssuanceService::new(store).with_clock(clock())
}

/// Mints every ID with the same all-zero suffix, so equal prefixes collide.
struct ZeroSuffixMinter;

impl IdMinter for ZeroSuffixMinter {
    fn mint(&self, title: &str, segments: &[String], year: i32) -> Result<CertificateId, ValidationError> {
        CertificateId::parse(format!("{}-{:04}-0000000000", id_prefix(title, segments), year))
    }
}

fn colliding_service() -> IssuanceService {
    service().with_minter(Arc::new(ZeroSuffixMinter))
}

fn event_count(service: &IssuanceService) -> u64 {
    service.store().read(|conn| events::count(conn)).unwrap()
}

fn john() -> IssueInput {
    IssueInput::new("John Doe", "john@example.com", "Automation 101", "2026-01-15")
}

fn certificate_count(service: &IssuanceService) -> u64 {
    service
        .store()
        .read(|conn| certificates::count(conn))
        .unwrap()
}

fn overwrite_snapshot(service: &IssuanceService, certificate_id: &str, new_payload: &str) {
    let conn = service.store().connection().unwrap();
    conn.execute_batch("DROP TRIGGER IF EXISTS certificates_immutable_payload")
        .unwrap();
    let sql = format!("UPDATE certificates SET snapshot_payload = {new_payload} WHERE certificate_id = ?1");
    conn.execute(&sql, [certificate_id]).unwrap();
}

fn tamper_course_title(service: &IssuanceService, certificate_id: &str) {
    overwrite_snapshot(
        service,
        certificate_id,
        "json_set(snapshot_payload, '$.course_title', 'Forged Course')",
    );
}

#[test]
fn issue_scenario_produces_well_formed_id_and_hash() {
    let service = service();
    let issued = service.issue(&john()).unwrap();

    let id_re = Regex::new(r"^IDIR-AUTOMATION-101-2026-[0-9A-F]{10}$").unwrap();
    assert!(id_re.is_match(issued.certificate_id.as_str()), "{}", issued.certificate_id);
    let hash_re = Regex::new(r"^[0-9a-f]{64}$").unwrap();
    assert!(hash_re.is_match(issued.payload_hash.as_str()));
    assert_eq!(issued.issued_at.as_str(), "2026-02-01T09:30:00.000Z");
}

#[test]
fn freshly_issued_certificate_verifies() {
    let service = service();
    let issued = service.issue(&john()).unwrap();

    let verification = service.verify(issued.certificate_id.as_str()).unwrap();
    assert_eq!(verification.status(), CertificateStatus::Valid);
    assert!(verification.is_intact());
    assert_eq!(verification.integrity.computed_hash, issued.payload_hash);
    assert_eq!(verification.certificate.payload_hash, issued.payload_hash);

    let snapshot = verification.snapshot.unwrap();
    assert_eq!(snapshot.student_full_name, "John Doe");
    assert_eq!(snapshot.course_title, "Automation 101");
    assert_eq!(snapshot.completed_at.as_str(), "2026-01-15T00:00:00.000Z");
    assert_eq!(snapshot.student_email_hash.as_str(), hash_email("john@example.com"));
}

#[test]
fn issued_event_commits_with_certificate() {
    let service = service();
    let input = john().with_actor(Actor::manual(Some("ops@idir.example".to_string())));
    let issued = service.issue(&input).unwrap();

    let history = service.history(issued.certificate_id.as_str()).unwrap();
    assert_eq!(history.len(), 1);
    let event = &history[0];
    assert_eq!(event.event_type, EventType::Issued);
    assert_eq!(event.actor_type, ActorType::Manual);
    assert_eq!(event.actor_email.as_deref(), Some("ops@idir.example"));
    assert_eq!(event.certificate_uuid, issued.certificate_uuid);
    assert_eq!(event.metadata["student_full_name"], "John Doe");
    assert_eq!(event.metadata["student_email"], "john@example.com");
    assert_eq!(event.metadata["course_title"], "Automation 101");
    assert_eq!(event.metadata["payload_hash"], issued.payload_hash.as_str());
}

#[test]
fn issue_without_course_id_synthesizes_external_course() {
    let service = service();
    let issued = service.issue(&john()).unwrap();
    let snapshot = service
        .verify(issued.certificate_id.as_str())
        .unwrap()
        .snapshot
        .unwrap();

    assert!(snapshot.course_id.starts_with("EXTERNAL-"));
    assert_eq!(snapshot.course_id.len(), "EXTERNAL-".len() + 12);
    assert_eq!(snapshot.course_version, snapshot.issued_at);

    let again = service
        .issue(&IssueInput::new("Jane Roe", "jane@example.com", "  automation 101 ", "2026-01-10"))
        .unwrap();
    let other = service
        .verify(again.certificate_id.as_str())
        .unwrap()
        .snapshot
        .unwrap();
    assert_eq!(other.course_id, snapshot.course_id);
}

#[test]
fn course_completion_uses_platform_course_facts() {
    let service = service();
    let issued = service
        .complete_course(CourseCompletion {
            course_signup_id: "signup-42".to_string(),
            student_full_name: "María José".to_string(),
            student_email: "MJ@Example.com".to_string(),
            course_id: "course-nutrition".to_string(),
            course_title: "Fundamentos de Nutrición".to_string(),
            course_updated_at: "2025-11-03T10:00:00Z".into(),
            completed_at: "2026-01-30T18:45:12.5Z".into(),
        })
        .unwrap();

    assert!(issued
        .certificate_id
        .as_str()
        .starts_with("IDIR-FUNDAMENTOS-DE-NUTRICION-2026-"));
    let verification = service.verify(issued.certificate_id.as_str()).unwrap();
    let snapshot = verification.snapshot.unwrap();
    assert_eq!(snapshot.course_id, "course-nutrition");
    assert_eq!(snapshot.course_version.as_str(), "2025-11-03T10:00:00.000Z");
    assert_eq!(snapshot.completed_at.as_str(), "2026-01-30T18:45:12.500Z");
    assert_eq!(snapshot.student_email_hash.as_str(), hash_email("mj@example.com"));
    assert_eq!(
        verification.certificate.course_signup_id.as_deref(),
        Some("signup-42")
    );

    let history = service.history(issued.certificate_id.as_str()).unwrap();
    assert_eq!(history[0].actor_type, ActorType::System);
}

#[test]
fn explicit_segments_and_issued_at_override() {
    let service = service();
    let input = john()
        .with_segments(vec!["acme corp".to_string(), "bots".to_string()])
        .with_issued_at("2025-12-31");
    let issued = service.issue(&input).unwrap();

    assert!(issued.certificate_id.as_str().starts_with("IDIR-ACME-CORP-BOTS-2026-"));
    assert_eq!(issued.issued_at.as_str(), "2025-12-31T00:00:00.000Z");
}

#[test]
fn artifacts_are_stored_at_issuance() {
    let service = service();
    let input = john().with_artifacts(
        Some("https://cdn.example/cert.pdf".to_string()),
        Some("https://cdn.example/cert.jpg".to_string()),
    );
    let issued = service.issue(&input).unwrap();
    let certificate = service
        .verify(issued.certificate_id.as_str())
        .unwrap()
        .certificate;
    assert_eq!(certificate.pdf_url.as_deref(), Some("https://cdn.example/cert.pdf"));
    assert_eq!(certificate.jpg_url.as_deref(), Some("https://cdn.example/cert.jpg"));
}

#[test]
fn invalid_input_writes_nothing() {
    let service = service();
    let cases = [
        IssueInput::new("John Doe", "not-an-email", "Automation 101", "2026-01-15"),
        IssueInput::new("   ", "john@example.com", "Automation 101", "2026-01-15"),
        IssueInput::new("John Doe", "john@example.com", "", "2026-01-15"),
        IssueInput::new("John Doe", "john@example.com", "Automation 101", "15/01/2026"),
    ];
    for input in &cases {
        let err = service.issue(input).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation, "{err}");
        assert!(!err.is_retryable());
    }
    assert_eq!(certificate_count(&service), 0);
}

#[test]
fn keyed_hasher_changes_digest_but_not_shape() {
    let keyed = service().with_hasher(Arc::new(KeyedIdentityHasher::new(b"secret-key".to_vec())));
    let issued = keyed.issue(&john()).unwrap();
    let snapshot = keyed
        .verify(issued.certificate_id.as_str())
        .unwrap()
        .snapshot
        .unwrap();
    assert_ne!(snapshot.student_email_hash.as_str(), hash_email("john@example.com"));
    assert_eq!(snapshot.student_email_hash.as_str().len(), 64);
}

#[test]
fn revoke_is_terminal() {
    let service = service();
    let issued = service.issue(&john()).unwrap();
    let id = issued.certificate_id.as_str();
    let admin = Actor::admin(Some("admin@idir.example".to_string()));

    let revocation = service.revoke(id, "issued in error", &admin).unwrap();
    assert_eq!(revocation.reason, "issued in error");
    assert_eq!(revocation.revoked_at.as_str(), "2026-02-01T09:30:00.000Z");

    let err = service.revoke(id, "again", &admin).unwrap_err();
    match &err {
        IssuanceError::StateConflict { current, attempted, .. } => {
            assert_eq!(*current, CertificateStatus::Revoked);
            assert_eq!(*attempted, Transition::Revoke);
        }
        other => panic!("expected state conflict, got {other:?}"),
    }
    assert_eq!(err.category(), ErrorCategory::StateConflict);

    let err = service.reissue(id, &admin).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::StateConflict);

    let verification = service.verify(id).unwrap();
    assert_eq!(verification.status(), CertificateStatus::Revoked);
    assert!(verification.is_intact());
    assert_eq!(
        verification.certificate.revoked_reason.as_deref(),
        Some("issued in error")
    );

    let kinds: Vec<EventType> = service
        .history(id)
        .unwrap()
        .iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(kinds, vec![EventType::Issued, EventType::Revoked]);
}

#[test]
fn revoke_rejects_unknown_malformed_and_reasonless_requests() {
    let service = service();
    let actor = Actor::default();

    let err = service
        .revoke("IDIR-AUTOMATION-101-2026-0000000000", "x", &actor)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);

    let err = service.revoke("idir-lowercase-2026-abc", "x", &actor).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);

    let issued = service.issue(&john()).unwrap();
    let err = service
        .revoke(issued.certificate_id.as_str(), "  ", &actor)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert_eq!(
        service.verify(issued.certificate_id.as_str()).unwrap().status(),
        CertificateStatus::Valid
    );
}

#[test]
fn reissue_scenario() {
    let service = service();
    let issued = service.issue(&john().with_course_id("course-automation")).unwrap();
    let old_id = issued.certificate_id.as_str();

    let replacement = service.reissue(old_id, &Actor::default()).unwrap();
    assert_ne!(replacement.certificate_id, issued.certificate_id);
    assert!(replacement
        .certificate_id
        .as_str()
        .starts_with("IDIR-AUTOMATION-101-2026-"));

    let old = service.verify(old_id).unwrap();
    assert_eq!(old.status(), CertificateStatus::Reissued);
    assert_eq!(
        old.certificate.superseded_by.as_ref(),
        Some(&replacement.certificate_id)
    );
    assert!(old.is_intact());

    let new = service.verify(replacement.certificate_id.as_str()).unwrap();
    assert_eq!(new.status(), CertificateStatus::Valid);
    assert!(new.is_intact());

    let before = old.snapshot.unwrap();
    let after = new.snapshot.unwrap();
    assert_eq!(after.student_full_name, before.student_full_name);
    assert_eq!(after.student_email_hash, before.student_email_hash);
    assert_eq!(after.course_id, before.course_id);
    assert_eq!(after.course_title, before.course_title);
    assert_eq!(after.course_version, before.course_version);
    assert_eq!(after.completed_at, before.completed_at);
    assert_eq!(after.certificate_id, replacement.certificate_id);

    let old_history = service.history(old_id).unwrap();
    assert_eq!(old_history.len(), 2);
    assert_eq!(old_history[1].event_type, EventType::Reissued);
    assert_eq!(
        old_history[1].metadata["superseded_by"],
        replacement.certificate_id.as_str()
    );

    let new_history = service.history(replacement.certificate_id.as_str()).unwrap();
    assert_eq!(new_history.len(), 1);
    assert_eq!(new_history[0].metadata["reissue_of"], old_id);
    assert_eq!(new_history[0].metadata["student_email"], "john@example.com");

    let err = service.reissue(old_id, &Actor::default()).unwrap_err();
    assert!(matches!(
        err,
        IssuanceError::StateConflict {
            current: CertificateStatus::Reissued,
            attempted: Transition::Reissue,
            ..
        }
    ));
    let err = service.revoke(old_id, "too late", &Actor::default()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::StateConflict);
}

#[test]
fn colliding_certificate_id_fails_without_writing() {
    let service = colliding_service();
    let first = service.issue(&john()).unwrap();
    assert_eq!(first.certificate_id.as_str(), "IDIR-AUTOMATION-101-2026-0000000000");

    let jane = IssueInput::new("Jane Roe", "jane@example.com", "Automation 101", "2026-01-16");
    let err = service.issue(&jane).unwrap_err();
    match &err {
        IssuanceError::DuplicateCertificateId(id) => assert_eq!(id, &first.certificate_id),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(err.category(), ErrorCategory::Internal);
    assert!(err.is_retryable());
    assert_eq!(certificate_count(&service), 1);
    assert_eq!(event_count(&service), 1);

    let other_course = IssueInput::new("Jane Roe", "jane@example.com", "Data Science", "2026-01-16");
    service.issue(&other_course).unwrap();
    assert_eq!(certificate_count(&service), 2);
}

#[test]
fn colliding_reissue_leaves_original_valid() {
    let service = colliding_service();
    let issued = service.issue(&john()).unwrap();
    let id = issued.certificate_id.as_str();

    let err = service.reissue(id, &Actor::default()).unwrap_err();
    assert!(matches!(err, IssuanceError::DuplicateCertificateId(_)), "got {err:?}");

    let verification = service.verify(id).unwrap();
    assert_eq!(verification.status(), CertificateStatus::Valid);
    assert!(verification.certificate.superseded_by.is_none());
    assert_eq!(certificate_count(&service), 1);
    assert_eq!(event_count(&service), 1);
}

#[test]
fn tampered_snapshot_is_detected() {
    let service = service();
    let issued = service.issue(&john()).unwrap();
    let id = issued.certificate_id.as_str();
    tamper_course_title(&service, id);

    let verification = service.verify(id).unwrap();
    assert!(!verification.is_intact());
    assert_eq!(verification.integrity.status, IntegrityStatus::Mismatch);
    assert_eq!(verification.integrity.stored_hash, issued.payload_hash);
    assert_ne!(verification.integrity.computed_hash, issued.payload_hash);

    match service.public_verification(id) {
        PublicVerification::Valid { certificate } => {
            assert_eq!(certificate.integrity, IntegrityStatus::Mismatch);
            assert_eq!(certificate.course_title.as_deref(), Some("Forged Course"));
        }
        other => panic!("unexpected {other:?}"),
    }

    let err = service.reissue(id, &Actor::default()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::IntegrityMismatch);
    assert_eq!(service.verify(id).unwrap().status(), CertificateStatus::Valid);
}

#[test]
fn non_json_snapshot_is_an_integrity_mismatch() {
    let service = service();
    let issued = service.issue(&john()).unwrap();
    let id = issued.certificate_id.as_str();
    overwrite_snapshot(&service, id, "'forged'");

    let verification = service.verify(id).unwrap();
    assert_eq!(verification.integrity.status, IntegrityStatus::Mismatch);
    assert!(verification.snapshot.is_none());
    assert_eq!(verification.status(), CertificateStatus::Valid);

    match service.public_verification(id) {
        PublicVerification::Valid { certificate } => {
            assert_eq!(certificate.integrity, IntegrityStatus::Mismatch);
            assert_eq!(certificate.certificate_id, issued.certificate_id);
            assert_eq!(certificate.issued_at, issued.issued_at);
            assert!(certificate.student_full_name.is_none());
            assert!(certificate.course_title.is_none());
        }
        other => panic!("unexpected {other:?}"),
    }

    let err = service.reissue(id, &Actor::default()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::IntegrityMismatch);
}

#[test]
fn snapshot_with_a_removed_field_answers_mismatch_publicly() {
    let service = service();
    let issued = service.issue(&john()).unwrap();
    let id = issued.certificate_id.as_str();
    service.revoke(id, "fraud", &Actor::default()).unwrap();
    overwrite_snapshot(&service, id, "json_remove(snapshot_payload, '$.course_id')");

    let verification = service.verify(id).unwrap();
    assert_eq!(verification.integrity.status, IntegrityStatus::Mismatch);
    assert!(verification.snapshot.is_none());

    let answer = service.public_verification(id);
    assert_eq!(answer.outcome(), "revoked");
    let shown = answer.certificate().unwrap();
    assert_eq!(shown.integrity, IntegrityStatus::Mismatch);
    assert!(shown.completed_at.is_none());

    let json = serde_json::to_value(&answer).unwrap();
    assert_eq!(json["certificate"]["integrity"], "mismatch");
    assert!(json["certificate"].get("student_full_name").is_none());
}

#[test]
fn public_verification_outcomes() {
    let service = service();
    assert_eq!(service.public_verification("not an id"), PublicVerification::NotFound);
    assert_eq!(
        service.public_verification("IDIR-AUTOMATION-101-2026-0000000000"),
        PublicVerification::NotFound
    );

    let issued = service.issue(&john()).unwrap();
    let id = issued.certificate_id.as_str();
    let answer = service.public_verification(&format!("  {id} "));
    assert_eq!(answer.outcome(), "valid");
    let shown = answer.certificate().unwrap();
    assert_eq!(shown.student_full_name.as_deref(), Some("John Doe"));
    assert_eq!(shown.integrity, IntegrityStatus::Intact);

    let json = serde_json::to_string(&answer).unwrap();
    assert!(json.contains("\"outcome\":\"valid\""));
    assert!(!json.contains("john@example.com"));
    assert!(!json.contains(&hash_email("john@example.com")));
    assert!(!json.contains("email"));

    service.revoke(id, "fraud", &Actor::default()).unwrap();
    match service.public_verification(id) {
        PublicVerification::Revoked {
            revoked_at,
            revoked_reason,
            ..
        } => {
            assert_eq!(revoked_reason.as_deref(), Some("fraud"));
            assert!(revoked_at.is_some());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn public_verification_points_to_replacement() {
    let service = service();
    let issued = service.issue(&john()).unwrap();
    let replacement = service
        .reissue(issued.certificate_id.as_str(), &Actor::default())
        .unwrap();
    match service.public_verification(issued.certificate_id.as_str()) {
        PublicVerification::Reissued { superseded_by, .. } => {
            assert_eq!(superseded_by, Some(replacement.certificate_id));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn pool_exhaustion_is_retryable_not_a_data_error() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        max_connections: 1,
        acquire_timeout_ms: 100,
        ..StoreConfig::at(dir.path().join("idir.db"))
    };
    let service = IssuanceService::new(Store::open(&config).unwrap()).with_clock(clock());
    let issued = service.issue(&john()).unwrap();

    let held = service.store().connection().unwrap();
    let err = service.issue(&john()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ResourceExhausted);
    assert!(err.is_retryable());

    let err = service.verify(issued.certificate_id.as_str()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ResourceExhausted);
    assert_eq!(
        service.public_verification(issued.certificate_id.as_str()),
        PublicVerification::Unavailable
    );

    drop(held);
    assert!(service.issue(&john()).is_ok());
}

#[test]
fn store_errors_map_to_categories() {
    let timeout = IssuanceError::from(StoreError::PoolTimeout { waited_ms: 5 });
    assert_eq!(timeout.category(), ErrorCategory::ResourceExhausted);
    let busy = IssuanceError::from(StoreError::Busy("locked".to_string()));
    assert!(busy.is_retryable());
    let other = IssuanceError::from(StoreError::Migration("x".to_string()));
    assert_eq!(other.category(), ErrorCategory::Internal);
    assert!(!other.is_retryable());
}
