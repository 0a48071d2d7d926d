//! SQL schema definitions.
//!
//! Timestamps are ISO-8601 UTC strings; UUIDs are stored as hyphenated text.

/// Initial schema.
pub const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS certificates (
    id               TEXT PRIMARY KEY,
    certificate_id   TEXT NOT NULL UNIQUE,
    course_signup_id TEXT,
    issued_at        TEXT NOT NULL,
    status           TEXT NOT NULL CHECK (status IN ('valid', 'revoked', 'reissued')),
    hash_algorithm   TEXT NOT NULL DEFAULT 'sha256',
    payload_hash     TEXT NOT NULL,
    snapshot_payload TEXT NOT NULL,
    pdf_url          TEXT,
    jpg_url          TEXT,
    revoked_at       TEXT,
    revoked_reason   TEXT,
    superseded_by    TEXT,
    created_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_certificates_course_signup
    ON certificates(course_signup_id);

CREATE TABLE IF NOT EXISTS certificate_events (
    id               TEXT PRIMARY KEY,
    certificate_id   TEXT NOT NULL,
    certificate_uuid TEXT NOT NULL REFERENCES certificates(id),
    event_type       TEXT NOT NULL CHECK (event_type IN ('issued', 'revoked', 'reissued')),
    actor_type       TEXT NOT NULL CHECK (actor_type IN ('manual', 'system', 'admin')),
    actor_email      TEXT,
    metadata         TEXT NOT NULL,
    created_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_certificate_events_certificate
    ON certificate_events(certificate_uuid, created_at);

CREATE TRIGGER IF NOT EXISTS certificates_no_delete
    BEFORE DELETE ON certificates
BEGIN
    SELECT RAISE(ABORT, 'certificates are never deleted');
END;

CREATE TRIGGER IF NOT EXISTS certificates_immutable_payload
    BEFORE UPDATE OF id, certificate_id, issued_at, hash_algorithm, payload_hash, snapshot_payload
    ON certificates
BEGIN
    SELECT RAISE(ABORT, 'certificate payload is immutable');
END;

CREATE TRIGGER IF NOT EXISTS certificate_events_no_update
    BEFORE UPDATE ON certificate_events
BEGIN
    SELECT RAISE(ABORT, 'certificate_events is append-only');
END;

CREATE TRIGGER IF NOT EXISTS certificate_events_no_delete
    BEFORE DELETE ON certificate_events
BEGIN
    SELECT RAISE(ABORT, 'certificate_events is append-only');
END;
"#;
