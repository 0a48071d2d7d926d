use idir_canonical::{HashAlgorithm, HexDigest, IsoTimestamp, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::certificate_id::CertificateId;

macro_rules! string_enum {
    ($name:ident, $field:expr, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Stable lowercase name used in storage and on the wire.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ValidationError::PatternMismatch {
                        field: $field,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Lifecycle status of a certificate row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    /// Issued and in force.
    Valid,
    /// Invalidated; terminal.
    Revoked,
    /// Superseded by a new certificate; terminal.
    Reissued,
}

string_enum!(CertificateStatus, "status", {
    Valid => "valid",
    Revoked => "revoked",
    Reissued => "reissued",
});

/// A state transition out of `valid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// `valid -> revoked`.
    Revoke,
    /// `valid -> reissued`.
    Reissue,
}

string_enum!(Transition, "transition", {
    Revoke => "revoke",
    Reissue => "reissue",
});

impl Transition {
    /// Status the certificate ends up in.
    pub fn target(&self) -> CertificateStatus {
        match self {
            Transition::Revoke => CertificateStatus::Revoked,
            Transition::Reissue => CertificateStatus::Reissued,
        }
    }

    /// Audit event recorded for this transition.
    pub fn event_type(&self) -> EventType {
        match self {
            Transition::Revoke => EventType::Revoked,
            Transition::Reissue => EventType::Reissued,
        }
    }
}

/// An illegal transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {attempted} a certificate that is {current}")]
pub struct TransitionError {
    /// Status the certificate is in.
    pub current: CertificateStatus,
    /// Transition that was attempted.
    pub attempted: Transition,
}

impl CertificateStatus {
    /// Returns true for statuses no transition leaves.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CertificateStatus::Valid)
    }

    /// Applies `transition`, failing unless the certificate is `valid`.
    pub fn apply(self, transition: Transition) -> Result<CertificateStatus, TransitionError> {
        match self {
            CertificateStatus::Valid => Ok(transition.target()),
            current => Err(TransitionError {
                current,
                attempted: transition,
            }),
        }
    }
}

/// Kind of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// A certificate was created.
    Issued,
    /// A certificate was revoked.
    Revoked,
    /// A certificate was superseded.
    Reissued,
}

string_enum!(EventType, "event_type", {
    Issued => "issued",
    Revoked => "revoked",
    Reissued => "reissued",
});

/// Who performed an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    /// An operator using command-line tooling.
    Manual,
    /// An automated code path, e.g. course completion.
    System,
    /// An administrator acting through the CMS.
    Admin,
}

string_enum!(ActorType, "actor_type", {
    Manual => "manual",
    System => "system",
    Admin => "admin",
});

/// Actor recorded on audit events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor kind.
    pub actor_type: ActorType,
    /// Operator email, when known.
    pub email: Option<String>,
}

impl Actor {
    /// The automated system actor.
    pub fn system() -> Self {
        Self {
            actor_type: ActorType::System,
            email: None,
        }
    }

    /// A manual operator.
    pub fn manual(email: Option<String>) -> Self {
        Self {
            actor_type: ActorType::Manual,
            email,
        }
    }

    /// An administrator.
    pub fn admin(email: Option<String>) -> Self {
        Self {
            actor_type: ActorType::Admin,
            email,
        }
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.email {
            Some(email) => write!(f, "{}:{}", self.actor_type, email),
            None => write!(f, "{}", self.actor_type),
        }
    }
}

/// Persisted certificate record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    /// Row identifier referenced by audit events.
    pub id: Uuid,
    /// Public certificate ID.
    pub certificate_id: CertificateId,
    /// Originating course signup; `None` for manual or external issuance.
    pub course_signup_id: Option<String>,
    /// Issuance time.
    pub issued_at: IsoTimestamp,
    /// Current status.
    pub status: CertificateStatus,
    /// Algorithm used for `payload_hash`.
    pub hash_algorithm: HashAlgorithm,
    /// Hash of the canonical snapshot at issuance.
    pub payload_hash: HexDigest,
    /// The snapshot, stored verbatim. Stored text that is not JSON at all is
    /// carried as a JSON string holding that text, which never verifies.
    pub snapshot_payload: Value,
    /// Rendered PDF reference.
    pub pdf_url: Option<String>,
    /// Rendered image reference.
    pub jpg_url: Option<String>,
    /// Set by revocation.
    pub revoked_at: Option<IsoTimestamp>,
    /// Set by revocation.
    pub revoked_reason: Option<String>,
    /// Set by reissuance.
    pub superseded_by: Option<CertificateId>,
}

/// Append-only audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateEvent {
    /// Event row identifier.
    pub id: Uuid,
    /// Public ID of the certificate the event concerns.
    pub certificate_id: CertificateId,
    /// Row identifier of the certificate.
    pub certificate_uuid: Uuid,
    /// Event kind.
    pub event_type: EventType,
    /// Actor kind.
    pub actor_type: ActorType,
    /// Operator email, when known.
    pub actor_email: Option<String>,
    /// Free-form context.
    pub metadata: Value,
    /// When the event was recorded.
    pub created_at: IsoTimestamp,
}
