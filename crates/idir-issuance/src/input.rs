use idir_canonical::{HexDigest, IsoTimestamp};
use idir_core::{Actor, CertificateId, DateInput};
use serde::Serialize;
use uuid::Uuid;

/// Raw facts for one issuance.
///
/// Dates may arrive in any [`DateInput`] representation; they are normalized
/// before hashing.
#[derive(Debug, Clone)]
pub struct IssueInput {
    /// Student name as entered.
    pub student_full_name: String,
    /// Student email as entered. Only its digest enters the snapshot.
    pub student_email: String,
    /// Course title as entered.
    pub course_title: String,
    /// When the student completed the course.
    pub completed_at: DateInput,
    /// Course identifier; `None` synthesizes an `EXTERNAL-` ID from the title.
    pub course_id: Option<String>,
    /// Course revision; defaults to the issuance time.
    pub course_version: Option<DateInput>,
    /// Issuance time; defaults to now.
    pub issued_at: Option<DateInput>,
    /// Who is issuing.
    pub actor: Actor,
    /// Explicit ID segments; empty derives one from the course title.
    pub segments: Vec<String>,
    /// Originating course signup.
    pub course_signup_id: Option<String>,
    /// Rendered PDF reference.
    pub pdf_url: Option<String>,
    /// Rendered image reference.
    pub jpg_url: Option<String>,
}

impl IssueInput {
    /// Input with the four required facts and everything else defaulted.
    pub fn new(
        student_full_name: impl Into<String>,
        student_email: impl Into<String>,
        course_title: impl Into<String>,
        completed_at: impl Into<DateInput>,
    ) -> Self {
        Self {
            student_full_name: student_full_name.into(),
            student_email: student_email.into(),
            course_title: course_title.into(),
            completed_at: completed_at.into(),
            course_id: None,
            course_version: None,
            issued_at: None,
            actor: Actor::system(),
            segments: Vec::new(),
            course_signup_id: None,
            pdf_url: None,
            jpg_url: None,
        }
    }

    /// Sets the course identifier.
    pub fn with_course_id(mut self, course_id: impl Into<String>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }

    /// Sets the course revision.
    pub fn with_course_version(mut self, course_version: impl Into<DateInput>) -> Self {
        self.course_version = Some(course_version.into());
        self
    }

    /// Overrides the issuance time.
    pub fn with_issued_at(mut self, issued_at: impl Into<DateInput>) -> Self {
        self.issued_at = Some(issued_at.into());
        self
    }

    /// Sets the actor.
    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = actor;
        self
    }

    /// Sets explicit ID segments.
    pub fn with_segments(mut self, segments: Vec<String>) -> Self {
        self.segments = segments;
        self
    }

    /// Attaches rendered artifact references.
    pub fn with_artifacts(mut self, pdf_url: Option<String>, jpg_url: Option<String>) -> Self {
        self.pdf_url = pdf_url;
        self.jpg_url = jpg_url;
        self
    }
}

/// A learner finished a course tracked by the platform.
#[derive(Debug, Clone)]
pub struct CourseCompletion {
    /// Signup the completion belongs to.
    pub course_signup_id: String,
    /// Student name.
    pub student_full_name: String,
    /// Student email.
    pub student_email: String,
    /// Platform course identifier.
    pub course_id: String,
    /// Course title.
    pub course_title: String,
    /// Last modification of the course content.
    pub course_updated_at: DateInput,
    /// Completion time.
    pub completed_at: DateInput,
}

impl From<CourseCompletion> for IssueInput {
    fn from(completion: CourseCompletion) -> Self {
        let mut input = IssueInput::new(
            completion.student_full_name,
            completion.student_email,
            completion.course_title,
            completion.completed_at,
        )
        .with_course_id(completion.course_id)
        .with_course_version(completion.course_updated_at)
        .with_actor(Actor::system());
        input.course_signup_id = Some(completion.course_signup_id);
        input
    }
}

/// Result of a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedCertificate {
    /// Row identifier.
    pub certificate_uuid: Uuid,
    /// Minted public ID.
    pub certificate_id: CertificateId,
    /// `sha256(canonicalize(snapshot))`.
    pub payload_hash: HexDigest,
    /// Issuance time recorded in the snapshot.
    pub issued_at: IsoTimestamp,
}

/// Result of a successful revocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revocation {
    /// Revoked certificate.
    pub certificate_id: CertificateId,
    /// When it was revoked.
    pub revoked_at: IsoTimestamp,
    /// Operator-supplied reason.
    pub reason: String,
}
