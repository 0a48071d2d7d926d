use idir_canonical::ValidationError;
use idir_core::{generate_certificate_id, CertificateId};

/// Source of new certificate IDs.
///
/// Implementations choose only the suffix; the prefix and year come from the
/// arguments. Uniqueness is not the minter's job: storage rejects a repeat and
/// the issuing transaction fails with
/// [`IssuanceError::DuplicateCertificateId`](crate::IssuanceError::DuplicateCertificateId).
pub trait IdMinter: Send + Sync {
    /// Mints an ID for a course title, optional explicit segments and a year.
    fn mint(&self, title: &str, segments: &[String], year: i32) -> Result<CertificateId, ValidationError>;
}

/// Mints IDs with a random suffix from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomMinter;

impl IdMinter for RandomMinter {
    fn mint(&self, title: &str, segments: &[String], year: i32) -> Result<CertificateId, ValidationError> {
        generate_certificate_id(title, segments, year)
    }
}
