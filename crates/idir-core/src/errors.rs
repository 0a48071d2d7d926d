use thiserror::Error;

/// Core error types.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input failed validation.
    #[error("validation failed: {0}")]
    Validation(#[from] idir_canonical::ValidationError),
    /// Canonicalization error.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] idir_canonical::CanonicalizationError),
    /// A stored snapshot could not be decoded.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
}
