//! Error classification and exit codes.

use idir_issuance::{BulkError, ErrorCategory, IssuanceError};
use idir_store::StoreError;
use std::error::Error;

/// Exit code for errors a retry may fix (`EX_TEMPFAIL`).
pub const EXIT_TEMPFAIL: i32 = 75;

/// Failures detected by the CLI itself after an operation ran.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{failed} of {total} row(s) failed to issue")]
    RowsFailed { failed: usize, total: usize },
    #[error("certificate {0} failed its integrity check")]
    IntegrityMismatch(String),
    #[error("certificate not found: {0}")]
    NotFound(String),
    #[error("verification is temporarily unavailable")]
    Unavailable,
}

impl CliError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CliError::RowsFailed { .. } => ErrorCategory::Internal,
            CliError::IntegrityMismatch(_) => ErrorCategory::IntegrityMismatch,
            CliError::NotFound(_) => ErrorCategory::NotFound,
            CliError::Unavailable => ErrorCategory::ResourceExhausted,
        }
    }
}

/// Maps any error the commands return onto the shared taxonomy.
pub fn classify(err: &(dyn Error + 'static)) -> ErrorCategory {
    if let Some(e) = err.downcast_ref::<IssuanceError>() {
        return e.category();
    }
    if let Some(e) = err.downcast_ref::<CliError>() {
        return e.category();
    }
    if let Some(e) = err.downcast_ref::<BulkError>() {
        return match e {
            BulkError::Io { .. } => ErrorCategory::Internal,
            _ => ErrorCategory::Validation,
        };
    }
    if let Some(e) = err.downcast_ref::<StoreError>() {
        return if e.is_retryable() {
            ErrorCategory::ResourceExhausted
        } else {
            ErrorCategory::Internal
        };
    }
    ErrorCategory::Internal
}

/// Process exit code for a category.
pub fn exit_code(category: ErrorCategory) -> i32 {
    match category {
        ErrorCategory::Validation => 2,
        ErrorCategory::StateConflict => 3,
        ErrorCategory::NotFound => 4,
        ErrorCategory::IntegrityMismatch => 5,
        ErrorCategory::ResourceExhausted => EXIT_TEMPFAIL,
        ErrorCategory::Internal => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idir_canonical::ValidationError;

    #[test]
    fn categories_have_distinct_exit_codes() {
        let all = [
            ErrorCategory::Validation,
            ErrorCategory::StateConflict,
            ErrorCategory::NotFound,
            ErrorCategory::IntegrityMismatch,
            ErrorCategory::ResourceExhausted,
            ErrorCategory::Internal,
        ];
        let mut codes: Vec<i32> = all.iter().map(|c| exit_code(*c)).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn boxed_errors_are_classified() {
        let err: Box<dyn Error> = Box::new(IssuanceError::Validation(ValidationError::Missing {
            field: "student_email",
        }));
        assert_eq!(classify(err.as_ref()), ErrorCategory::Validation);

        let err: Box<dyn Error> = Box::new(StoreError::PoolTimeout { waited_ms: 10 });
        assert_eq!(exit_code(classify(err.as_ref())), EXIT_TEMPFAIL);

        let err: Box<dyn Error> = Box::new(BulkError::MissingColumns(vec!["x".to_string()]));
        assert_eq!(exit_code(classify(err.as_ref())), 2);

        let err: Box<dyn Error> = "plain message".into();
        assert_eq!(classify(err.as_ref()), ErrorCategory::Internal);
    }
}
