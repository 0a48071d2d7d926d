use thiserror::Error;

/// Validation errors for canonical primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// When a value does not match the required pattern.
    #[error("{field} ('{value}') is not allowed")]
    PatternMismatch {
        /// Field name that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// When a required value is missing or blank.
    #[error("{field} is required")]
    Missing {
        /// Field name that is missing.
        field: &'static str,
    },
    /// When a value is present but semantically unusable.
    #[error("{field} ('{value}') is invalid: {reason}")]
    Invalid {
        /// Field name that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Human-readable reason.
        reason: String,
    },
}

impl ValidationError {
    /// Returns the name of the field that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            Self::PatternMismatch { field, .. }
            | Self::Missing { field }
            | Self::Invalid { field, .. } => field,
        }
    }
}
