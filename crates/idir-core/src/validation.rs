use idir_canonical::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

// One `@`, a non-empty local part, a dotted domain, no whitespace.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid regex"));

/// Trims `value` and rejects it when blank.
pub fn require_text(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing { field });
    }
    Ok(trimmed.to_string())
}

/// Checks that `email` is syntactically plausible and returns it trimmed.
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = require_text(email, "student_email")?;
    if !EMAIL_RE.is_match(&trimmed) {
        return Err(ValidationError::Invalid {
            field: "student_email",
            value: trimmed,
            reason: "not a plausible email address".to_string(),
        });
    }
    Ok(trimmed)
}
