//! Date normalization.
//!
//! Issuance inputs arrive either as structured dates or as strings. Everything
//! is normalized here, once, to `YYYY-MM-DDTHH:MM:SS.mmmZ` in UTC before it can
//! reach a snapshot. Anything that does not parse is rejected.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use idir_canonical::{IsoTimestamp, ValidationError};

/// A date-like issuance input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInput {
    /// A point in time.
    Timestamp(DateTime<Utc>),
    /// A calendar date, interpreted as midnight UTC.
    Date(NaiveDate),
    /// ISO-8601 text: RFC 3339, `YYYY-MM-DDTHH:MM:SS[.f]` (UTC assumed), or `YYYY-MM-DD`.
    Text(String),
}

impl From<DateTime<Utc>> for DateInput {
    fn from(value: DateTime<Utc>) -> Self {
        DateInput::Timestamp(value)
    }
}

impl From<NaiveDate> for DateInput {
    fn from(value: NaiveDate) -> Self {
        DateInput::Date(value)
    }
}

impl From<&str> for DateInput {
    fn from(value: &str) -> Self {
        DateInput::Text(value.to_string())
    }
}

impl From<String> for DateInput {
    fn from(value: String) -> Self {
        DateInput::Text(value)
    }
}

impl DateInput {
    /// Resolves the input to a UTC instant.
    pub fn resolve(&self, field: &'static str) -> Result<DateTime<Utc>, ValidationError> {
        match self {
            DateInput::Timestamp(dt) => Ok(*dt),
            DateInput::Date(date) => Ok(midnight_utc(*date)),
            DateInput::Text(text) => parse_text(text, field),
        }
    }
}

/// Formats an instant as a canonical ISO timestamp (millisecond precision, `Z`).
pub fn to_iso(instant: DateTime<Utc>) -> IsoTimestamp {
    IsoTimestamp::new(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Normalizes any accepted date representation to a canonical ISO timestamp.
pub fn normalize_date(input: &DateInput, field: &'static str) -> Result<IsoTimestamp, ValidationError> {
    input.resolve(field).map(to_iso)
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::default()).and_utc()
}

fn parse_text(text: &str, field: &'static str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing { field });
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(midnight_utc(date));
    }
    Err(ValidationError::Invalid {
        field,
        value: trimmed.to_string(),
        reason: "not an ISO-8601 date".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn all_representations_agree() {
        let expected = "2026-01-15T00:00:00.000Z";
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let instant = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();

        for input in [
            DateInput::from(date),
            DateInput::from(instant),
            DateInput::from("2026-01-15"),
            DateInput::from("2026-01-15T00:00:00Z"),
            DateInput::from("2026-01-15T01:00:00+01:00"),
            DateInput::from("2026-01-15T00:00:00"),
            DateInput::from(" 2026-01-15 00:00:00 "),
        ] {
            assert_eq!(normalize_date(&input, "completed_at").unwrap().as_str(), expected);
        }
    }

    #[test]
    fn sub_millisecond_precision_is_dropped() {
        let input = DateInput::from("2026-01-15T10:20:30.123456789Z");
        assert_eq!(
            normalize_date(&input, "issued_at").unwrap().as_str(),
            "2026-01-15T10:20:30.123Z"
        );
    }

    #[test]
    fn garbage_is_rejected_with_field_name() {
        let err = normalize_date(&DateInput::from("15/01/2026"), "completed_at").unwrap_err();
        assert_eq!(err.field(), "completed_at");
        let err = normalize_date(&DateInput::from("  "), "completed_at").unwrap_err();
        assert!(matches!(err, ValidationError::Missing { field: "completed_at" }));
    }
}
