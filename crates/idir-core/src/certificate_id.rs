//! Certificate-ID minting.
//!
//! IDs have the shape `IDIR-{SEGMENT}(-{SEGMENT})*-{YEAR}-{HASH10}`: one or more
//! `[A-Z0-9]{1,20}` segments derived from the course, a four-digit year, and ten
//! uppercase hex characters drawn from five random bytes. The random suffix
//! carries 40 bits of entropy; uniqueness is finally enforced by storage.

use idir_canonical::ValidationError;
use rand::RngCore;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fixed prefix of every certificate ID.
pub const CERTIFICATE_ID_PREFIX: &str = "IDIR";
/// Maximum length of one segment.
pub const MAX_SEGMENT_LEN: usize = 20;
/// Number of random bytes in the suffix (rendered as 10 hex characters).
pub const SUFFIX_BYTES: usize = 5;

const MAX_SLUG_WORDS: usize = 3;
const FALLBACK_SLUG: &str = "COURSE";
const STOP_WORDS: &[&str] = &["THE", "A", "AN", "AND", "OR", "Y", "E"];

static CERTIFICATE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^IDIR(-[A-Z0-9]{1,20})+-[0-9]{4}-[0-9A-F]{10}$").expect("invalid regex")
});

/// A validated certificate identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CertificateId(String);

impl CertificateId {
    /// Parses and validates a certificate ID.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if !is_valid_certificate_id(&s) {
            return Err(ValidationError::PatternMismatch {
                field: "certificate_id",
                value: s,
            });
        }
        Ok(Self(s))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Four-digit year embedded in the ID.
    pub fn year(&self) -> &str {
        let parts: Vec<&str> = self.0.rsplitn(3, '-').collect();
        parts.get(1).copied().unwrap_or_default()
    }

    /// Segments between the `IDIR` prefix and the year.
    pub fn segments(&self) -> Vec<String> {
        let parts: Vec<&str> = self.0.split('-').collect();
        // A parsed ID has at least prefix, one segment, year and suffix.
        parts[1..parts.len() - 2]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

impl<'de> Deserialize<'de> for CertificateId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CertificateId::parse(s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for CertificateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns true when `id` matches the certificate-ID grammar exactly.
pub fn is_valid_certificate_id(id: &str) -> bool {
    CERTIFICATE_ID_RE.is_match(id)
}

fn strip_diacritics(input: &str) -> String {
    input.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

fn truncate_ascii(s: &str, max: usize) -> &str {
    // Callers only pass ASCII, so byte and char boundaries coincide.
    if s.len() <= max {
        s
    } else {
        &s[..max]
    }
}

/// Derives a segment list from a course title.
///
/// Diacritics are stripped, the title is upper-cased, stop words are dropped, and
/// up to the first three remaining alphanumeric words are joined with `-`.
/// Falls back to `COURSE` when nothing survives.
pub fn course_to_slug(title: &str) -> String {
    let upper = strip_diacritics(title).to_uppercase();
    let words: Vec<&str> = upper
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .filter(|w| !STOP_WORDS.contains(w))
        .take(MAX_SLUG_WORDS)
        .map(|w| truncate_ascii(w, MAX_SEGMENT_LEN))
        .collect();

    if words.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        words.join("-")
    }
}

/// Formats free text into an ID segment.
///
/// Runs of non-alphanumeric characters collapse into one `-`, leading and
/// trailing dashes are trimmed, and the result is cut to 20 characters.
/// Returns an empty string when nothing alphanumeric survives.
pub fn to_segment(input: &str) -> String {
    let upper = strip_diacritics(input).to_uppercase();
    let mut out = String::with_capacity(upper.len());
    let mut pending_dash = false;
    for c in upper.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    truncate_ascii(&out, MAX_SEGMENT_LEN)
        .trim_end_matches('-')
        .to_string()
}

/// Returns `IDIR-{segments}` for the given title and explicit segments,
/// i.e. the part of the ID that precedes year and suffix.
pub fn id_prefix(title: &str, segments: &[String]) -> String {
    let explicit: Vec<String> = segments
        .iter()
        .map(|s| to_segment(s))
        .filter(|s| !s.is_empty())
        .collect();
    let body = if explicit.is_empty() {
        course_to_slug(title)
    } else {
        explicit.join("-")
    };
    format!("{}-{}", CERTIFICATE_ID_PREFIX, body)
}

/// Mints a certificate ID with an explicit year and randomness source.
pub fn generate_certificate_id_with<R: RngCore + ?Sized>(
    title: &str,
    segments: &[String],
    year: i32,
    rng: &mut R,
) -> Result<CertificateId, ValidationError> {
    let mut suffix = [0u8; SUFFIX_BYTES];
    rng.fill_bytes(&mut suffix);
    let candidate = format!(
        "{}-{:04}-{}",
        id_prefix(title, segments),
        year,
        hex::encode_upper(suffix)
    );
    CertificateId::parse(candidate)
}

/// Mints a certificate ID for `year` using the thread-local RNG.
pub fn generate_certificate_id(
    title: &str,
    segments: &[String],
    year: i32,
) -> Result<CertificateId, ValidationError> {
    generate_certificate_id_with(title, segments, year, &mut rand::thread_rng())
}
