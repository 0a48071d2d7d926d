//! Deterministic JSON serialization.
//!
//! Objects are emitted with their keys sorted lexicographically, arrays keep
//! their element order, and scalars use the RFC 8785 literal rules. A value
//! that is absent altogether serializes to [`UNDEFINED_TOKEN`], which never
//! collides with the `null` literal.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Token emitted for a missing value. Distinct from the JSON `null` literal.
pub const UNDEFINED_TOKEN: &[u8] = b"undefined";

/// Error returned when canonicalization fails.
#[derive(thiserror::Error, Debug)]
pub enum CanonicalizationError {
    /// Input could not be converted into a JSON value.
    #[error("serialization failed: {0}")]
    Serialization(String),
    /// A scalar could not be encoded as a canonical literal.
    #[error("cannot encode value at {path}: {reason}")]
    Encoding {
        /// JSON path of the offending value.
        path: String,
        /// Encoder message.
        reason: String,
    },
}

/// Helper for building JSON paths in error messages.
#[derive(Debug, Clone)]
struct Path {
    segments: Vec<String>,
}

impl Path {
    fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    fn push_field(&self, field: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(field.to_string());
        Self { segments }
    }

    fn push_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(format!("[{}]", index));
        Self { segments }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "root")
        } else {
            write!(f, "{}", self.segments.join("."))
        }
    }
}

/// Produces the canonical bytes for a JSON value.
///
/// Two values that differ only in object key insertion order produce
/// byte-identical output.
///
/// # Example
///
/// ```rust
/// use idir_canonical::canonicalize;
/// use serde_json::json;
///
/// let bytes = canonicalize(&json!({"b": 1, "a": [true, null]}))?;
/// assert_eq!(bytes, br#"{"a":[true,null],"b":1}"#.to_vec());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn canonicalize(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let mut out = Vec::new();
    write_value(value, &Path::root(), &mut out)?;
    Ok(out)
}

/// Canonicalizes a possibly-missing value.
///
/// `None` yields [`UNDEFINED_TOKEN`]; `Some(Value::Null)` yields `null`.
pub fn canonicalize_optional(value: Option<&Value>) -> Result<Vec<u8>, CanonicalizationError> {
    match value {
        Some(value) => canonicalize(value),
        None => Ok(UNDEFINED_TOKEN.to_vec()),
    }
}

/// Serializes `value` to JSON and canonicalizes the result.
pub fn canonicalize_serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonicalizationError> {
    let value = serde_json::to_value(value)
        .map_err(|e| CanonicalizationError::Serialization(e.to_string()))?;
    canonicalize(&value)
}

fn write_value(value: &Value, path: &Path, out: &mut Vec<u8>) -> Result<(), CanonicalizationError> {
    match value {
        Value::Object(map) => {
            // serde_json may be built with `preserve_order`; never rely on map order.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (idx, key) in keys.into_iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                let child_path = path.push_field(key);
                write_literal(&Value::String(key.clone()), &child_path, out)?;
                out.push(b':');
                write_value(&map[key.as_str()], &child_path, out)?;
            }
            out.push(b'}');
            Ok(())
        }
        Value::Array(items) => {
            out.push(b'[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                write_value(item, &path.push_index(idx), out)?;
            }
            out.push(b']');
            Ok(())
        }
        scalar => write_literal(scalar, path, out),
    }
}

fn write_literal(value: &Value, path: &Path, out: &mut Vec<u8>) -> Result<(), CanonicalizationError> {
    let literal = canonical_json::to_string(value).map_err(|err| CanonicalizationError::Encoding {
        path: path.to_string(),
        reason: err.to_string(),
    })?;
    out.extend_from_slice(literal.as_bytes());
    Ok(())
}
