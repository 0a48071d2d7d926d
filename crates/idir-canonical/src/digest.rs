use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::canonicalizer::{canonicalize, CanonicalizationError};
use crate::identifiers::HexDigest;
use crate::validation::ValidationError;

/// Supported payload hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-256 (the only algorithm issued today).
    #[serde(rename = "sha256")]
    Sha256,
}

impl HashAlgorithm {
    /// Stable name stored alongside each payload hash.
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    /// Hashes `bytes` with this algorithm.
    pub fn digest(&self, bytes: &[u8]) -> HexDigest {
        match self {
            HashAlgorithm::Sha256 => HexDigest::new(sha256_hex(bytes)),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(HashAlgorithm::Sha256),
            other => Err(ValidationError::PatternMismatch {
                field: "hash_algorithm",
                value: other.to_string(),
            }),
        }
    }
}

/// Returns the 64-character lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Computes `algorithm(canonicalize(value))`.
pub fn hash_canonical(
    value: &Value,
    algorithm: HashAlgorithm,
) -> Result<HexDigest, CanonicalizationError> {
    let bytes = canonicalize(value)?;
    Ok(algorithm.digest(&bytes))
}
