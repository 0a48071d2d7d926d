//! One-way identity hashing.
//!
//! Emails are normalized (trimmed, lower-cased) and hashed before they enter a
//! snapshot. The default hasher is unsalted SHA-256, which keeps every stored
//! digest reproducible from the address alone. [`KeyedIdentityHasher`] keeps the
//! same 64-hex digest shape but cannot be reversed by dictionary lookup without
//! the key.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use crate::digest::sha256_hex;

/// Trims and lower-cases an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Returns `sha256_hex(lowercase(trim(email)))`.
pub fn hash_email(email: &str) -> String {
    Sha256IdentityHasher.hash_email(email)
}

/// Produces a non-reversible reference for a personal identifier.
pub trait IdentityHasher: Send + Sync {
    /// Hashes an already-normalized identifier.
    fn hash_normalized(&self, normalized: &str) -> String;

    /// Normalizes then hashes an email address.
    fn hash_email(&self, email: &str) -> String {
        self.hash_normalized(&normalize_email(email))
    }

    /// Short name recorded in logs.
    fn name(&self) -> &'static str;
}

/// Unsalted SHA-256 identity hashing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256IdentityHasher;

impl IdentityHasher for Sha256IdentityHasher {
    fn hash_normalized(&self, normalized: &str) -> String {
        sha256_hex(normalized.as_bytes())
    }

    fn name(&self) -> &'static str {
        "sha256"
    }
}

/// HMAC-SHA256 identity hashing with an operator-held key.
#[derive(Clone)]
pub struct KeyedIdentityHasher {
    key: Vec<u8>,
}

impl KeyedIdentityHasher {
    /// Creates a keyed hasher. Callers reject empty keys before getting here.
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }
}

impl fmt::Debug for KeyedIdentityHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedIdentityHasher")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl IdentityHasher for KeyedIdentityHasher {
    fn hash_normalized(&self, normalized: &str) -> String {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&self.key)
            .expect("HMAC accepts keys of any length");
        mac.update(normalized.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn name(&self) -> &'static str {
        "hmac-sha256"
    }
}
