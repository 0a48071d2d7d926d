//! Canonical serialization and hashing primitives for IDIR certificates.
//!
//! A certificate's payload hash is `sha256(canonicalize(snapshot))`. Every
//! byte that participates in that hash is produced by this crate, so the
//! tamper-detection guarantee of the whole system reduces to the
//! determinism of [`canonicalize`].
//!
#![deny(missing_docs)]

/// Canonicalization helpers for deterministic hashing.
pub mod canonicalizer;
/// Digest primitives (SHA-256 hex).
pub mod digest;
/// Pattern-validated newtypes shared across crates.
pub mod identifiers;
/// One-way identity hashing for personal identifiers.
pub mod identity;
/// Validation helpers used by canonical types.
pub mod validation;

pub use canonicalizer::{
    canonicalize, canonicalize_optional, canonicalize_serialize, CanonicalizationError,
    UNDEFINED_TOKEN,
};
pub use digest::{hash_canonical, sha256_hex, HashAlgorithm};
pub use identifiers::{HexDigest, IsoTimestamp};
pub use identity::{hash_email, normalize_email, IdentityHasher, KeyedIdentityHasher, Sha256IdentityHasher};
pub use validation::ValidationError;
