//! Password digests
//!
//! Demo-grade: unsalted SHA-256, enough to avoid keeping plaintext around.

use sha2::{Digest, Sha256};

/// Hex SHA-256 digest of `password`
#[must_use]
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Check `password` against a stored digest
#[inline]
#[must_use]
pub fn verify_password(password: &str, digest: &str) -> bool {
    hash_password(password) == digest
}
