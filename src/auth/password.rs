//! bcrypt password digests.

use thiserror::Error;

pub use bcrypt::DEFAULT_COST;

/// Lowest work factor bcrypt accepts.
pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

/// Shortest password accepted at registration, counted in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Hash `plaintext` with a fresh salt at [`DEFAULT_COST`].
///
/// # Errors
/// Returns an error if bcrypt cannot produce a digest.
pub fn hash(plaintext: &str) -> Result<String, PasswordError> {
    hash_with_cost(plaintext, DEFAULT_COST)
}

/// # Errors
/// Returns an error if `cost` is outside bcrypt's range or hashing fails.
pub fn hash_with_cost(plaintext: &str, cost: u32) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(plaintext, cost)?)
}

/// Check `plaintext` against a stored digest.
///
/// The comparison is bcrypt's own; a missing or malformed digest never matches.
#[must_use]
pub fn compare(plaintext: &str, digest: &str) -> bool {
    if digest.is_empty() {
        return false;
    }
    bcrypt::verify(plaintext, digest).unwrap_or(false)
}
