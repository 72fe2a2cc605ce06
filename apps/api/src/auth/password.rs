//! Argon2id password hashing. Verification is constant-time inside `argon2`.

use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Hashes with a fresh random salt, so equal inputs give different PHC strings.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("Password hashing failed: {e}"))
}

/// False for a wrong password and for a hash that cannot be parsed.
pub fn verify_password(password: &str, hashed: &str) -> bool {
    match PasswordHash::new(hashed) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

pub(crate) const DECOY_PASSWORD: &str = "decoy-password";

/// A real Argon2 hash of `DECOY_PASSWORD`, computed once. Login verifies
/// against it when no user matches, so both failure paths do the same work.
pub fn decoy_hash() -> &'static str {
    static DECOY: OnceLock<String> = OnceLock::new();
    DECOY.get_or_init(|| hash_password(DECOY_PASSWORD).unwrap_or_default())
}
