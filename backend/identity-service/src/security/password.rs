/// Password hashing and verification using Argon2id
use crate::error::{IdentityError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;

/// Hash a password using Argon2id algorithm
///
/// ## Security
///
/// - Algorithm: Argon2id (default configuration)
/// - Salt: Random 16-byte salt generated per password
///
/// ## Returns
///
/// PHC-formatted hash string safe for storage
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| IdentityError::Internal(format!("Password hashing failed: {}", e)))?
        .to_string();

    Ok(password_hash)
}

/// Verify a password against its hash
///
/// ## Security
///
/// - Uses constant-time comparison to prevent timing attacks
/// - Supports Argon2id PHC format
///
/// ## Returns
///
/// `true` if password matches hash, `false` otherwise
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| IdentityError::Internal(format!("Invalid password hash format: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(IdentityError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

/// Verify against `password_hash`, or against a throwaway hash when there
/// is no user, so unknown usernames cost the same as wrong passwords.
///
/// Always `false` when `password_hash` is `None`.
pub fn verify_password_or_dummy(password: &str, password_hash: Option<&str>) -> Result<bool> {
    match password_hash {
        Some(hash) => verify_password(password, hash),
        None => {
            verify_password(password, dummy_hash()?)?;
            Ok(false)
        }
    }
}

fn dummy_hash() -> Result<&'static str> {
    static DUMMY: OnceLock<String> = OnceLock::new();

    if let Some(hash) = DUMMY.get() {
        return Ok(hash.as_str());
    }
    let hash = hash_password("dummy-password-for-timing")?;
    Ok(DUMMY.get_or_init(|| hash).as_str())
}
