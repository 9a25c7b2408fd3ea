//! Argon2id password hashing and verification.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand_core::OsRng;

/// Hash a password with the library's default Argon2id parameters.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    hash_password_with(password, Params::default())
}

/// Hash a password with explicit Argon2id cost parameters.
pub fn hash_password_with(
    password: &str,
    params: Params,
) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    Ok(argon2.hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Check that `hash` is a well-formed PHC string.
pub fn parse_hash(hash: &str) -> Result<PasswordHash<'_>, argon2::password_hash::Error> {
    PasswordHash::new(hash)
}

/// Verify a password against a stored PHC hash.
///
/// Cost parameters come from the hash itself. A mismatch is `Ok(false)`;
/// `Err` means the stored hash could not be used at all.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}
