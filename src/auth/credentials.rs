//! The single identity allowed to sign in.

use std::fmt;
use subtle::ConstantTimeEq;

use super::password;
use crate::error::AppError;

/// Identity and Argon2id password hash supplied at startup.
///
/// Read-only for the life of the process; shared behind an `Arc`.
#[derive(Clone)]
pub struct Credentials {
    email: String,
    password_hash: String,
}

impl Credentials {
    /// Fails when `password_hash` is not a usable PHC string.
    pub fn new(
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Result<Self, argon2::password_hash::Error> {
        let password_hash = password_hash.into();
        password::parse_hash(&password_hash)?;
        Ok(Self {
            email: email.into(),
            password_hash,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Constant-time comparison of `candidate` with the configured identity.
    pub fn identity_matches(&self, candidate: &str) -> bool {
        self.email.as_bytes().ct_eq(candidate.as_bytes()).into()
    }

    /// True only when both the identity and the password match.
    ///
    /// The hash comparison runs on the blocking pool.
    pub async fn verify(&self, identity: &str, password: &str) -> Result<bool, AppError> {
        if !self.identity_matches(identity) {
            return Ok(false);
        }

        let password = password.to_owned();
        let hash = self.password_hash.clone();
        let matched =
            tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
                .await??;
        Ok(matched)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}
