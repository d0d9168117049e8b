//! Credential digesting and verification.
//!
//! Digests are salted argon2 PHC strings; verification goes through the
//! library's constant-time comparison. Callers collapse "unknown identity"
//! and "wrong password" into one signal at the login boundary.

use argon2::{
    Argon2,
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 20;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Digesting the password failed: {0}")]
pub struct CredentialHashError(argon2::password_hash::Error);

/// A submitted plaintext password that passed the length policy. Held only
/// for the duration of digesting or verification.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Password(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPasswordError {
    #[error("Password must be at least {PASSWORD_MIN_LEN} characters long.")]
    TooShort,
    #[error("Password cannot be longer than {PASSWORD_MAX_LEN} characters.")]
    TooLong,
}

impl Password {
    pub fn new(password: String) -> Result<Self, InvalidPasswordError> {
        let len = password.chars().count();
        if len < PASSWORD_MIN_LEN {
            Err(InvalidPasswordError::TooShort)
        } else if len > PASSWORD_MAX_LEN {
            Err(InvalidPasswordError::TooLong)
        } else {
            Ok(Self(password))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[redacted]").finish()
    }
}

/// Stored credential digest in PHC string form.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    pub fn digest(password: &Password) -> Result<Self, CredentialHashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.get().as_bytes(), &salt)
            .map_err(CredentialHashError)?;

        Ok(Self(hash.to_string()))
    }

    /// Wraps a digest read back from the store. Parsing is deferred to
    /// [`Self::verify`].
    #[must_use]
    pub fn from_stored(digest: String) -> Self {
        Self(digest)
    }

    /// `MATCH`/`NO_MATCH` as a boolean; errors only for an undecodable
    /// stored digest.
    pub fn verify(&self, submitted: &str) -> Result<bool, CredentialHashError> {
        let parsed = PasswordHash::new(&self.0).map_err(CredentialHashError)?;

        match Argon2::default().verify_password(submitted.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(err) => Err(CredentialHashError(err)),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Debug for PasswordDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordDigest").field(&"[redacted]").finish()
    }
}
