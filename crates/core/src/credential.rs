//! Credential handling.
//!
//! Passwords are stored only as salted argon2 hashes and verified by
//! comparison against the hash. The plaintext never leaves the call that
//! received it.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A stored credential: the argon2 PHC-string hash of a password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential {
    hash: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl Credential {
    /// Hash a plaintext password into a credential.
    pub fn new(plain: &str) -> Result<Self> {
        if plain.len() < MIN_PASSWORD_LENGTH {
            return Err(Error::validation(
                "password",
                format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
            ));
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| Error::Storage(format!("password hashing failed: {e}")))?;
        Ok(Self {
            hash: hash.to_string(),
        })
    }

    /// Wrap an existing hash loaded from storage.
    pub fn from_hash(hash: String) -> Self {
        Self { hash }
    }

    /// The hash string, for storage.
    pub fn as_str(&self) -> &str {
        &self.hash
    }

    /// Verify a plaintext password against this credential.
    pub fn verify(&self, plain: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }
}
