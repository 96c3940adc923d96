//! Password hashing for the user-table helpers.
//!
//! These hashes only ever live in an application table; nothing here talks to
//! the backend's own role or grant system.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::DatabaseError;

/// Hash scheme stored in the `password` column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    /// Unsalted SHA-256, lowercase hex digest
    #[default]
    Sha256,
    /// Argon2id PHC string with a random salt
    Argon2,
}

impl PasswordScheme {
    /// Scheme that produced `stored`: PHC strings are Argon2, anything else
    /// is treated as a legacy hex digest.
    pub fn detect(stored: &str) -> Self {
        if stored.starts_with("$argon2") {
            PasswordScheme::Argon2
        } else {
            PasswordScheme::Sha256
        }
    }

    /// Hash `password` for storage
    pub fn hash(&self, password: &str) -> Result<String, DatabaseError> {
        match self {
            PasswordScheme::Sha256 => Ok(sha256_hex(password)),
            PasswordScheme::Argon2 => {
                let salt = SaltString::generate(&mut rand::thread_rng());
                Argon2::default()
                    .hash_password(password.as_bytes(), &salt)
                    .map(|hash| hash.to_string())
                    .map_err(|e| DatabaseError::PasswordHash(e.to_string()))
            }
        }
    }

    /// Check `password` against a stored hash.
    ///
    /// A stored value that is not a valid hash for this scheme never matches.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        match self {
            PasswordScheme::Sha256 => {
                let computed = sha256_hex(password);
                computed.as_bytes().ct_eq(stored.as_bytes()).into()
            }
            PasswordScheme::Argon2 => match PasswordHash::new(stored) {
                Ok(parsed) => Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok(),
                Err(_) => false,
            },
        }
    }
}

fn sha256_hex(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    format!("{:x}", digest)
}
