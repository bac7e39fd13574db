//! Argon2id implementation of the [`PasswordHasher`] port.
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$m=...`), so parameters
//! and salt travel with the hash and verification needs nothing else.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    PasswordHash as PhcHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Argon2, password_hash};

use crate::domain::ports::{PasswordHasher, PasswordHasherError};
use crate::domain::{Password, PasswordHash};

/// Argon2id hasher with the crate's default (memory-hard) parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2PasswordHasher;

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &Password) -> Result<PasswordHash, PasswordHasherError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.expose().as_bytes(), &salt)
            .map_err(|err| PasswordHasherError::hash(err.to_string()))?;
        Ok(PasswordHash::new(hash.to_string()))
    }

    fn verify(&self, candidate: &str, hash: &PasswordHash) -> Result<bool, PasswordHasherError> {
        let parsed = PhcHash::new(hash.as_str())
            .map_err(|err| PasswordHasherError::malformed_hash(err.to_string()))?;
        match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(PasswordHasherError::hash(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn hashes_verify_against_their_password() {
        let hasher = Argon2PasswordHasher;
        let password = Password::new("correct horse").expect("valid password");
        let hash = hasher.hash(&password).expect("hash");

        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash).expect("verify"));
        assert!(!hasher.verify("battery staple", &hash).expect("verify"));
    }

    #[rstest]
    fn salts_differ_between_hashes() {
        let hasher = Argon2PasswordHasher;
        let password = Password::new("correct horse").expect("valid password");
        let first = hasher.hash(&password).expect("hash");
        let second = hasher.hash(&password).expect("hash");
        assert_ne!(first, second);
    }

    #[rstest]
    fn malformed_hashes_are_reported() {
        let err = Argon2PasswordHasher
            .verify("anything", &PasswordHash::new("not-a-phc-string"))
            .expect_err("malformed");
        assert!(matches!(err, PasswordHasherError::MalformedHash { .. }));
    }
}
