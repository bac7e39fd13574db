//! Port for password hashing so the domain does not depend on a specific
//! key-derivation function.

use crate::domain::{Password, PasswordHash};

use super::define_port_error;

define_port_error! {
    /// Errors raised by password hashing adapters.
    pub enum PasswordHasherError {
        /// Hashing failed.
        Hash { message: String } => "password hashing failed: {message}",
        /// The stored hash could not be parsed.
        MalformedHash { message: String } => "stored password hash is malformed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync + 'static {
    /// Hash a new password with a fresh salt.
    fn hash(&self, password: &Password) -> Result<PasswordHash, PasswordHasherError>;

    /// Check `candidate` against a stored hash.
    fn verify(&self, candidate: &str, hash: &PasswordHash) -> Result<bool, PasswordHasherError>;
}
