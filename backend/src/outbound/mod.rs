//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed graph store and account repository
//!   using Diesel
//! - **memory**: mutex-guarded in-process store for development and tests
//! - **password**: Argon2id password hashing
//!
//! Adapters are thin translators between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod memory;
pub mod password;
pub mod persistence;

pub use memory::InMemoryStore;
pub use password::Argon2PasswordHasher;
