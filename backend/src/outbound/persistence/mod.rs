//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the graph store and account repository ports
//! backed by PostgreSQL via `diesel-async` and `bb8` pooling.
//!
//! - **Thin adapters**: implementations only translate between Diesel rows
//!   and domain documents.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Typed errors**: Diesel and pool failures map onto the port error
//!   enums.

mod diesel_account_repository;
mod diesel_graph_store;
mod error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_account_repository::DieselAccountRepository;
pub use diesel_graph_store::DieselGraphStore;
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
