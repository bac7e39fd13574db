//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports ([`GraphStore`], [`AccountRepository`], [`PasswordHasher`])
//! describe what the domain needs from infrastructure and expose strongly
//! typed errors. Driving ports ([`RelationshipCommand`], [`UsersQuery`],
//! [`UserAccountCommand`], [`LoginService`]) are what inbound adapters call.

mod macros;
pub(crate) use macros::define_port_error;

mod account_repository;
mod graph_store;
mod login_service;
mod password_hasher;
mod relationship_command;
mod user_account_command;
mod users_query;

#[cfg(test)]
pub use account_repository::MockAccountRepository;
pub use account_repository::{
    AccountRepository, AccountRepositoryError, StoredCredentials, UserRemoval,
};
#[cfg(test)]
pub use graph_store::MockGraphStore;
pub use graph_store::{
    EntityKind, GraphStore, GraphStoreError, RelationField, RelationSet, SetMutation,
    SetOperation,
};
#[cfg(test)]
pub use login_service::MockLoginService;
pub use login_service::LoginService;
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use password_hasher::{PasswordHasher, PasswordHasherError};
#[cfg(test)]
pub use relationship_command::MockRelationshipCommand;
pub use relationship_command::RelationshipCommand;
#[cfg(test)]
pub use user_account_command::MockUserAccountCommand;
pub use user_account_command::UserAccountCommand;
#[cfg(test)]
pub use users_query::MockUsersQuery;
pub use users_query::UsersQuery;
