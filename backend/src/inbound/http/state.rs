//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{LoginService, RelationshipCommand, UserAccountCommand, UsersQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub login: Arc<dyn LoginService>,
    pub users: Arc<dyn UsersQuery>,
    pub accounts: Arc<dyn UserAccountCommand>,
    pub relationships: Arc<dyn RelationshipCommand>,
}

impl HttpState {
    /// Bundle the driving ports used by the HTTP handlers.
    ///
    /// A single service frequently implements several ports; pass the same
    /// `Arc` for each of them.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use socialgraph::domain::{AccountService, RelationshipService};
    /// use socialgraph::inbound::http::state::HttpState;
    /// use socialgraph::outbound::{Argon2PasswordHasher, InMemoryStore};
    ///
    /// let store = Arc::new(InMemoryStore::default());
    /// let relationships = Arc::new(RelationshipService::new(store.clone()));
    /// let accounts = Arc::new(AccountService::new(
    ///     store.clone(),
    ///     store,
    ///     Arc::new(Argon2PasswordHasher::default()),
    ///     relationships.clone(),
    /// ));
    /// let state = HttpState::new(accounts.clone(), accounts.clone(), accounts, relationships);
    /// let _users = state.users.clone();
    /// ```
    pub fn new(
        login: Arc<dyn LoginService>,
        users: Arc<dyn UsersQuery>,
        accounts: Arc<dyn UserAccountCommand>,
        relationships: Arc<dyn RelationshipCommand>,
    ) -> Self {
        Self {
            login,
            users,
            accounts,
            relationships,
        }
    }
}
