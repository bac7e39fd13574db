//! Wiring of domain services onto the selected store backend.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::ports::{AccountRepository, GraphStore};
use crate::domain::{AccountService, RelationshipService};
use crate::inbound::http::state::HttpState;
use crate::outbound::Argon2PasswordHasher;
use crate::outbound::persistence::{DieselAccountRepository, DieselGraphStore};

use super::config::StoreBackend;

/// Build the relationship and account services over one account repository
/// and graph store, sharing the store timeout.
fn wire_services<R, G>(accounts: Arc<R>, graph: Arc<G>, timeout: Duration) -> HttpState
where
    R: AccountRepository + 'static,
    G: GraphStore + 'static,
{
    let relationships = Arc::new(RelationshipService::new(graph.clone()).with_timeout(timeout));
    let account_service = Arc::new(
        AccountService::new(
            accounts,
            graph,
            Arc::new(Argon2PasswordHasher),
            relationships.clone(),
        )
        .with_timeout(timeout),
    );
    HttpState::new(
        account_service.clone(),
        account_service.clone(),
        account_service,
        relationships,
    )
}

/// Build the HTTP state for `backend`.
pub(crate) fn build_http_state(backend: &StoreBackend, timeout: Duration) -> HttpState {
    match backend {
        StoreBackend::Postgres(pool) => wire_services(
            Arc::new(DieselAccountRepository::new(pool.clone())),
            Arc::new(DieselGraphStore::new(pool.clone())),
            timeout,
        ),
        StoreBackend::Memory(store) => wire_services(store.clone(), store.clone(), timeout),
    }
}
