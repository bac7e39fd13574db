//! HTTP server configuration object.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use actix_web::cookie::{Key, SameSite};
use futures_util::FutureExt;

use crate::domain::DEFAULT_STORE_TIMEOUT;
use crate::inbound::http::health::StoreProbe;
use crate::outbound::InMemoryStore;
use crate::outbound::persistence::DbPool;

use super::settings::SessionSettings;

/// Backing store selected at startup.
#[derive(Clone)]
pub enum StoreBackend {
    Postgres(DbPool),
    Memory(Arc<InMemoryStore>),
}

impl StoreBackend {
    /// Readiness check for stores that can become unreachable.
    ///
    /// The in-memory store lives inside the process and needs none.
    pub fn readiness_probe(&self, timeout: Duration) -> Option<StoreProbe> {
        match self {
            Self::Postgres(pool) => {
                let pool = pool.clone();
                Some(Arc::new(move || {
                    let pool = pool.clone();
                    async move {
                        matches!(tokio::time::timeout(timeout, pool.ping()).await, Ok(Ok(())))
                    }
                    .boxed()
                }))
            }
            Self::Memory(_) => None,
        }
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) store: StoreBackend,
    pub(crate) store_timeout: Duration,
}

impl ServerConfig {
    /// Construct a configuration backed by an empty in-memory store.
    #[must_use]
    pub fn new(session: SessionSettings, bind_addr: SocketAddr) -> Self {
        let SessionSettings {
            key,
            cookie_secure,
            same_site,
        } = session;
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            store: StoreBackend::Memory(Arc::new(InMemoryStore::default())),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Use PostgreSQL through `pool` instead of the in-memory store.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.store = StoreBackend::Postgres(pool);
        self
    }

    /// Use an existing (typically seeded) in-memory store.
    #[must_use]
    pub fn with_memory_store(mut self, store: Arc<InMemoryStore>) -> Self {
        self.store = StoreBackend::Memory(store);
        self
    }

    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// See [`StoreBackend::readiness_probe`]; bounded by the store timeout.
    #[must_use]
    pub fn readiness_probe(&self) -> Option<StoreProbe> {
        self.store.readiness_probe(self.store_timeout)
    }
}
