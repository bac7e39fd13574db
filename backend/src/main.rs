//! Backend entry-point: loads settings, selects the store, and serves the
//! REST API.

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Context, Result};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use socialgraph::inbound::http::health::HealthState;
use socialgraph::outbound::persistence::{DbPool, run_migrations};
use socialgraph::outbound::{Argon2PasswordHasher, InMemoryStore};
use socialgraph::server::{
    BuildMode, SeedDocument, ServerConfig, ServerSettings, create_server, seed_store,
};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load().wrap_err("load server settings")?;
    let session = settings
        .session(BuildMode::from_debug_assertions())
        .wrap_err("session configuration")?;
    let bind_addr = settings.bind_addr()?;
    let config = ServerConfig::new(session, bind_addr).with_store_timeout(settings.store_timeout());

    let config = if let Some(pool_config) = settings.pool_config() {
        run_migrations(pool_config.database_url())
            .await
            .wrap_err("apply database migrations")?;
        let pool = DbPool::new(pool_config)
            .await
            .wrap_err("create database pool")?;
        pool.ping().await.wrap_err("database unreachable")?;
        if settings.seed_file.is_some() {
            warn!("seed_file is ignored when a database is configured");
        }
        info!(store = "postgres", "store selected");
        config.with_db_pool(pool)
    } else {
        let store = Arc::new(InMemoryStore::default());
        if let Some(path) = settings.seed_file.as_deref() {
            let seed = SeedDocument::load(path)?;
            seed_store(Arc::clone(&store), seed, Arc::new(Argon2PasswordHasher)).await?;
        }
        warn!(store = "memory", "no database_url configured; data is lost on restart");
        config.with_memory_store(store)
    };

    let mut health_state = HealthState::new();
    if let Some(probe) = config.readiness_probe() {
        health_state = health_state.with_store_probe(probe);
    }
    let health_state = web::Data::new(health_state);
    let server = create_server(health_state, config)?;
    info!(%bind_addr, "listening");
    server.await?;
    Ok(())
}
