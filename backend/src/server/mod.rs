//! Server construction and middleware wiring.

mod config;
mod seed;
mod settings;
mod state_builders;

pub use config::{ServerConfig, StoreBackend};
pub use seed::{SeedDocument, SeedError, SeedOutcome, seed_store};
pub use settings::{BuildMode, ServerSettings, SessionSettings, SettingsError};

use state_builders::build_http_state;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use crate::Trace;
#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::relationships::{follow, join_group, leave_group, unfollow};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::{
    change_my_password, current_user, delete_me, delete_user, get_user, list_users, login,
    set_user_password, update_me, update_user,
};
use crate::inbound::http::{json_config, query_config};

/// Shared state and session policy for one application instance.
#[derive(Clone)]
pub struct AppDependencies {
    pub health_state: web::Data<HealthState>,
    pub http_state: web::Data<HttpState>,
    pub key: Key,
    pub cookie_secure: bool,
    pub same_site: SameSite,
}

/// Assemble the Actix application: `/api/v1` behind the session middleware,
/// health probes outside it, and Swagger UI in debug builds.
pub fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
        same_site,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    // `/users/me...` must be registered before `/users/{id}...`.
    let api = web::scope("/api/v1")
        .wrap(session)
        .service(login)
        .service(list_users)
        .service(current_user)
        .service(update_me)
        .service(change_my_password)
        .service(delete_me)
        .service(follow)
        .service(unfollow)
        .service(join_group)
        .service(leave_group)
        .service(get_user)
        .service(update_user)
        .service(set_user_password)
        .service(delete_user);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(json_config())
        .app_data(query_config())
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server for `config` and mark it ready once bound.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let http_state = http_state_for(&config);
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
        store: _,
        store_timeout: _,
    } = config;

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: key.clone(),
            cookie_secure,
            same_site,
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}

/// Build the HTTP state for `config` without starting a server.
///
/// Integration tests use this with [`build_app`] to drive the full stack.
#[must_use]
pub fn http_state_for(config: &ServerConfig) -> web::Data<HttpState> {
    web::Data::new(build_http_state(&config.store, config.store_timeout))
}
