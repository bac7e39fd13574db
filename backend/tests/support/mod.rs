//! Shared helpers for the HTTP integration suites.
//!
//! Each test builds the real application (`server::build_app`) over a fresh
//! in-memory store, seeds documents directly, and drives the API in-process.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use actix_http::Request;
use actix_web::cookie::{Cookie, Key, SameSite};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{test, web};
use serde_json::{Value, json};
use socialgraph::domain::ports::PasswordHasher as _;
use socialgraph::domain::{Group, GroupId, Password, PasswordHash, User, UserId, UserName};
use socialgraph::inbound::http::health::HealthState;
use socialgraph::outbound::{Argon2PasswordHasher, InMemoryStore};
use socialgraph::server::{
    AppDependencies, ServerConfig, SessionSettings, build_app, http_state_for,
};

/// Password shared by every seeded account.
pub const PASSWORD: &str = "correct horse battery";

/// Hash [`PASSWORD`] once; Argon2 is deliberately slow.
fn password_hash() -> PasswordHash {
    static HASH: OnceLock<PasswordHash> = OnceLock::new();
    HASH.get_or_init(|| {
        let password = Password::new(PASSWORD).expect("valid password");
        Argon2PasswordHasher.hash(&password).expect("hash password")
    })
    .clone()
}

pub fn seed_user(store: &InMemoryStore, user_name: &str) -> UserId {
    seed_account(store, user_name, false)
}

pub fn seed_admin(store: &InMemoryStore, user_name: &str) -> UserId {
    seed_account(store, user_name, true)
}

fn seed_account(store: &InMemoryStore, user_name: &str, is_admin: bool) -> UserId {
    let user = User::new(
        UserId::random(),
        UserName::new(user_name).expect("valid user name"),
        user_name,
    )
    .with_admin(is_admin);
    let id = *user.id();
    store.insert_user(user, password_hash()).expect("seed user");
    id
}

pub fn seed_group(store: &InMemoryStore, name: &str) -> GroupId {
    let group = Group::new(GroupId::random(), name);
    let id = *group.id();
    store.insert_group(group).expect("seed group");
    id
}

/// Initialise the full application over `store`.
pub async fn init_app(
    store: Arc<InMemoryStore>,
) -> impl Service<Request, Response = ServiceResponse, Error = actix_web::Error> {
    let key = Key::generate();
    let session = SessionSettings {
        key: key.clone(),
        cookie_secure: false,
        same_site: SameSite::Lax,
    };
    let bind_addr: SocketAddr = "127.0.0.1:0".parse().expect("socket addr");
    let config = ServerConfig::new(session, bind_addr).with_memory_store(store);

    test::init_service(build_app(AppDependencies {
        health_state: web::Data::new(HealthState::new()),
        http_state: http_state_for(&config),
        key,
        cookie_secure: false,
        same_site: SameSite::Lax,
    }))
    .await
}

/// Log in as `user_name` with [`PASSWORD`] and return the session cookie.
pub async fn login<S>(app: &S, user_name: &str) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    login_with(app, user_name, PASSWORD)
        .await
        .expect("login should succeed")
}

/// Attempt a login, returning the session cookie on success.
pub async fn login_with<S>(app: &S, user_name: &str, password: &str) -> Option<Cookie<'static>>
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let response = test::call_service(
        app,
        test::TestRequest::post()
            .uri("/api/v1/login")
            .set_json(json!({ "username": user_name, "password": password }))
            .to_request(),
    )
    .await;
    if response.status() != StatusCode::OK {
        return None;
    }
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
}

/// Send `request` and decode the JSON body (`Value::Null` when empty).
pub async fn send<S>(app: &S, request: test::TestRequest) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let response = test::call_service(app, request.to_request()).await;
    let status = response.status();
    let body = test::read_body(response).await;
    if body.is_empty() {
        return (status, Value::Null);
    }
    let value = serde_json::from_slice(&body).expect("JSON response body");
    (status, value)
}
