//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_http::Request;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{HttpResponse, test, web};

use crate::domain::{Error, UserId};
use crate::domain::ports::{
    MockLoginService, MockRelationshipCommand, MockUserAccountCommand, MockUsersQuery,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::UserSession;
use crate::inbound::http::state::HttpState;

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Mock driving ports, converted into [`HttpState`] once expectations are set.
#[derive(Default)]
pub struct MockPorts {
    pub login: MockLoginService,
    pub users: MockUsersQuery,
    pub accounts: MockUserAccountCommand,
    pub relationships: MockRelationshipCommand,
}

impl MockPorts {
    pub fn into_state(self) -> web::Data<HttpState> {
        web::Data::new(HttpState::new(
            Arc::new(self.login),
            Arc::new(self.users),
            Arc::new(self.accounts),
            Arc::new(self.relationships),
        ))
    }
}

/// Route used by handler tests to sign a user in without the login flow.
pub const TEST_LOGIN_PATH: &str = "/test-login/{id}";

/// Handler mounted at [`TEST_LOGIN_PATH`].
pub async fn test_login(session: UserSession, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let id = UserId::new(path.as_str()).map_err(|err| Error::invalid_request(err.to_string()))?;
    session.sign_in(&id)?;
    Ok(HttpResponse::Ok().finish())
}

/// Sign `user` in through [`test_login`] and return the session cookie.
pub async fn session_cookie<S, B>(app: &S, user: &UserId) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
{
    let request = test::TestRequest::get()
        .uri(&format!("/test-login/{user}"))
        .to_request();
    let response = test::call_service(app, request).await;
    assert!(response.status().is_success(), "test login failed");
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie set")
        .into_owned()
}
