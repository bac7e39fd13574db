//! Session-cookie authentication for the HTTP adapter.
//!
//! [`UserSession`] signs a user in or out. [`SignedIn`] is the extractor
//! handlers take when a route needs an authenticated caller; it short-circuits
//! with `401 Unauthorized` before the handler body runs.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::{Error, UserId};

pub(crate) const SESSION_USER_KEY: &str = "uid";

/// Read and write the authenticated user held in the session cookie.
#[derive(Clone)]
pub struct UserSession(Session);

impl UserSession {
    /// Bind `user_id` to a freshly renewed session.
    ///
    /// Renewing drops any state carried by a cookie issued before login.
    pub fn sign_in(&self, user_id: &UserId) -> Result<(), Error> {
        self.0.renew();
        self.0
            .insert(SESSION_USER_KEY, *user_id.as_uuid())
            .map_err(|error| Error::internal(format!("failed to write session: {error}")))
    }

    /// Drop the session entirely; the client receives a removal cookie.
    pub fn sign_out(&self) {
        self.0.purge();
    }

    /// The signed-in user, if any.
    ///
    /// A cookie that decrypts but carries something other than a UUID is
    /// treated as anonymous.
    pub fn user_id(&self) -> Result<Option<UserId>, Error> {
        match self.0.get::<uuid::Uuid>(SESSION_USER_KEY) {
            Ok(id) => Ok(id.map(UserId::from_uuid)),
            Err(error) => {
                warn!(%error, "discarding malformed session user");
                Ok(None)
            }
        }
    }
}

impl FromRequest for UserSession {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let session = Session::from_request(req, payload);
        Box::pin(async move { session.await.map(UserSession) })
    }
}

/// Identifier of the authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedIn(pub UserId);

impl FromRequest for SignedIn {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let session = UserSession::from_request(req, payload);
        Box::pin(async move {
            let session = session.await?;
            let user_id = session
                .user_id()?
                .ok_or_else(|| Error::unauthorized("login required"))?;
            Ok(SignedIn(user_id))
        })
    }
}
